pub mod fcm;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{DeliveryReport, Notification},
};

/// Push-delivery capability: one multicast-style call covering every token,
/// answered with a per-token outcome.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Errors only when the transport as a whole fails (auth, network).
    /// Rejections of individual tokens are reported inside the
    /// [`DeliveryReport`].
    async fn send_multicast(
        &self,
        tokens: &[String],
        notification: &Notification,
    ) -> AppResult<DeliveryReport>;
}
