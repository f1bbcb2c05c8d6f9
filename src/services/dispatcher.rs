use std::{collections::HashSet, sync::Arc};

use crate::{
    error::{AppError, AppResult},
    models::{DeliveryReport, Notification},
    push::PushTransport,
};

use super::registry::TokenRegistry;

/// Fans one notification out to every registered token.
pub struct BroadcastDispatcher {
    registry: TokenRegistry,
    transport: Arc<dyn PushTransport>,
}

impl BroadcastDispatcher {
    pub fn new(registry: TokenRegistry, transport: Arc<dyn PushTransport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Send `notification` to the current token set in a single multicast
    /// call. Failed tokens are reported, not retried.
    pub async fn broadcast(&self, notification: &Notification) -> AppResult<DeliveryReport> {
        let mut tokens = self.registry.list_tokens().await?;

        let mut seen = HashSet::with_capacity(tokens.len());
        tokens.retain(|token| seen.insert(token.clone()));

        if tokens.is_empty() {
            return Err(AppError::NoRecipients);
        }

        tracing::info!(
            "Broadcasting \"{}\" to {} tokens",
            notification.title,
            tokens.len()
        );

        let report = self.transport.send_multicast(&tokens, notification).await?;

        tracing::info!(
            "Notification sent: {} succeeded, {} failed",
            report.success_count,
            report.failure_count
        );
        for failure in report.responses.iter().filter(|r| !r.success) {
            tracing::warn!(
                "Delivery to {} failed: {}",
                failure.token,
                failure.error.as_deref().unwrap_or("unknown error")
            );
        }

        Ok(report)
    }
}
