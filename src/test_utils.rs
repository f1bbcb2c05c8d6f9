use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{DeliveryReport, Notification, SendResponse},
    push::PushTransport,
    services::{dispatcher::BroadcastDispatcher, registry::TokenRegistry, scheduler::ScheduleManager},
    storage::memory::MemoryTokenStore,
    AppState,
};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub tokens: Vec<String>,
    pub notification: Notification,
}

/// Push transport that records every multicast instead of sending it.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    rejected: Arc<HashSet<String>>,
    failure: Option<String>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports the listed tokens as rejected by the provider.
    pub fn rejecting<const N: usize>(tokens: [&str; N]) -> Self {
        Self {
            rejected: Arc::new(tokens.iter().map(|t| t.to_string()).collect()),
            ..Self::default()
        }
    }

    /// Fails every call as a whole with `Delivery(message)`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    async fn send_multicast(
        &self,
        tokens: &[String],
        notification: &Notification,
    ) -> AppResult<DeliveryReport> {
        if let Some(message) = &self.failure {
            return Err(AppError::Delivery(message.clone()));
        }

        self.calls.lock().await.push(RecordedCall {
            tokens: tokens.to_vec(),
            notification: notification.clone(),
        });

        let responses = tokens
            .iter()
            .map(|token| {
                if self.rejected.contains(token) {
                    SendResponse::failed(token.as_str(), "UNREGISTERED")
                } else {
                    SendResponse::delivered(token.as_str(), Some(format!("messages/{}", token)))
                }
            })
            .collect();

        Ok(DeliveryReport::from_responses(responses))
    }
}

/// App state wired to an in-memory store and the given transport.
pub fn test_state(store: MemoryTokenStore, transport: RecordingTransport) -> AppState {
    let registry = TokenRegistry::new(Arc::new(store));
    let dispatcher = Arc::new(BroadcastDispatcher::new(registry.clone(), Arc::new(transport)));
    let scheduler = Arc::new(ScheduleManager::new(dispatcher.clone()));

    AppState {
        registry,
        dispatcher,
        scheduler,
    }
}
