use std::{collections::HashSet, sync::Arc};

use crate::{
    error::{AppError, AppResult},
    models::TokenRecord,
    storage::TokenStore,
};

/// Stores and retrieves unique device tokens.
#[derive(Clone)]
pub struct TokenRegistry {
    store: Arc<dyn TokenStore>,
}

impl TokenRegistry {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Register a device token. Registering a known token succeeds without
    /// writing anything.
    pub async fn register(&self, token: &str) -> AppResult<()> {
        if token.trim().is_empty() {
            return Err(AppError::InvalidInput("Token is required.".to_string()));
        }

        if self.store.exists(token).await? {
            tracing::info!("Token {} already exists in the database", token);
            return Ok(());
        }

        self.store.put(&TokenRecord::new(token)).await?;
        tracing::info!("Token {} saved successfully", token);

        Ok(())
    }

    /// All registered tokens, deduplicated. Documents with an empty token
    /// field are ignored.
    pub async fn list_tokens(&self) -> AppResult<Vec<String>> {
        let records = self.store.list().await?;

        let mut seen = HashSet::with_capacity(records.len());
        let tokens: Vec<String> = records
            .into_iter()
            .map(|record| record.token)
            .filter(|token| !token.is_empty() && seen.insert(token.clone()))
            .collect();

        tracing::debug!("Retrieved {} tokens", tokens.len());
        Ok(tokens)
    }
}
