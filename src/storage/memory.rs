use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::TokenStore;
use crate::{error::AppResult, models::TokenRecord};

/// In-process token collection, selected with `DATABASE_URL=memory://`.
/// Documents are `(id, record)` pairs so a collection can be seeded with
/// records whose ids and token values disagree.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    documents: Arc<RwLock<Vec<(String, TokenRecord)>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_documents(documents: Vec<(String, TokenRecord)>) -> Self {
        Self {
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn exists(&self, token: &str) -> AppResult<bool> {
        let documents = self.documents.read().await;
        Ok(documents.iter().any(|(id, _)| id == token))
    }

    async fn put(&self, record: &TokenRecord) -> AppResult<()> {
        let mut documents = self.documents.write().await;
        match documents.iter_mut().find(|(id, _)| id == record.id()) {
            Some((_, existing)) => *existing = record.clone(),
            None => documents.push((record.id().to_string(), record.clone())),
        }
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<TokenRecord>> {
        let documents = self.documents.read().await;
        Ok(documents.iter().map(|(_, record)| record.clone()).collect())
    }
}
