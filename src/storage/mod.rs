pub mod memory;
pub mod redis;

use async_trait::async_trait;

use crate::{error::AppResult, models::TokenRecord};

/// Document-store capability backing the token registry.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Whether a document keyed by `token` exists.
    async fn exists(&self, token: &str) -> AppResult<bool>;

    /// Keyed write: the record's token is its document identity, so writing
    /// the same token twice overwrites rather than duplicates.
    async fn put(&self, record: &TokenRecord) -> AppResult<()>;

    /// Every document in the collection.
    async fn list(&self) -> AppResult<Vec<TokenRecord>>;
}
