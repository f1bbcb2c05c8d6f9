use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};

use super::TokenStore;
use crate::{error::AppResult, models::TokenRecord};

/// Token collection kept as a single redis hash: field = token, value = the
/// JSON document `{"token": ...}`.
#[derive(Clone)]
pub struct RedisTokenStore {
    conn: MultiplexedConnection,
    collection: String,
}

impl RedisTokenStore {
    pub async fn new(url: &str, collection: impl Into<String>) -> AppResult<Self> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            collection: collection.into(),
        })
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn exists(&self, token: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let found: bool = conn.hexists(&self.collection, token).await?;
        Ok(found)
    }

    async fn put(&self, record: &TokenRecord) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let (field, document) = encode_document(record)?;
        let _: () = conn.hset(&self.collection, field, document).await?;
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<TokenRecord>> {
        let mut conn = self.conn.clone();
        let documents: Vec<String> = conn.hvals(&self.collection).await?;
        decode_documents(&documents)
    }
}

/// Hash field and value for a token document.
fn encode_document(record: &TokenRecord) -> AppResult<(&str, String)> {
    Ok((record.id(), serde_json::to_string(record)?))
}

/// A document that is not valid JSON fails the whole read, so callers never
/// see a partial token set.
fn decode_documents(documents: &[String]) -> AppResult<Vec<TokenRecord>> {
    documents
        .iter()
        .map(|doc| serde_json::from_str::<TokenRecord>(doc).map_err(Into::into))
        .collect()
}
