use async_trait::async_trait;
use thiserror::Error;

/// A single raw message pulled off the work queue. `receipt` is whatever
/// the backend needs to delete it later (an SQS receipt handle, for
/// example); the core never inspects it.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub body: String,
    pub receipt: String,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("transient queue error: {0}")]
    Transient(String),
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Polls for up to `max_messages` messages without blocking long.
    async fn receive(&self, max_messages: u32) -> Result<Vec<RawMessage>, QueueError>;

    /// Deletes consumed messages in one request; callers are expected to
    /// chunk this to the backend's batch limit themselves.
    async fn delete_batch(&self, receipts: &[String]) -> Result<(), QueueError>;
}

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("transient object store error: {0}")]
    Transient(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ObjectStoreError>;
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), ObjectStoreError>;
}

#[derive(Debug, Error)]
pub enum KvStoreError {
    #[error("transient key-value store error: {0}")]
    Transient(String),
}

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Batch-reads the given keys; silently omits keys that don't exist.
    /// `key` is `(pk, sk)`.
    async fn batch_get(&self, keys: &[(String, String)]) -> Result<Vec<(String, String, serde_json::Value)>, KvStoreError>;

    /// Batch-writes rows, each `(pk, sk, attributes)`. Implementations
    /// upsert: a matching `(pk, sk)` already present is overwritten.
    async fn batch_write(&self, rows: Vec<(String, String, serde_json::Value)>) -> Result<(), KvStoreError>;
}
