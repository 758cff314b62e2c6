#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

pub mod memory;
pub mod postgres_kv;
pub mod retry;
pub mod s3;
pub mod sqs;
pub mod traits;

pub use memory::{InMemoryKvStore, InMemoryObjectStore, InMemoryQueue};
pub use postgres_kv::PostgresKvStore;
pub use s3::S3ObjectStore;
pub use sqs::SqsQueue;
pub use traits::{KvStore, KvStoreError, MessageQueue, ObjectStore, ObjectStoreError, QueueError, RawMessage};
