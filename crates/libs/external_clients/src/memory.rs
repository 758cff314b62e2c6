use crate::traits::{KvStore, KvStoreError, MessageQueue, ObjectStore, ObjectStoreError, QueueError, RawMessage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// An in-memory work queue for tests: `push` enqueues, `receive` pops up
/// to `max_messages`, `delete_batch` is a no-op (there's nothing left to
/// delete once popped).
#[derive(Default)]
pub struct InMemoryQueue {
    messages: Mutex<Vec<RawMessage>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, body: impl Into<String>) {
        let receipt = uuid_like();
        self.messages.lock().unwrap().push(RawMessage {
            body: body.into(),
            receipt,
        });
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn receive(&self, max_messages: u32) -> Result<Vec<RawMessage>, QueueError> {
        let mut messages = self.messages.lock().unwrap();
        let take = (max_messages as usize).min(messages.len());
        Ok(messages.drain(..take).collect())
    }

    async fn delete_batch(&self, _receipts: &[String]) -> Result<(), QueueError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ObjectStoreError> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), ObjectStoreError> {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryKvStore {
    rows: Mutex<HashMap<(String, String), serde_json::Value>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> HashMap<(String, String), serde_json::Value> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn batch_get(&self, keys: &[(String, String)]) -> Result<Vec<(String, String, serde_json::Value)>, KvStoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(keys
            .iter()
            .filter_map(|k| rows.get(k).map(|v| (k.0.clone(), k.1.clone(), v.clone())))
            .collect())
    }

    async fn batch_write(&self, rows: Vec<(String, String, serde_json::Value)>) -> Result<(), KvStoreError> {
        let mut store = self.rows.lock().unwrap();
        for (pk, sk, value) in rows {
            store.insert((pk, sk), value);
        }
        Ok(())
    }
}

fn uuid_like() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("receipt-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}
