use app_state::AppSettings;
use external_clients::{KvStore, MessageQueue, ObjectStore};
use std::sync::Arc;

/// Everything a clustering step needs to reach the outside world.
pub struct ClustererContext {
    pub settings: AppSettings,
    pub queue: Arc<dyn MessageQueue>,
    pub object_store: Arc<dyn ObjectStore>,
    pub kv_store: Arc<dyn KvStore>,
}

impl ClustererContext {
    pub fn new(
        settings: AppSettings,
        queue: Arc<dyn MessageQueue>,
        object_store: Arc<dyn ObjectStore>,
        kv_store: Arc<dyn KvStore>,
    ) -> Self {
        Self {
            settings,
            queue,
            object_store,
            kv_store,
        }
    }
}
