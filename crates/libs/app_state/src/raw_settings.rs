use serde::Deserialize;

/// What's literally in `config/settings.yaml` plus environment overrides,
/// before any derived values are computed.
#[derive(Debug, Deserialize, Clone)]
pub struct RawSettings {
    pub clustering: ClusteringSettings,
    pub ingress: IngressSettings,
    pub checkpoint: CheckpointSettings,
    pub store: StoreSettings,
    pub logging: LoggingSettings,
    pub secrets: SecretSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClusteringSettings {
    pub eps: f32,
    pub min_samples: usize,
    pub embedding_dim: usize,
    pub sparse_threshold: usize,
    pub block_size: usize,
    /// "batch_mean" or "size_weighted".
    pub centroid_policy: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngressSettings {
    pub batch_size: usize,
    pub receiver_threads: usize,
    pub per_receiver_batch: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckpointSettings {
    pub checkpoint_every: u64,
    pub checkpoint_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub queue_url: String,
    pub kv_table: String,
    pub object_store_bucket: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecretSettings {
    pub database_url: String,
}
