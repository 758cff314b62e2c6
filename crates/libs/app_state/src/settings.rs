use crate::{CheckpointSettings, IngressSettings, LoggingSettings, RawSettings, SecretSettings, StoreSettings};
use cluster_core::{CentroidPolicy, ClustererConfig};

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub clusterer: ClustererConfig,
    pub embedding_dim: usize,
    pub ingress: IngressSettings,
    pub checkpoint: CheckpointSettings,
    pub store: StoreSettings,
    pub logging: LoggingSettings,
    pub secrets: SecretSettings,
}

impl From<RawSettings> for AppSettings {
    fn from(raw: RawSettings) -> Self {
        let centroid_policy = match raw.clustering.centroid_policy.as_str() {
            "size_weighted" => CentroidPolicy::SizeWeighted,
            _ => CentroidPolicy::BatchMean,
        };

        let clusterer = ClustererConfig {
            eps: raw.clustering.eps,
            min_samples: raw.clustering.min_samples,
            sparse_threshold: raw.clustering.sparse_threshold,
            block_size: raw.clustering.block_size,
            centroid_policy,
        };

        Self {
            clusterer,
            embedding_dim: raw.clustering.embedding_dim,
            ingress: raw.ingress,
            checkpoint: raw.checkpoint,
            store: raw.store,
            logging: raw.logging,
            secrets: raw.secrets,
        }
    }
}
