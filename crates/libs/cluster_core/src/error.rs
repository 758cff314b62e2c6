use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("pool invariant violated: {0}")]
    PoolInvariantViolated(String),

    #[error("checkpoint blob is corrupt: {0}")]
    CheckpointCorrupt(String),
}

pub type Result<T> = std::result::Result<T, ClusterError>;
