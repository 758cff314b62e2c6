#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

pub mod checkpoint;
pub mod clusterer;
pub mod dbscan;
pub mod distance;
pub mod error;
pub mod matrix;
pub mod pool;

pub use clusterer::{CentroidPolicy, Clusterer, ClustererConfig, ClusterMetrics, NewEntry, StepResult, UpdatedCluster};
pub use dbscan::NOISE;
pub use error::{ClusterError, Result};
pub use matrix::DistanceMatrix;
pub use pool::{PoolStore, Slot};
