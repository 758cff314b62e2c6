use crate::error::{ClusterError, Result};
use crate::pool::{PoolStore, Slot};
use serde::{Deserialize, Serialize};

/// The self-describing, on-disk form of a `PoolStore`. Distances are never
/// persisted: they're cheap to re-derive from centroids, and persisting
/// them would double the checkpoint size for no benefit.
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointBlob {
    version: u32,
    dim: u32,
    cluster_count: u64,
    slots: Vec<CheckpointSlot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointSlot {
    cluster_id: String,
    is_cluster: bool,
    members: Vec<String>,
    centroid: Vec<f32>,
}

const BLOB_VERSION: u32 = 1;

/// Serializes a pool into a self-describing binary blob.
pub fn save(pool: &PoolStore) -> Result<Vec<u8>> {
    let blob = CheckpointBlob {
        version: BLOB_VERSION,
        dim: pool.dim() as u32,
        cluster_count: pool.cluster_count(),
        slots: pool
            .slots()
            .iter()
            .map(|s| CheckpointSlot {
                cluster_id: s.cluster_id.clone(),
                is_cluster: s.is_cluster,
                members: s.members.clone(),
                centroid: s.centroid.clone(),
            })
            .collect(),
    };
    bincode::serde::encode_to_vec(&blob, bincode::config::standard())
        .map_err(|e| ClusterError::CheckpointCorrupt(e.to_string()))
}

/// Deserializes a pool from a checkpoint blob, validating internal
/// consistency (uniform centroid dimensionality, parsable header).
pub fn load(bytes: &[u8]) -> Result<PoolStore> {
    let (blob, _): (CheckpointBlob, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| ClusterError::CheckpointCorrupt(e.to_string()))?;

    if blob.version != BLOB_VERSION {
        return Err(ClusterError::CheckpointCorrupt(format!(
            "unsupported checkpoint version {}",
            blob.version
        )));
    }

    let dim = blob.dim as usize;
    for slot in &blob.slots {
        if slot.centroid.len() != dim {
            return Err(ClusterError::CheckpointCorrupt(format!(
                "slot {} has centroid dim {}, header declares {}",
                slot.cluster_id,
                slot.centroid.len(),
                dim
            )));
        }
    }

    let slots: Vec<Slot> = blob
        .slots
        .into_iter()
        .map(|s| Slot {
            cluster_id: s.cluster_id,
            members: s.members,
            centroid: s.centroid,
            is_cluster: s.is_cluster,
        })
        .collect();

    let pool = PoolStore::from_slots(slots, dim, blob.cluster_count);
    pool.check_invariants()?;
    Ok(pool)
}
