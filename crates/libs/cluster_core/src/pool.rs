use crate::error::{ClusterError, Result};
use common_types::Doc;
use std::collections::HashSet;
use std::ops::Range;
use uuid::Uuid;

/// One row of the pool: either a cluster or a still-unmerged singleton.
#[derive(Debug, Clone)]
pub struct Slot {
    pub cluster_id: String,
    pub members: Vec<String>,
    pub centroid: Vec<f32>,
    pub is_cluster: bool,
}

/// The in-memory pool of clusters and singletons. Owns the three parallel
/// facts about each slot (identity, membership, centroid) and is the only
/// thing allowed to grow or shrink them.
#[derive(Debug, Clone)]
pub struct PoolStore {
    slots: Vec<Slot>,
    dim: usize,
    cluster_count: u64,
}

impl PoolStore {
    pub fn new(dim: usize) -> Self {
        Self {
            slots: Vec::new(),
            dim,
            cluster_count: 0,
        }
    }

    pub fn from_slots(slots: Vec<Slot>, dim: usize, cluster_count: u64) -> Self {
        Self {
            slots,
            dim,
            cluster_count,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn cluster_count(&self) -> u64 {
        self.cluster_count
    }

    pub fn slot(&self, i: usize) -> &Slot {
        &self.slots[i]
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn cluster_id(&self, i: usize) -> &str {
        &self.slots[i].cluster_id
    }

    pub fn is_cluster(&self, i: usize) -> bool {
        self.slots[i].is_cluster
    }

    pub fn centroids(&self) -> Vec<Vec<f32>> {
        self.slots.iter().map(|s| s.centroid.clone()).collect()
    }

    /// Appends one fresh singleton slot per document, returning the range
    /// of newly occupied indices. A document whose embedding dimension
    /// doesn't match the pool's is skipped with a warning rather than
    /// failing the whole call — one bad embedding must not block every
    /// other document in the batch.
    pub fn append_singletons(&mut self, docs: &[Doc]) -> Range<usize> {
        let start = self.slots.len();
        for doc in docs {
            if doc.vector.len() != self.dim {
                tracing::warn!(
                    doc_id = %doc.id,
                    expected = self.dim,
                    actual = doc.vector.len(),
                    "skipping document with mismatched embedding dimension"
                );
                continue;
            }
            self.slots.push(Slot {
                cluster_id: Uuid::new_v4().to_string(),
                members: vec![doc.id.clone()],
                centroid: doc.vector.clone(),
                is_cluster: false,
            });
        }
        start..self.slots.len()
    }

    /// Absorbs `new_members` into `survivor_idx`, replacing its centroid and
    /// flipping `is_cluster` (bumping `cluster_count` only the first time).
    pub fn merge(&mut self, survivor_idx: usize, new_members: &[String], new_centroid: Vec<f32>) {
        let slot = &mut self.slots[survivor_idx];
        slot.members.extend_from_slice(new_members);
        slot.centroid = new_centroid;
        if !slot.is_cluster {
            slot.is_cluster = true;
            self.cluster_count += 1;
        }
    }

    /// Removes the given set of slot indices in one pass, preserving the
    /// relative order of survivors. Indices into the pool taken before this
    /// call are invalid afterward.
    pub fn compact(&mut self, removed: &HashSet<usize>) {
        if removed.is_empty() {
            return;
        }
        let mut kept = Vec::with_capacity(self.slots.len().saturating_sub(removed.len()));
        for (i, slot) in self.slots.drain(..).enumerate() {
            if !removed.contains(&i) {
                kept.push(slot);
            }
        }
        self.slots = kept;
    }

    /// Verifies the invariants that must hold between every public
    /// operation: unique cluster ids, unique members, consistent
    /// dimensionality, and a stable is_cluster flag.
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen_ids = HashSet::new();
        let mut seen_members = HashSet::new();
        for slot in &self.slots {
            if !seen_ids.insert(slot.cluster_id.as_str()) {
                return Err(ClusterError::PoolInvariantViolated(format!(
                    "duplicate cluster_id {}",
                    slot.cluster_id
                )));
            }
            if slot.members.is_empty() {
                return Err(ClusterError::PoolInvariantViolated(format!(
                    "slot {} has no members",
                    slot.cluster_id
                )));
            }
            if slot.centroid.len() != self.dim {
                return Err(ClusterError::PoolInvariantViolated(format!(
                    "slot {} centroid has dim {}, expected {}",
                    slot.cluster_id,
                    slot.centroid.len(),
                    self.dim
                )));
            }
            for member in &slot.members {
                if !seen_members.insert(member.as_str()) {
                    return Err(ClusterError::PoolInvariantViolated(format!(
                        "member {member} appears in more than one slot"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::ArticlePayload;

    fn doc(id: &str, v: Vec<f32>) -> Doc {
        Doc {
            id: id.to_string(),
            vector: v,
            payload: ArticlePayload::default(),
        }
    }

    #[test]
    fn append_creates_singletons() {
        let mut pool = PoolStore::new(2);
        let range = pool.append_singletons(&[doc("a", vec![1.0, 0.0]), doc("b", vec![0.0, 1.0])]);
        assert_eq!(range, 0..2);
        assert_eq!(pool.size(), 2);
        assert!(!pool.is_cluster(0));
        pool.check_invariants().unwrap();
    }

    #[test]
    fn merge_flips_is_cluster_once() {
        let mut pool = PoolStore::new(2);
        pool.append_singletons(&[doc("a", vec![1.0, 0.0])]);
        assert_eq!(pool.cluster_count(), 0);
        pool.merge(0, &["b".to_string()], vec![0.5, 0.5]);
        assert!(pool.is_cluster(0));
        assert_eq!(pool.cluster_count(), 1);
        pool.merge(0, &["c".to_string()], vec![0.3, 0.3]);
        assert_eq!(pool.cluster_count(), 1);
        assert_eq!(pool.slot(0).members, vec!["a", "b", "c"]);
    }

    #[test]
    fn compact_preserves_relative_order() {
        let mut pool = PoolStore::new(1);
        pool.append_singletons(&[
            doc("a", vec![1.0]),
            doc("b", vec![2.0]),
            doc("c", vec![3.0]),
            doc("d", vec![4.0]),
        ]);
        let removed: HashSet<usize> = [1].into_iter().collect();
        pool.compact(&removed);
        let ids: Vec<&str> = pool.slots().iter().map(|s| s.cluster_id.as_str()).collect();
        assert_eq!(pool.size(), 3);
        // a, c, d survive in that relative order.
        assert_eq!(pool.slot(0).members[0], "a");
        assert_eq!(pool.slot(1).members[0], "c");
        assert_eq!(pool.slot(2).members[0], "d");
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn skips_dimension_mismatched_doc_on_append() {
        let mut pool = PoolStore::new(2);
        let range = pool.append_singletons(&[
            doc("a", vec![1.0, 0.0, 0.0]),
            doc("b", vec![1.0, 0.0]),
        ]);
        assert_eq!(range, 0..1);
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.slot(0).members, vec!["b"]);
    }
}
