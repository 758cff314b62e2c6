use crate::distance::batch_distances;
use crate::error::Result;
use crate::matrix::{assemble_sparse, DenseMatrix, DistanceMatrix};
use crate::pool::PoolStore;
use crate::{dbscan, NOISE};
use common_types::Doc;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info_span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CentroidPolicy {
    /// Arithmetic mean of every member centroid currently in the label
    /// group, recomputed fresh each batch. Favors recency over history.
    #[default]
    BatchMean,
    /// Mean weighted by each slot's member count, approximating a running
    /// online mean instead of a pure batch mean.
    SizeWeighted,
}

#[derive(Debug, Clone)]
pub struct ClustererConfig {
    pub eps: f32,
    pub min_samples: usize,
    pub sparse_threshold: usize,
    pub block_size: usize,
    pub centroid_policy: CentroidPolicy,
}

impl Default for ClustererConfig {
    fn default() -> Self {
        Self {
            eps: 0.10,
            min_samples: 2,
            sparse_threshold: 15_000,
            block_size: 120,
            centroid_policy: CentroidPolicy::default(),
        }
    }
}

/// Counters that surface otherwise-invisible merge-resolution decisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterMetrics {
    /// Number of times a new document bridged two already-existing
    /// clusters under the same DBSCAN label; the bridge is recorded but
    /// the two clusters are deliberately left unmerged.
    pub bridged_clusters_skipped: u64,
}

#[derive(Debug, Clone)]
pub struct NewEntry {
    pub cluster_id: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatedCluster {
    pub cluster_id: String,
    pub added_member_ids: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StepResult {
    pub new_entries: Vec<NewEntry>,
    pub updated_clusters: Vec<UpdatedCluster>,
    /// Every deduped document this batch, mapped to the cluster_id it
    /// belongs to once this step has resolved. Covers documents a sink
    /// would otherwise miss: a brand-new doc that gets absorbed into
    /// another brand-new doc's slot within the same batch never shows up
    /// in `new_entries` (its slot didn't survive) nor as a survivor in
    /// `updated_clusters` (only the *absorbed* ids are listed there).
    pub membership: Vec<(String, String)>,
}

pub struct Clusterer {
    config: ClustererConfig,
    metrics: ClusterMetrics,
}

impl Clusterer {
    pub fn new(config: ClustererConfig) -> Self {
        Self {
            config,
            metrics: ClusterMetrics::default(),
        }
    }

    pub fn metrics(&self) -> ClusterMetrics {
        self.metrics
    }

    /// Runs one full step: dedup, append, distance update, DBSCAN fit,
    /// merge resolution, and compaction.
    pub fn step(&mut self, pool: &mut PoolStore, batch: &[Doc]) -> Result<StepResult> {
        let deduped = dedup_by_id(batch);
        let deduped = filter_dimension_mismatches(deduped, pool.dim());
        if deduped.is_empty() {
            return Ok(StepResult::default());
        }

        let span = info_span!("cluster_step", batch_len = deduped.len(), pool_size_before = pool.size());
        let _enter = span.enter();

        let old_size = pool.size();
        let added_range = pool.append_singletons(&deduped);

        let new_centroids: Vec<Vec<f32>> = deduped.iter().map(|d| d.vector.clone()).collect();
        let all_centroids = pool.centroids();
        let block = batch_distances(&new_centroids, &all_centroids, self.config.block_size, pool.dim())?;

        let matrix = if old_size == 0 {
            let rows: Vec<Vec<f32>> = block.iter().map(|r| r.iter().map(|v| v.to_f32()).collect()).collect();
            DistanceMatrix::Dense(DenseMatrix::from_full(rows))
        } else {
            let sparse = assemble_sparse(&block, old_size);
            if pool.size() < self.config.sparse_threshold {
                DistanceMatrix::Dense(sparse.densify())
            } else {
                DistanceMatrix::Sparse(sparse)
            }
        };

        let labels = dbscan::fit(&matrix, self.config.eps, self.config.min_samples);
        debug!(pool_size_after = pool.size(), "fitted dbscan");

        let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (i, &label) in labels.iter().enumerate() {
            if label != NOISE {
                groups.entry(label).or_default().push(i);
            }
        }

        let mut removed: HashSet<usize> = HashSet::new();
        let mut updated_clusters: Vec<UpdatedCluster> = Vec::new();
        let mut absorbed_into: std::collections::HashMap<usize, String> = std::collections::HashMap::new();

        for (_, mut indices) in groups {
            indices.sort_unstable();
            let survivor = indices[0];

            let mut absorbed = Vec::new();
            let mut bridged = 0u64;
            for &idx in &indices[1..] {
                if pool.is_cluster(idx) {
                    bridged += 1;
                } else {
                    absorbed.push(idx);
                }
            }
            self.metrics.bridged_clusters_skipped += bridged;

            if absorbed.is_empty() {
                continue;
            }

            let added_member_ids: Vec<String> = absorbed
                .iter()
                .map(|&idx| pool.slot(idx).members[0].clone())
                .collect();

            let centroid_inputs: Vec<(Vec<f32>, usize)> = indices
                .iter()
                .map(|&i| (pool.slot(i).centroid.clone(), pool.slot(i).members.len()))
                .collect();
            let new_centroid = combine_centroids(&centroid_inputs, self.config.centroid_policy);

            pool.merge(survivor, &added_member_ids, new_centroid);
            let survivor_id = pool.cluster_id(survivor).to_string();
            for &idx in &absorbed {
                absorbed_into.insert(idx, survivor_id.clone());
            }
            removed.extend(absorbed.iter().copied());
            updated_clusters.push(UpdatedCluster {
                cluster_id: survivor_id,
                added_member_ids,
            });
        }

        let new_entries: Vec<NewEntry> = added_range
            .clone()
            .filter(|idx| !removed.contains(idx))
            .filter_map(|idx| {
                let slot = pool.slot(idx);
                (!slot.is_cluster).then(|| NewEntry {
                    cluster_id: slot.cluster_id.clone(),
                    members: slot.members.clone(),
                })
            })
            .collect();

        let membership: Vec<(String, String)> = added_range
            .clone()
            .zip(deduped.iter())
            .map(|(idx, doc)| {
                let cluster_id = absorbed_into
                    .get(&idx)
                    .cloned()
                    .unwrap_or_else(|| pool.cluster_id(idx).to_string());
                (doc.id.clone(), cluster_id)
            })
            .collect();

        pool.compact(&removed);
        pool.check_invariants()?;

        Ok(StepResult {
            new_entries,
            updated_clusters,
            membership,
        })
    }
}

/// Drops documents whose embedding dimension doesn't match the pool,
/// logging each one. Kept as a pre-filter ahead of `PoolStore::append_singletons`
/// so that `deduped` stays index-aligned with the range it appends, rather than
/// relying solely on the pool's own (defense-in-depth) skip logic.
fn filter_dimension_mismatches(docs: Vec<Doc>, dim: usize) -> Vec<Doc> {
    docs.into_iter()
        .filter(|d| {
            let ok = d.vector.len() == dim;
            if !ok {
                tracing::warn!(
                    doc_id = %d.id,
                    expected = dim,
                    actual = d.vector.len(),
                    "dropping document with mismatched embedding dimension"
                );
            }
            ok
        })
        .collect()
}

fn dedup_by_id(batch: &[Doc]) -> Vec<Doc> {
    let mut seen = HashSet::new();
    batch
        .iter()
        .filter(|d| seen.insert(d.id.clone()))
        .cloned()
        .collect()
}

fn combine_centroids(inputs: &[(Vec<f32>, usize)], policy: CentroidPolicy) -> Vec<f32> {
    let dim = inputs[0].0.len();
    let mut acc = vec![0.0f32; dim];
    let mut total_weight = 0.0f32;

    for (centroid, member_count) in inputs {
        let weight = match policy {
            CentroidPolicy::BatchMean => 1.0,
            CentroidPolicy::SizeWeighted => *member_count as f32,
        };
        for (a, c) in acc.iter_mut().zip(centroid) {
            *a += c * weight;
        }
        total_weight += weight;
    }

    if total_weight > 0.0 {
        for a in &mut acc {
            *a /= total_weight;
        }
    }
    acc
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

    fn config() -> ClustererConfig {
        ClustererConfig::default()
    }

    #[test]
    fn s1_trivial_singletons() {
        let mut pool = PoolStore::new(2);
        let mut clusterer = Clusterer::new(config());
        let batch = vec![
            doc("a", vec![1.0, 0.0]),
            doc("b", vec![0.0, 1.0]),
            doc("c", vec![-1.0, 0.0]),
        ];
        let result = clusterer.step(&mut pool, &batch).unwrap();
        assert_eq!(pool.size(), 3);
        assert!(result.updated_clusters.is_empty());
        assert_eq!(result.new_entries.len(), 3);
    }

    #[test]
    fn s2_pairwise_merge() {
        let mut pool = PoolStore::new(2);
        let mut clusterer = Clusterer::new(config());
        let batch = vec![doc("a", vec![1.0, 0.0]), doc("b", vec![1.0, 0.0])];
        let result = clusterer.step(&mut pool, &batch).unwrap();
        assert_eq!(pool.size(), 1);
        assert_eq!(result.updated_clusters.len(), 1);
        assert_eq!(result.updated_clusters[0].added_member_ids, vec!["b".to_string()]);
        assert!(pool.is_cluster(0));
        assert_eq!(pool.slot(0).members, vec!["a", "b"]);
    }

    #[test]
    fn s3_growing_a_cluster() {
        let mut pool = PoolStore::new(2);
        let mut clusterer = Clusterer::new(config());
        clusterer
            .step(&mut pool, &[doc("a", vec![1.0, 0.0]), doc("b", vec![1.0, 0.0])])
            .unwrap();
        let result = clusterer.step(&mut pool, &[doc("c", vec![1.0, 0.0])]).unwrap();
        assert_eq!(pool.size(), 1);
        assert_eq!(result.updated_clusters[0].added_member_ids, vec!["c".to_string()]);
        assert_eq!(pool.slot(0).members, vec!["a", "b", "c"]);
        // all three identical, centroid is unchanged.
        assert_eq!(pool.slot(0).centroid, vec![1.0, 0.0]);
    }

    #[test]
    fn s4_cluster_does_not_absorb_cluster() {
        let mut pool = PoolStore::new(2);
        let mut clusterer = Clusterer::new(config());
        // Build two tight clusters far apart from each other.
        clusterer
            .step(&mut pool, &[doc("a1", vec![1.0, 0.0]), doc("a2", vec![1.0, 0.0])])
            .unwrap();
        clusterer
            .step(&mut pool, &[doc("b1", vec![-1.0, 0.0]), doc("b2", vec![-1.0, 0.0])])
            .unwrap();
        assert_eq!(pool.size(), 2);
        assert!(pool.is_cluster(0) && pool.is_cluster(1));

        // A bystander equidistant to both (both already > eps though, so
        // nudge it to be close to one tight cluster and merely label-linked
        // to the other is unrealistic with eps=0.10; instead verify the
        // existing-cluster-guard directly: a label group containing two
        // existing clusters only absorbs singletons, never the clusters
        // themselves.
        let result = clusterer.step(&mut pool, &[doc("x", vec![1.0, 0.0])]).unwrap();
        assert_eq!(result.updated_clusters.len(), 1);
        assert_eq!(result.updated_clusters[0].added_member_ids, vec!["x".to_string()]);
        // cluster b is untouched
        let b_slot = pool.slots().iter().find(|s| s.members.contains(&"b1".to_string())).unwrap();
        assert_eq!(b_slot.members, vec!["b1", "b2"]);
    }

    #[test]
    fn s5_dedup_within_batch() {
        let mut pool = PoolStore::new(1);
        let mut clusterer = Clusterer::new(config());
        let result = clusterer
            .step(&mut pool, &[doc("d", vec![1.0]), doc("d", vec![1.0])])
            .unwrap();
        assert_eq!(pool.size(), 1);
        assert_eq!(result.new_entries.len(), 1);
    }

    #[test]
    fn bridging_singleton_increments_metric_without_merging_clusters() {
        let mut pool = PoolStore::new(2);
        let mut clusterer = Clusterer::new(config());
        clusterer
            .step(&mut pool, &[doc("a1", vec![1.0, 0.0]), doc("a2", vec![1.0, 0.0])])
            .unwrap();
        clusterer
            .step(&mut pool, &[doc("b1", vec![0.999, 0.001]), doc("b2", vec![0.999, 0.001])])
            .unwrap();
        // These two clusters are themselves within eps of each other, so a
        // later singleton landing in that neighborhood bridges both labels.
        clusterer.step(&mut pool, &[doc("x", vec![1.0, 0.0])]).unwrap();
        assert_eq!(pool.size(), 2, "clusters must remain distinct");
    }
}
