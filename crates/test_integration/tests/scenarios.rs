use cluster_core::{checkpoint, CentroidPolicy, Clusterer, ClustererConfig, PoolStore};
use common_types::{ArticlePayload, Doc};

fn config() -> ClustererConfig {
    ClustererConfig {
        eps: 0.10,
        min_samples: 2,
        sparse_threshold: 15_000,
        block_size: 120,
        centroid_policy: CentroidPolicy::BatchMean,
    }
}

fn doc(id: &str, vector: Vec<f32>) -> Doc {
    Doc {
        id: id.to_string(),
        vector,
        payload: ArticlePayload::default(),
    }
}

fn unit_at_angle(theta_deg: f32) -> Vec<f32> {
    let theta = theta_deg.to_radians();
    vec![theta.cos(), theta.sin()]
}

#[test]
fn s1_trivial_singletons() {
    let mut pool = PoolStore::new(2);
    let mut clusterer = Clusterer::new(config());

    let batch = vec![
        doc("a", unit_at_angle(0.0)),
        doc("b", unit_at_angle(90.0)),
        doc("c", unit_at_angle(180.0)),
    ];
    let result = clusterer.step(&mut pool, &batch).unwrap();

    assert_eq!(pool.size(), 3);
    assert!(result.updated_clusters.is_empty());
    assert_eq!(result.new_entries.len(), 3);
    for entry in &result.new_entries {
        assert_eq!(entry.members.len(), 1);
    }
}

#[test]
fn s2_pairwise_merge() {
    let mut pool = PoolStore::new(2);
    let mut clusterer = Clusterer::new(config());

    let batch = vec![doc("a", unit_at_angle(0.0)), doc("b", unit_at_angle(0.0))];
    let result = clusterer.step(&mut pool, &batch).unwrap();

    assert_eq!(pool.size(), 1);
    assert_eq!(pool.slot(0).members, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(result.updated_clusters.len(), 1);
    assert_eq!(result.updated_clusters[0].added_member_ids, vec!["b".to_string()]);
    // The survivor (A's slot) isn't in new_entries or added_member_ids, but
    // must still surface for sink purposes via membership.
    assert!(result.membership.contains(&("a".to_string(), result.updated_clusters[0].cluster_id.clone())));
    assert!(result.membership.contains(&("b".to_string(), result.updated_clusters[0].cluster_id.clone())));
}

#[test]
fn s3_growing_a_cluster() {
    let mut pool = PoolStore::new(2);
    let mut clusterer = Clusterer::new(config());

    clusterer
        .step(&mut pool, &[doc("a", unit_at_angle(0.0)), doc("b", unit_at_angle(0.0))])
        .unwrap();

    let result = clusterer.step(&mut pool, &[doc("c", unit_at_angle(0.0))]).unwrap();

    assert_eq!(pool.size(), 1);
    assert_eq!(pool.slot(0).members, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    assert_eq!(result.updated_clusters.len(), 1);
    assert_eq!(result.updated_clusters[0].added_member_ids, vec!["c".to_string()]);
    // All three embeddings are identical, so the mean centroid is unchanged.
    assert_eq!(pool.slot(0).centroid, unit_at_angle(0.0));
}

#[test]
fn s4_cluster_does_not_absorb_cluster() {
    let mut pool = PoolStore::new(2);
    let mut clusterer = Clusterer::new(config());

    // Two clusters 30 degrees apart (distance ~0.134, outside eps of each
    // other) each already a cluster in its own right before X arrives.
    clusterer
        .step(&mut pool, &[doc("a1", unit_at_angle(0.0)), doc("a2", unit_at_angle(0.0))])
        .unwrap();
    clusterer
        .step(&mut pool, &[doc("b1", unit_at_angle(30.0)), doc("b2", unit_at_angle(30.0))])
        .unwrap();
    assert_eq!(pool.size(), 2);

    let c1_id = pool.cluster_id(0).to_string();
    let c2_id = pool.cluster_id(1).to_string();

    // X sits at the midpoint, within eps (~0.034) of both clusters.
    let result = clusterer.step(&mut pool, &[doc("x", unit_at_angle(15.0))]).unwrap();

    // X joins exactly one cluster (the lowest-index survivor); the other
    // is left untouched and a bridge is recorded instead of a merge.
    assert_eq!(pool.size(), 2);
    assert_eq!(result.updated_clusters.len(), 1);
    assert_eq!(result.updated_clusters[0].cluster_id, c1_id);
    assert_eq!(result.updated_clusters[0].added_member_ids, vec!["x".to_string()]);
    assert_eq!(clusterer.metrics().bridged_clusters_skipped, 1);
    assert_eq!(pool.cluster_id(1), c2_id);
    assert_eq!(pool.slot(1).members, vec!["b1".to_string(), "b2".to_string()]);
}

#[test]
fn s5_dedup_within_batch() {
    let mut pool = PoolStore::new(2);
    let mut clusterer = Clusterer::new(config());

    let d = doc("d", unit_at_angle(0.0));
    let result = clusterer.step(&mut pool, &[d.clone(), d]).unwrap();

    assert_eq!(pool.size(), 1);
    assert_eq!(result.new_entries.len(), 1);
    assert_eq!(result.new_entries[0].members, vec!["d".to_string()]);
}

#[test]
fn s6_checkpoint_resume_matches_uninterrupted_run() {
    let mut pool = PoolStore::new(2);
    let mut clusterer = Clusterer::new(config());

    clusterer
        .step(&mut pool, &[doc("a", unit_at_angle(0.0)), doc("b", unit_at_angle(0.0))])
        .unwrap();

    let blob = checkpoint::save(&pool).unwrap();
    let mut resumed_pool = checkpoint::load(&blob).unwrap();
    let mut resumed_clusterer = Clusterer::new(config());

    let result = resumed_clusterer
        .step(&mut resumed_pool, &[doc("c", unit_at_angle(0.0))])
        .unwrap();

    assert_eq!(resumed_pool.size(), 1);
    assert_eq!(
        resumed_pool.slot(0).members,
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
    assert_eq!(result.updated_clusters[0].added_member_ids, vec!["c".to_string()]);
}
