use chrono::Utc;
use cluster_core::StepResult;
use common_types::{ArticleRow, Doc, KvKey, MetadataRow};
use external_clients::KvStoreError;
use std::collections::HashMap;
use tracing::warn;

use crate::context::ClustererContext;

const METADATA_READ_CHUNK: usize = 100;

/// Applies one step's clustering result to the key-value store: bumps or
/// creates metadata rows, writes one article row per document touched this
/// batch, and collapses any `(PK, SK)` collisions into a single upsert.
pub async fn apply(context: &ClustererContext, batch: &[Doc], result: &StepResult) -> Result<(), KvStoreError> {
    let collapsed = collapse_updated_clusters(result);
    let metadata_keys: Vec<(String, String)> = collapsed
        .keys()
        .map(|cluster_id| {
            let key = KvKey::metadata(cluster_id);
            (key.pk, key.sk)
        })
        .collect();

    let mut existing_counts: HashMap<String, i64> = HashMap::new();
    for chunk in metadata_keys.chunks(METADATA_READ_CHUNK) {
        let rows = context.kv_store.batch_get(chunk).await?;
        for (pk, _sk, attributes) in rows {
            if let Some(n) = attributes.get("number_of_articles").and_then(|v| v.as_i64()) {
                existing_counts.insert(pk, n);
            }
        }
    }

    let mut rows: HashMap<(String, String), serde_json::Value> = HashMap::new();
    let now = Utc::now();

    for (cluster_id, added) in &collapsed {
        let key = KvKey::metadata(cluster_id);
        let row = match existing_counts.get(cluster_id) {
            Some(&current) => MetadataRow {
                key: key.clone(),
                number_of_articles: current + added.len() as i64,
                created_at: now,
                generated_summary: String::new(),
                summary_count: 0,
                is_cluster: true,
            },
            None => MetadataRow {
                key: key.clone(),
                number_of_articles: added.len() as i64 + 1,
                created_at: now,
                generated_summary: String::new(),
                summary_count: 0,
                is_cluster: true,
            },
        };
        insert_row(&mut rows, key, serde_json::to_value(row).expect("MetadataRow always serializes"));
    }

    let docs_by_id: HashMap<&str, &Doc> = batch.iter().map(|d| (d.id.as_str(), d)).collect();

    for (article_id, cluster_id) in &result.membership {
        let key = KvKey::article(cluster_id, article_id);
        let row = match docs_by_id.get(article_id.as_str()) {
            Some(doc) => ArticleRow {
                key: key.clone(),
                article_id: article_id.clone(),
                title: doc.payload.title.clone(),
                summary: doc.payload.summary.clone(),
                text: doc.payload.text.clone(),
                organizations: doc.payload.organizations.clone(),
                locations: doc.payload.locations.clone(),
                publication_date: doc.payload.publication_date.clone(),
                entry_creation_date: now,
            },
            None => ArticleRow {
                key: key.clone(),
                article_id: article_id.clone(),
                entry_creation_date: now,
                ..Default::default()
            },
        };
        insert_row(&mut rows, key, serde_json::to_value(row).expect("ArticleRow always serializes"));
    }

    let write_rows: Vec<(String, String, serde_json::Value)> =
        rows.into_iter().map(|((pk, sk), v)| (pk, sk, v)).collect();
    context.kv_store.batch_write(write_rows).await
}

fn insert_row(rows: &mut HashMap<(String, String), serde_json::Value>, key: KvKey, value: serde_json::Value) {
    if rows.insert((key.pk.clone(), key.sk.clone()), value).is_some() {
        warn!(pk = %key.pk, sk = %key.sk, "collapsed duplicate sink key within batch");
    }
}

/// A cluster can appear more than once in `updated_clusters` when two
/// singletons merge into it within the same batch; collapse by summing
/// their added-member lists before the count increment.
fn collapse_updated_clusters(result: &StepResult) -> HashMap<String, Vec<String>> {
    let mut collapsed: HashMap<String, Vec<String>> = HashMap::new();
    for uc in &result.updated_clusters {
        collapsed
            .entry(uc.cluster_id.clone())
            .or_default()
            .extend(uc.added_member_ids.iter().cloned());
    }
    collapsed
}
