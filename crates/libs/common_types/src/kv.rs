use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Composite primary key used by the key-value sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KvKey {
    pub pk: String,
    pub sk: String,
}

impl KvKey {
    pub fn metadata(cluster_id: &str) -> Self {
        Self {
            pk: cluster_id.to_string(),
            sk: format!("#METADATA#{cluster_id}"),
        }
    }

    pub fn article(cluster_id: &str, article_id: &str) -> Self {
        Self {
            pk: cluster_id.to_string(),
            sk: format!("ARTICLE#{article_id}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRow {
    pub key: KvKey,
    pub number_of_articles: i64,
    pub created_at: DateTime<Utc>,
    pub generated_summary: String,
    pub summary_count: i64,
    pub is_cluster: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleRow {
    pub key: KvKey,
    pub article_id: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub text: Option<String>,
    pub organizations: Vec<String>,
    pub locations: Vec<String>,
    pub publication_date: Option<String>,
    pub entry_creation_date: DateTime<Utc>,
}
