use serde::{Deserialize, Serialize};

/// A single embedded article as handed from ingress to the clusterer.
#[derive(Debug, Clone, PartialEq)]
pub struct Doc {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: ArticlePayload,
}

/// Everything about an article the core never inspects, carried through
/// to the sink untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArticlePayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "organizations_fd")]
    pub organizations: Vec<String>,
    #[serde(default, rename = "locations_fd")]
    pub locations: Vec<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
}
