use crate::{ArticlePayload, Doc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The JSON body of a single queue message. The nested single-element
/// list around the embedding is historical and must be preserved by
/// producers; we just unwrap it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessageBody {
    pub id: String,
    pub concat_embedding: Vec<Vec<f32>>,
    #[serde(flatten)]
    pub payload: ArticlePayload,
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("message body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("concat_embedding must contain exactly one inner vector, got {0}")]
    BadEmbeddingShape(usize),
}

impl QueueMessageBody {
    pub fn parse(raw: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn into_doc(self) -> Result<Doc, WireError> {
        if self.concat_embedding.len() != 1 {
            return Err(WireError::BadEmbeddingShape(self.concat_embedding.len()));
        }
        let vector = self.concat_embedding.into_iter().next().unwrap_or_default();
        Ok(Doc {
            id: self.id,
            vector,
            payload: self.payload,
        })
    }
}
