use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Record, Target};
use crate::error::AppResult;
use crate::infrastructure::document_store::{Collection, Document};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentFields {
    pub content: String,
    pub author_id: String,
    #[serde(flatten)]
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub author_id: String,
    #[serde(flatten)]
    pub target: Target,
    pub created_at: DateTime<Utc>,
}

impl Record for Comment {
    const COLLECTION: Collection = Collection::Comments;

    fn from_document(doc: Document) -> AppResult<Self> {
        let fields: CommentFields = doc.decode()?;
        Ok(Self {
            id: doc.id,
            content: fields.content,
            author_id: fields.author_id,
            target: fields.target,
            created_at: doc.created_at,
        })
    }
}
