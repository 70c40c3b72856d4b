use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Record;
use crate::error::AppResult;
use crate::infrastructure::document_store::{Collection, Document};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFields {
    pub title: String,
    pub content: String,
    pub author_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub tags: Vec<String>,
    pub attachment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Question {
    const COLLECTION: Collection = Collection::Questions;

    fn from_document(doc: Document) -> AppResult<Self> {
        let fields: QuestionFields = doc.decode()?;
        Ok(Self {
            id: doc.id,
            title: fields.title,
            content: fields.content,
            author_id: fields.author_id,
            tags: fields.tags,
            attachment_id: fields.attachment_id.filter(|id| !id.is_empty()),
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }
}

/// Trim tags, drop empty ones and duplicates while keeping first-seen order
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !seen.iter().any(|t: &String| t == tag) {
            seen.push(tag.to_string());
        }
    }
    seen
}
