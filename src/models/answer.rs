use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Record;
use crate::error::AppResult;
use crate::infrastructure::document_store::{Collection, Document};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFields {
    pub content: String,
    pub author_id: String,
    pub question_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub question_id: String,
    pub created_at: DateTime<Utc>,
}

impl Record for Answer {
    const COLLECTION: Collection = Collection::Answers;

    fn from_document(doc: Document) -> AppResult<Self> {
        let fields: AnswerFields = doc.decode()?;
        Ok(Self {
            id: doc.id,
            content: fields.content,
            author_id: fields.author_id,
            question_id: fields.question_id,
            created_at: doc.created_at,
        })
    }
}
