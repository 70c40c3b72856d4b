use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Record, Target};
use crate::error::{AppError, AppResult};
use crate::infrastructure::document_store::{Collection, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteStatus {
    Upvoted,
    Downvoted,
}

impl VoteStatus {
    pub fn parse(status: &str) -> AppResult<Self> {
        match status {
            "upvoted" => Ok(VoteStatus::Upvoted),
            "downvoted" => Ok(VoteStatus::Downvoted),
            _ => Err(AppError::Validation(
                "Invalid voteStatus. Must be 'upvoted' or 'downvoted'".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteFields {
    #[serde(flatten)]
    pub target: Target,
    pub vote_status: VoteStatus,
    pub voter_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: String,
    #[serde(flatten)]
    pub target: Target,
    pub vote_status: VoteStatus,
    pub voter_id: String,
    pub created_at: DateTime<Utc>,
}

impl Record for Vote {
    const COLLECTION: Collection = Collection::Votes;

    fn from_document(doc: Document) -> AppResult<Self> {
        let fields: VoteFields = doc.decode()?;
        Ok(Self {
            id: doc.id,
            target: fields.target,
            vote_status: fields.vote_status,
            voter_id: fields.voter_id,
            created_at: doc.created_at,
        })
    }
}

/// Up/down totals for one target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub upvotes: u64,
    pub downvotes: u64,
}

impl VoteTally {
    pub fn total(&self) -> u64 {
        self.upvotes + self.downvotes
    }

    pub fn score(&self) -> i64 {
        self.upvotes as i64 - self.downvotes as i64
    }
}
