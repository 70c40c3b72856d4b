use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::comment_service::ensure_target_exists;
use super::required;
use crate::error::{AppError, AppResult};
use crate::infrastructure::document_store::{encode_fields, Collection, DocumentStore, Predicate};
use crate::infrastructure::id_generator::DocumentIdGenerator;
use crate::models::vote::{VoteFields, VoteTally};
use crate::models::{Record, RecordStore, Target, Vote, VoteStatus};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVote {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub type_id: Option<String>,
    pub vote_status: Option<String>,
    pub voter_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVote {
    pub vote_id: Option<String>,
    pub voter_id: Option<String>,
}

pub struct VoteService {
    store: Arc<dyn DocumentStore>,
    ids: Arc<DocumentIdGenerator>,
}

impl VoteService {
    pub fn new(store: Arc<dyn DocumentStore>, ids: Arc<DocumentIdGenerator>) -> Self {
        Self { store, ids }
    }

    #[instrument(skip_all)]
    pub async fn cast_vote(&self, input: CastVote) -> AppResult<Vote> {
        let (kind, type_id, status, voter_id) = match (
            required(&input.kind),
            required(&input.type_id),
            required(&input.vote_status),
            required(&input.voter_id),
        ) {
            (Some(k), Some(t), Some(s), Some(v)) => (k, t, s, v),
            _ => return Err(AppError::Validation("Missing required fields".to_string())),
        };
        let target = Target::parse(kind, type_id)?;
        let vote_status = VoteStatus::parse(status)?;

        ensure_target_exists(self.store.as_ref(), &target).await?;

        let fields = encode_fields(&VoteFields {
            target,
            vote_status,
            voter_id: voter_id.to_string(),
        })?;
        let doc = self
            .store
            .create(Collection::Votes, &self.ids.next_id(), fields)
            .await?;
        debug!(vote_id = %doc.id, "Vote recorded");
        Vote::from_document(doc)
    }

    #[instrument(skip_all)]
    pub async fn delete_vote(&self, input: DeleteVote) -> AppResult<Vote> {
        let vote_id = required(&input.vote_id)
            .ok_or_else(|| AppError::Validation("Missing voteId".to_string()))?;

        let vote: Vote = self.store.load(vote_id).await?;
        if let Some(user) = required(&input.voter_id) {
            if user != vote.voter_id {
                return Err(AppError::Unauthorized(
                    "You are not authorized to delete this vote".to_string(),
                ));
            }
        }

        self.store.delete(Collection::Votes, vote_id).await?;
        Ok(vote)
    }

    pub async fn list_votes(&self, target: &Target) -> AppResult<Vec<Vote>> {
        self.store.load_all(&target.predicates()).await
    }

    pub async fn tally(&self, target: &Target) -> AppResult<VoteTally> {
        let mut upvoted = target.predicates();
        upvoted.push(Predicate::equal("voteStatus", "upvoted"));
        let mut downvoted = target.predicates();
        downvoted.push(Predicate::equal("voteStatus", "downvoted"));

        let (upvotes, downvotes) = futures::try_join!(
            self.store.count(Collection::Votes, &upvoted),
            self.store.count(Collection::Votes, &downvoted),
        )?;
        Ok(VoteTally { upvotes, downvotes })
    }
}
