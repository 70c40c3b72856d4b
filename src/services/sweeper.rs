// Orphan sweep
// Removes records left behind when a cascading delete stopped part-way:
// answers of a deleted question and comments or votes of a deleted target.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

use super::cascade::CascadeDeleter;
use crate::error::AppResult;
use crate::infrastructure::document_store::{Collection, DocumentStore};
use crate::models::{Answer, Comment, RecordStore, Target, Vote};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub answers: u64,
    pub comments: u64,
    pub votes: u64,
}

impl SweepReport {
    pub fn total(&self) -> u64 {
        self.answers + self.comments + self.votes
    }
}

pub struct OrphanSweeper {
    store: Arc<dyn DocumentStore>,
    cascade: Arc<CascadeDeleter>,
}

impl OrphanSweeper {
    pub fn new(store: Arc<dyn DocumentStore>, cascade: Arc<CascadeDeleter>) -> Self {
        Self { store, cascade }
    }

    /// Children are listed before their parents, so a record created while the
    /// sweep runs is either absent from its snapshot or finds its parent listed.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> AppResult<SweepReport> {
        let mut report = SweepReport::default();

        let votes: Vec<Vote> = self.store.load_all(&[]).await?;
        let comments: Vec<Comment> = self.store.load_all(&[]).await?;
        let answers: Vec<Answer> = self.store.load_all(&[]).await?;
        let questions = self.ids(Collection::Questions).await?;

        let mut live_answers = HashSet::new();
        for answer in answers {
            if questions.contains(&answer.question_id) {
                live_answers.insert(answer.id);
                continue;
            }
            let cleanup = self.cascade.delete_answer_subtree(&answer.id).await?;
            report.answers += u64::from(cleanup.answer_removed);
            report.comments += cleanup.comments;
            report.votes += cleanup.votes;
        }

        let is_live = |target: &Target| match target {
            Target::Question(id) => questions.contains(id),
            Target::Answer(id) => live_answers.contains(id),
        };

        for comment in comments.iter().filter(|c| !is_live(&c.target)) {
            if self
                .cascade
                .delete_if_present(Collection::Comments, &comment.id)
                .await?
            {
                report.comments += 1;
            }
        }

        for vote in votes.iter().filter(|v| !is_live(&v.target)) {
            if self
                .cascade
                .delete_if_present(Collection::Votes, &vote.id)
                .await?
            {
                report.votes += 1;
            }
        }

        if report.total() > 0 {
            info!(
                answers = report.answers,
                comments = report.comments,
                votes = report.votes,
                "Removed orphaned records"
            );
        }
        Ok(report)
    }

    async fn ids(&self, collection: Collection) -> AppResult<HashSet<String>> {
        Ok(self
            .store
            .list_all(collection, &[])
            .await?
            .into_iter()
            .map(|doc| doc.id)
            .collect())
    }
}
