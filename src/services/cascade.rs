// Cascading question deletion
// Removes answers, votes, comments and the attachment before the question itself.
// The store offers no multi-document transactions: a failure part-way leaves the
// remaining dependents in place, and re-running the whole operation is safe.

use futures::{stream, StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::attachment_store::AttachmentStore;
use crate::infrastructure::document_store::{Collection, DocumentStore, Predicate};
use crate::models::{Answer, Question, RecordStore, Target};

/// Number of records removed by one cascading delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionCounts {
    pub answers: u64,
    pub answer_comments: u64,
    pub answer_votes: u64,
    pub question_comments: u64,
    pub question_votes: u64,
    pub attachments: u64,
    pub questions: u64,
}

impl DeletionCounts {
    pub fn total(&self) -> u64 {
        self.answers
            + self.answer_comments
            + self.answer_votes
            + self.question_comments
            + self.question_votes
            + self.attachments
            + self.questions
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletedSummary {
    /// The question as it was before deletion
    pub question: Question,
    pub counts: DeletionCounts,
}

/// Result of removing one answer together with its votes and comments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerCleanup {
    pub votes: u64,
    pub comments: u64,
    /// False when the answer was already gone
    pub answer_removed: bool,
}

pub struct CascadeDeleter {
    store: Arc<dyn DocumentStore>,
    attachments: Arc<dyn AttachmentStore>,
    concurrency: usize,
}

impl CascadeDeleter {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        attachments: Arc<dyn AttachmentStore>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            attachments,
            concurrency: concurrency.max(1),
        }
    }

    /// Delete a question and everything that references it.
    /// With `requesting_user`, only the question's author may delete it.
    #[instrument(skip(self))]
    pub async fn delete_question(
        &self,
        question_id: &str,
        requesting_user: Option<&str>,
    ) -> AppResult<DeletedSummary> {
        let question: Question = self.store.load(question_id).await?;

        if let Some(user) = requesting_user {
            if user != question.author_id {
                warn!(user, author = %question.author_id, "Rejected question deletion by non-author");
                return Err(AppError::Unauthorized(
                    "You are not authorized to delete this question".to_string(),
                ));
            }
        }

        let answers: Vec<Answer> = self
            .store
            .load_all(&[Predicate::equal("questionId", question.id.as_str())])
            .await?;
        debug!(answers = answers.len(), "Deleting question dependents");

        let target = Target::Question(question.id.clone());
        let (answer_stage, question_votes, question_comments) = futures::try_join!(
            self.delete_answers(answers),
            self.delete_references(Collection::Votes, &target),
            self.delete_references(Collection::Comments, &target),
        )?;

        let mut counts = answer_stage;
        counts.question_votes = question_votes;
        counts.question_comments = question_comments;

        if let Some(attachment_id) = &question.attachment_id {
            if self.delete_attachment(attachment_id).await? {
                counts.attachments = 1;
            }
        }

        if self
            .delete_if_present(Collection::Questions, &question.id)
            .await?
        {
            counts.questions = 1;
        }

        info!(total = counts.total(), "Question and all related data deleted");
        Ok(DeletedSummary { question, counts })
    }

    /// Remove one answer after its votes and comments
    pub async fn delete_answer_subtree(&self, answer_id: &str) -> AppResult<AnswerCleanup> {
        let target = Target::Answer(answer_id.to_string());
        let votes = self.delete_references(Collection::Votes, &target).await?;
        let comments = self.delete_references(Collection::Comments, &target).await?;
        let answer_removed = self
            .delete_if_present(Collection::Answers, answer_id)
            .await?;

        Ok(AnswerCleanup {
            votes,
            comments,
            answer_removed,
        })
    }

    async fn delete_answers(&self, answers: Vec<Answer>) -> AppResult<DeletionCounts> {
        stream::iter(answers)
            .map(|answer| async move { self.delete_answer_subtree(&answer.id).await })
            .buffer_unordered(self.concurrency)
            .try_fold(DeletionCounts::default(), |mut counts, cleanup| async move {
                counts.answer_votes += cleanup.votes;
                counts.answer_comments += cleanup.comments;
                counts.answers += u64::from(cleanup.answer_removed);
                Ok::<_, AppError>(counts)
            })
            .await
    }

    /// Delete every comment or vote pointing at `target`
    pub async fn delete_references(&self, collection: Collection, target: &Target) -> AppResult<u64> {
        let documents = self.store.list_all(collection, &target.predicates()).await?;

        stream::iter(documents)
            .map(|doc| async move { self.delete_if_present(collection, &doc.id).await })
            .buffer_unordered(self.concurrency)
            .try_fold(0u64, |deleted, removed| async move {
                Ok::<_, AppError>(deleted + u64::from(removed))
            })
            .await
    }

    /// Delete a document, treating an already-missing one as done
    pub async fn delete_if_present(&self, collection: Collection, id: &str) -> AppResult<bool> {
        match self.store.delete(collection, id).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => {
                debug!(%collection, id, "Already deleted");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Missing or unaddressable attachments are logged and skipped
    pub async fn delete_attachment(&self, attachment_id: &str) -> AppResult<bool> {
        match self.attachments.delete(attachment_id).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() || matches!(e, AppError::Validation(_)) => {
                warn!(attachment_id, "Error deleting attachment: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
