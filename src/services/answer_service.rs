use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::cascade::CascadeDeleter;
use super::reputation::ReputationService;
use super::required;
use crate::error::{AppError, AppResult};
use crate::infrastructure::document_store::{encode_fields, Collection, DocumentStore, Predicate};
use crate::infrastructure::id_generator::DocumentIdGenerator;
use crate::infrastructure::user_directory::UserDirectory;
use crate::models::answer::AnswerFields;
use crate::models::{Answer, Question, Record, RecordStore};

const MAX_ANSWER_LEN: usize = 10_000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnswer {
    pub question_id: Option<String>,
    pub answer: Option<String>,
    pub author_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAnswer {
    pub answer_id: Option<String>,
    pub author_id: Option<String>,
}

pub struct AnswerService {
    store: Arc<dyn DocumentStore>,
    users: Arc<dyn UserDirectory>,
    cascade: Arc<CascadeDeleter>,
    reputation: Arc<ReputationService>,
    ids: Arc<DocumentIdGenerator>,
}

impl AnswerService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        users: Arc<dyn UserDirectory>,
        cascade: Arc<CascadeDeleter>,
        reputation: Arc<ReputationService>,
        ids: Arc<DocumentIdGenerator>,
    ) -> Self {
        Self {
            store,
            users,
            cascade,
            reputation,
            ids,
        }
    }

    /// Create the answer, then credit its author with one reputation point.
    /// A failed reputation write is reported but the answer stays.
    #[instrument(skip_all)]
    pub async fn create_answer(&self, input: CreateAnswer) -> AppResult<Answer> {
        let (question_id, content, author_id) = match (
            required(&input.question_id),
            required(&input.answer),
            required(&input.author_id),
        ) {
            (Some(q), Some(c), Some(a)) => (q, c, a),
            _ => return Err(AppError::Validation("Missing required fields".to_string())),
        };
        if content.chars().count() > MAX_ANSWER_LEN {
            return Err(AppError::Validation(format!(
                "Answer must be at most {} characters",
                MAX_ANSWER_LEN
            )));
        }

        let _question: Question = self.store.load(question_id).await?;
        self.users.get(author_id).await?;

        let fields = encode_fields(&AnswerFields {
            content: content.to_string(),
            author_id: author_id.to_string(),
            question_id: question_id.to_string(),
        })?;
        let doc = self
            .store
            .create(Collection::Answers, &self.ids.next_id(), fields)
            .await?;
        let answer = Answer::from_document(doc)?;
        info!(answer_id = %answer.id, question_id, "Answer created");

        if let Err(e) = self.reputation.on_answer_created(author_id).await {
            warn!(answer_id = %answer.id, "Answer saved but reputation was not credited: {}", e);
            return Err(e);
        }
        Ok(answer)
    }

    /// Delete the answer with its votes and comments, then debit the author
    #[instrument(skip_all)]
    pub async fn delete_answer(&self, input: DeleteAnswer) -> AppResult<Answer> {
        let answer_id = required(&input.answer_id)
            .ok_or_else(|| AppError::Validation("Missing answerId".to_string()))?;

        let answer: Answer = self.store.load(answer_id).await?;
        if let Some(user) = required(&input.author_id) {
            if user != answer.author_id {
                return Err(AppError::Unauthorized(
                    "You are not authorized to delete this answer".to_string(),
                ));
            }
        }

        let cleanup = self.cascade.delete_answer_subtree(&answer.id).await?;
        if !cleanup.answer_removed {
            // Someone else removed it in the meantime and owns the reputation debit
            info!(answer_id = %answer.id, "Answer already deleted concurrently");
            return Ok(answer);
        }

        if let Err(e) = self.reputation.on_answer_deleted(&answer.author_id).await {
            warn!(answer_id = %answer.id, "Answer deleted but reputation was not debited: {}", e);
            return Err(e);
        }
        Ok(answer)
    }

    /// Answers of a question, oldest first
    pub async fn list_answers(&self, question_id: &str) -> AppResult<Vec<Answer>> {
        let _question: Question = self.store.load(question_id).await?;
        self.store
            .load_all(&[
                Predicate::equal("questionId", question_id),
                Predicate::order_asc("$createdAt"),
            ])
            .await
    }
}
