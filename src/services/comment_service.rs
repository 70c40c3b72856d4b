use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::required;
use crate::error::{AppError, AppResult};
use crate::infrastructure::document_store::{
    encode_fields, not_found, Collection, DocumentStore, Predicate,
};
use crate::infrastructure::id_generator::DocumentIdGenerator;
use crate::models::comment::CommentFields;
use crate::models::{Comment, Record, RecordStore, Target};

const MAX_COMMENT_LEN: usize = 10_000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComment {
    pub content: Option<String>,
    pub author_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub type_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteComment {
    pub comment_id: Option<String>,
    pub author_id: Option<String>,
}

pub struct CommentService {
    store: Arc<dyn DocumentStore>,
    ids: Arc<DocumentIdGenerator>,
}

impl CommentService {
    pub fn new(store: Arc<dyn DocumentStore>, ids: Arc<DocumentIdGenerator>) -> Self {
        Self { store, ids }
    }

    #[instrument(skip_all)]
    pub async fn create_comment(&self, input: CreateComment) -> AppResult<Comment> {
        let (content, author_id, kind, type_id) = match (
            required(&input.content),
            required(&input.author_id),
            required(&input.kind),
            required(&input.type_id),
        ) {
            (Some(c), Some(a), Some(k), Some(t)) => (c, a, k, t),
            _ => return Err(AppError::Validation("Missing required fields".to_string())),
        };
        let target = Target::parse(kind, type_id)?;
        if content.chars().count() > MAX_COMMENT_LEN {
            return Err(AppError::Validation(format!(
                "Comment must be at most {} characters",
                MAX_COMMENT_LEN
            )));
        }

        ensure_target_exists(self.store.as_ref(), &target).await?;

        let fields = encode_fields(&CommentFields {
            content: content.to_string(),
            author_id: author_id.to_string(),
            target,
        })?;
        let doc = self
            .store
            .create(Collection::Comments, &self.ids.next_id(), fields)
            .await?;
        debug!(comment_id = %doc.id, "Comment created");
        Comment::from_document(doc)
    }

    #[instrument(skip_all)]
    pub async fn delete_comment(&self, input: DeleteComment) -> AppResult<Comment> {
        let comment_id = required(&input.comment_id)
            .ok_or_else(|| AppError::Validation("Missing commentId".to_string()))?;

        let comment: Comment = self.store.load(comment_id).await?;
        if let Some(user) = required(&input.author_id) {
            if user != comment.author_id {
                return Err(AppError::Unauthorized(
                    "You are not authorized to delete this comment".to_string(),
                ));
            }
        }

        self.store.delete(Collection::Comments, comment_id).await?;
        Ok(comment)
    }

    /// Comments on a question or answer, oldest first
    pub async fn list_comments(&self, target: &Target) -> AppResult<Vec<Comment>> {
        let mut query = target.predicates();
        query.push(Predicate::order_asc("$createdAt"));
        self.store.load_all(&query).await
    }
}

/// Comments and votes may only point at a live question or answer
pub(crate) async fn ensure_target_exists(store: &dyn DocumentStore, target: &Target) -> AppResult<()> {
    let collection = target.kind().collection();
    if !store.exists(collection, target.id()).await? {
        return Err(not_found(collection, target.id()));
    }
    Ok(())
}
