use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::pagination::Pagination;
use super::required;
use crate::error::{AppError, AppResult};
use crate::infrastructure::attachment_store::{validate_attachment_id, AttachmentStore};
use crate::infrastructure::document_store::{encode_fields, Collection, DocumentStore, Fields, Predicate};
use crate::infrastructure::id_generator::DocumentIdGenerator;
use crate::infrastructure::user_directory::UserDirectory;
use crate::models::question::{normalize_tags, QuestionFields};
use crate::models::user::AuthorSummary;
use crate::models::{Question, Record, RecordStore, Target};

pub const QUESTIONS_PER_PAGE: u64 = 25;
const MAX_TITLE_LEN: usize = 100;
const MAX_CONTENT_LEN: usize = 10_000;
const MAX_TAG_LEN: usize = 50;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestion {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub attachment_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestion {
    pub question_id: Option<String>,
    pub author_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub attachment_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuestions {
    pub page: Option<u64>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

/// Question as shown in listings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSummary {
    #[serde(flatten)]
    pub question: Question,
    pub total_answers: u64,
    pub total_votes: u64,
    pub author: Option<AuthorSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionPage {
    pub documents: Vec<QuestionSummary>,
    pub total: u64,
    pub pagination: Pagination,
}

fn check_length(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

fn validated_tags(tags: Option<Vec<String>>) -> AppResult<Vec<String>> {
    let tags = normalize_tags(tags.unwrap_or_default());
    for tag in &tags {
        check_length("Tag", tag, MAX_TAG_LEN)?;
    }
    Ok(tags)
}

pub struct QuestionService {
    store: Arc<dyn DocumentStore>,
    attachments: Arc<dyn AttachmentStore>,
    users: Arc<dyn UserDirectory>,
    ids: Arc<DocumentIdGenerator>,
}

impl QuestionService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        attachments: Arc<dyn AttachmentStore>,
        users: Arc<dyn UserDirectory>,
        ids: Arc<DocumentIdGenerator>,
    ) -> Self {
        Self {
            store,
            attachments,
            users,
            ids,
        }
    }

    #[instrument(skip_all)]
    pub async fn create_question(&self, input: CreateQuestion) -> AppResult<Question> {
        let (title, content, author_id) = match (
            required(&input.title),
            required(&input.content),
            required(&input.author_id),
        ) {
            (Some(title), Some(content), Some(author_id)) => (title, content, author_id),
            _ => return Err(AppError::Validation("Missing required fields".to_string())),
        };
        check_length("Title", title, MAX_TITLE_LEN)?;
        check_length("Content", content, MAX_CONTENT_LEN)?;
        let tags = validated_tags(input.tags)?;
        let attachment_id = required(&input.attachment_id);
        if let Some(id) = attachment_id {
            validate_attachment_id(id)?;
        }

        let fields = encode_fields(&QuestionFields {
            title: title.to_string(),
            content: content.to_string(),
            author_id: author_id.to_string(),
            tags,
            attachment_id: attachment_id.map(str::to_string),
        })?;

        let doc = self
            .store
            .create(Collection::Questions, &self.ids.next_id(), fields)
            .await?;
        info!(question_id = %doc.id, "Question created");
        Question::from_document(doc)
    }

    pub async fn get_question(&self, question_id: &str) -> AppResult<Question> {
        self.store.load(question_id).await
    }

    /// Edit title, content, tags or attachment; a replaced attachment is removed best-effort
    #[instrument(skip_all)]
    pub async fn update_question(&self, input: UpdateQuestion) -> AppResult<Question> {
        let question_id = required(&input.question_id)
            .ok_or_else(|| AppError::Validation("Missing questionId".to_string()))?;

        let mut changes = Fields::new();
        if let Some(title) = &input.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::Validation("Title cannot be empty".to_string()));
            }
            check_length("Title", title, MAX_TITLE_LEN)?;
            changes.insert("title".to_string(), title.into());
        }
        if let Some(content) = &input.content {
            let content = content.trim();
            if content.is_empty() {
                return Err(AppError::Validation("Content cannot be empty".to_string()));
            }
            check_length("Content", content, MAX_CONTENT_LEN)?;
            changes.insert("content".to_string(), content.into());
        }
        if input.tags.is_some() {
            changes.insert("tags".to_string(), validated_tags(input.tags.clone())?.into());
        }
        let new_attachment = input.attachment_id.as_deref().map(str::trim);
        if let Some(attachment_id) = new_attachment {
            let value = if attachment_id.is_empty() {
                serde_json::Value::Null
            } else {
                validate_attachment_id(attachment_id)?;
                attachment_id.into()
            };
            changes.insert("attachmentId".to_string(), value);
        }

        let question: Question = self.store.load(question_id).await?;
        if let Some(user) = required(&input.author_id) {
            if user != question.author_id {
                return Err(AppError::Unauthorized(
                    "You are not authorized to edit this question".to_string(),
                ));
            }
        }

        let doc = self
            .store
            .update(Collection::Questions, question_id, changes)
            .await?;
        let updated = Question::from_document(doc)?;

        if let Some(old) = &question.attachment_id {
            if updated.attachment_id.as_deref() != Some(old.as_str()) {
                if let Err(e) = self.attachments.delete(old).await {
                    warn!(attachment_id = %old, "Could not remove replaced attachment: {}", e);
                }
            }
        }

        Ok(updated)
    }

    /// Newest first, optionally filtered by tag and by a search over title or content
    #[instrument(skip(self))]
    pub async fn list_questions(&self, input: ListQuestions) -> AppResult<QuestionPage> {
        let page = input.page.unwrap_or(1);
        let window = Pagination::new(page, QUESTIONS_PER_PAGE, 0);
        let mut query = vec![
            Predicate::order_desc("$createdAt"),
            Predicate::Offset(window.offset()),
            Predicate::Limit(window.limit()),
        ];
        if let Some(tag) = required(&input.tag) {
            query.push(Predicate::equal("tags", tag));
        }
        if let Some(search) = required(&input.search) {
            query.push(Predicate::Any(vec![
                Predicate::search("title", search),
                Predicate::search("content", search),
            ]));
        }

        let listed = self.store.list(Collection::Questions, &query).await?;
        let questions = listed
            .documents
            .into_iter()
            .map(Question::from_document)
            .collect::<AppResult<Vec<_>>>()?;

        let documents = try_join_all(questions.into_iter().map(|q| self.summarize(q))).await?;

        Ok(QuestionPage {
            documents,
            total: listed.total,
            pagination: Pagination::new(window.page, QUESTIONS_PER_PAGE, listed.total),
        })
    }

    async fn summarize(&self, question: Question) -> AppResult<QuestionSummary> {
        let answers_query = [Predicate::equal("questionId", question.id.as_str())];
        let votes_query = Target::Question(question.id.clone()).predicates();

        let (total_answers, total_votes, author) = futures::try_join!(
            self.store.count(Collection::Answers, &answers_query),
            self.store.count(Collection::Votes, &votes_query),
            self.author_of(&question.author_id),
        )?;

        Ok(QuestionSummary {
            question,
            total_answers,
            total_votes,
            author,
        })
    }

    /// Authors whose account is gone are shown without a profile
    async fn author_of(&self, user_id: &str) -> AppResult<Option<AuthorSummary>> {
        match self.users.get(user_id).await {
            Ok(user) => Ok(Some(AuthorSummary::from(&user))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
