// Document Store Interface - typed documents in named collections
// Mirrors the hosted backend's database API: get/list/create/update/delete with query predicates

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{AppError, AppResult};

/// Field map of a stored document
pub type Fields = serde_json::Map<String, Value>;

/// Page size used when no `Limit` predicate is given, as the hosted service does
pub const DEFAULT_LIST_LIMIT: usize = 25;

/// Page size used by `list_all` while walking every match
const LIST_ALL_PAGE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Questions,
    Answers,
    Comments,
    Votes,
    Users,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Questions => "questions",
            Collection::Answers => "answers",
            Collection::Comments => "comments",
            Collection::Votes => "votes",
            Collection::Users => "users",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "questions" => Some(Collection::Questions),
            "answers" => Some(Collection::Answers),
            "comments" => Some(Collection::Comments),
            "votes" => Some(Collection::Votes),
            "users" => Some(Collection::Users),
            _ => None,
        }
    }

    /// Singular noun for error messages
    pub fn noun(&self) -> &'static str {
        match self {
            Collection::Questions => "Question",
            Collection::Answers => "Answer",
            Collection::Comments => "Comment",
            Collection::Votes => "Vote",
            Collection::Users => "User",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored document with its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub collection: Collection,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fields: Fields,
}

impl Document {
    /// Resolve a field by name; `$id`, `$createdAt` and `$updatedAt` address metadata
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "$id" => Some(Value::String(self.id.clone())),
            "$createdAt" => Some(Value::from(self.created_at.timestamp_micros())),
            "$updatedAt" => Some(Value::from(self.updated_at.timestamp_micros())),
            other => self.fields.get(other).cloned(),
        }
    }

    /// Deserialize the field map into a typed record
    pub fn decode<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|e| {
            AppError::Internal(format!(
                "Malformed {} document {}: {}",
                self.collection.noun().to_lowercase(),
                self.id,
                e
            ))
        })
    }
}

/// Serialize a typed record into a field map
pub fn encode_fields<T: Serialize>(value: &T) -> AppResult<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Internal(format!(
            "Expected an object when encoding document fields, got {}",
            other
        ))),
    }
}

/// Query predicates understood by every store implementation
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Equality; array fields match on membership, array values match any element
    Equal(String, Value),
    /// Case-insensitive match of every word of the term
    Search(String, String),
    /// Logical OR of the nested filters
    Any(Vec<Predicate>),
    OrderAsc(String),
    OrderDesc(String),
    Offset(usize),
    Limit(usize),
}

impl Predicate {
    pub fn equal(field: &str, value: impl Into<Value>) -> Self {
        Predicate::Equal(field.to_string(), value.into())
    }

    pub fn search(field: &str, term: &str) -> Self {
        Predicate::Search(field.to_string(), term.to_string())
    }

    pub fn order_desc(field: &str) -> Self {
        Predicate::OrderDesc(field.to_string())
    }

    pub fn order_asc(field: &str) -> Self {
        Predicate::OrderAsc(field.to_string())
    }

    fn is_window(&self) -> bool {
        matches!(self, Predicate::Offset(_) | Predicate::Limit(_))
    }
}

/// Result page of a list call; `total` counts every match before offset/limit
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentList {
    pub documents: Vec<Document>,
    pub total: u64,
}

/// Document store client used by every service
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> AppResult<Document>;

    async fn list(&self, collection: Collection, predicates: &[Predicate])
        -> AppResult<DocumentList>;

    /// Fails with `Conflict` if the id is already taken
    async fn create(&self, collection: Collection, id: &str, fields: Fields)
        -> AppResult<Document>;

    /// Merge `fields` into the document and bump its revision.
    /// Backends that merge outside the storage engine retry lost races a few times
    /// and report `Conflict` if the document keeps changing.
    async fn update(&self, collection: Collection, id: &str, fields: Fields)
        -> AppResult<Document>;

    /// Like `update`, but fails with `Conflict` unless the stored revision equals `revision`
    async fn update_at_revision(
        &self,
        collection: Collection,
        id: &str,
        revision: u64,
        fields: Fields,
    ) -> AppResult<Document>;

    /// Fails with `NotFound` if the document does not exist
    async fn delete(&self, collection: Collection, id: &str) -> AppResult<()>;

    /// Every matching document, paged through regardless of offset/limit predicates
    async fn list_all(
        &self,
        collection: Collection,
        predicates: &[Predicate],
    ) -> AppResult<Vec<Document>> {
        let base: Vec<Predicate> = predicates
            .iter()
            .filter(|p| !p.is_window())
            .cloned()
            .collect();

        let mut documents = Vec::new();
        loop {
            let mut page_query = base.clone();
            page_query.push(Predicate::Offset(documents.len()));
            page_query.push(Predicate::Limit(LIST_ALL_PAGE));

            let page = self.list(collection, &page_query).await?;
            let fetched = page.documents.len();
            documents.extend(page.documents);

            if fetched < LIST_ALL_PAGE || documents.len() as u64 >= page.total {
                break;
            }
        }
        Ok(documents)
    }

    async fn count(&self, collection: Collection, predicates: &[Predicate]) -> AppResult<u64> {
        let mut query: Vec<Predicate> = predicates
            .iter()
            .filter(|p| !p.is_window())
            .cloned()
            .collect();
        query.push(Predicate::Limit(1));
        Ok(self.list(collection, &query).await?.total)
    }

    async fn exists(&self, collection: Collection, id: &str) -> AppResult<bool> {
        match self.get(collection, id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

pub(crate) fn not_found(collection: Collection, id: &str) -> AppError {
    AppError::NotFound(format!(
        "{} with the requested ID '{}' could not be found",
        collection.noun(),
        id
    ))
}

pub(crate) fn already_exists(collection: Collection, id: &str) -> AppError {
    AppError::Conflict(format!(
        "{} with the requested ID '{}' already exists",
        collection.noun(),
        id
    ))
}

pub(crate) fn stale_revision(collection: Collection, id: &str, expected: u64, actual: u64) -> AppError {
    AppError::Conflict(format!(
        "{} '{}' was modified concurrently (expected revision {}, found {})",
        collection.noun(),
        id,
        expected,
        actual
    ))
}
