// Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use qa_forum::error::{AppError, AppResult};
use qa_forum::infrastructure::{
    AttachmentStore, Collection, Document, DocumentList, DocumentStore, DocumentUserDirectory,
    Fields, MemoryDocumentStore, ObjectStoreAttachments, Predicate, UserDirectory,
};
use qa_forum::models::{User, UserPrefs};

/// Document store that records deletes and can be told to fail them
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryDocumentStore,
    deletes: Mutex<Vec<(Collection, String)>>,
    fail_deletes_in: Mutex<Option<Collection>>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deletes(&self) -> Vec<(Collection, String)> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.lock().unwrap().len()
    }

    pub fn deletes_in(&self, collection: Collection) -> usize {
        self.deletes
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == collection)
            .count()
    }

    pub fn fail_deletes_in(&self, collection: Option<Collection>) {
        *self.fail_deletes_in.lock().unwrap() = collection;
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn get(&self, collection: Collection, id: &str) -> AppResult<Document> {
        self.inner.get(collection, id).await
    }

    async fn list(&self, collection: Collection, predicates: &[Predicate]) -> AppResult<DocumentList> {
        self.inner.list(collection, predicates).await
    }

    async fn create(&self, collection: Collection, id: &str, fields: Fields) -> AppResult<Document> {
        self.inner.create(collection, id, fields).await
    }

    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> AppResult<Document> {
        self.inner.update(collection, id, fields).await
    }

    async fn update_at_revision(
        &self,
        collection: Collection,
        id: &str,
        revision: u64,
        fields: Fields,
    ) -> AppResult<Document> {
        self.inner
            .update_at_revision(collection, id, revision, fields)
            .await
    }

    async fn delete(&self, collection: Collection, id: &str) -> AppResult<()> {
        if *self.fail_deletes_in.lock().unwrap() == Some(collection) {
            return Err(AppError::Upstream {
                status: 503,
                message: "document store unavailable".to_string(),
            });
        }
        self.inner.delete(collection, id).await?;
        self.deletes
            .lock()
            .unwrap()
            .push((collection, id.to_string()));
        Ok(())
    }
}

/// Attachment store that counts delete calls
pub struct CountingAttachments {
    inner: ObjectStoreAttachments,
    pub delete_calls: AtomicUsize,
}

impl CountingAttachments {
    pub fn new() -> Self {
        Self {
            inner: ObjectStoreAttachments::in_memory("question-attachment", "http://localhost:3000"),
            delete_calls: AtomicUsize::new(0),
        }
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttachmentStore for CountingAttachments {
    async fn upload(&self, bytes: Vec<u8>) -> AppResult<String> {
        self.inner.upload(bytes).await
    }

    async fn download(&self, id: &str) -> AppResult<Vec<u8>> {
        self.inner.download(id).await
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(id).await
    }

    fn preview_url(&self, id: &str) -> String {
        self.inner.preview_url(id)
    }
}

/// User directory whose preference writes can be made to lose every revision race
pub struct ContendedUsers {
    inner: DocumentUserDirectory,
    contended: AtomicBool,
    pub prefs_writes: AtomicUsize,
}

impl ContendedUsers {
    pub fn new(store: std::sync::Arc<dyn DocumentStore>) -> Self {
        Self {
            inner: DocumentUserDirectory::new(store),
            contended: AtomicBool::new(false),
            prefs_writes: AtomicUsize::new(0),
        }
    }

    pub fn set_contended(&self, contended: bool) {
        self.contended.store(contended, Ordering::SeqCst);
    }

    pub fn prefs_writes(&self) -> usize {
        self.prefs_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserDirectory for ContendedUsers {
    async fn create(&self, name: &str, email: &str) -> AppResult<User> {
        self.inner.create(name, email).await
    }

    async fn get(&self, user_id: &str) -> AppResult<User> {
        self.inner.get(user_id).await
    }

    async fn update_prefs(
        &self,
        user_id: &str,
        prefs: UserPrefs,
        expected_revision: Option<u64>,
    ) -> AppResult<User> {
        self.prefs_writes.fetch_add(1, Ordering::SeqCst);
        if self.contended.load(Ordering::SeqCst) {
            return Err(AppError::Conflict(format!(
                "user {} was modified concurrently",
                user_id
            )));
        }
        self.inner.update_prefs(user_id, prefs, expected_revision).await
    }

    async fn list(&self, predicates: &[Predicate]) -> AppResult<Vec<User>> {
        self.inner.list(predicates).await
    }
}

pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}
