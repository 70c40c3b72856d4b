use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::document_store::{
    already_exists, not_found, stale_revision, Collection, Document, DocumentList, DocumentStore,
    Fields, Predicate,
};
use super::query;
use crate::error::AppResult;

/// In-process document store, used for local runs and tests
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<Collection, HashMap<String, Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in a collection
    pub async fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    pub async fn is_empty(&self) -> bool {
        self.collections
            .read()
            .await
            .values()
            .all(|docs| docs.is_empty())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> AppResult<Document> {
        self.collections
            .read()
            .await
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .cloned()
            .ok_or_else(|| not_found(collection, id))
    }

    async fn list(
        &self,
        collection: Collection,
        predicates: &[Predicate],
    ) -> AppResult<DocumentList> {
        let candidates: Vec<Document> = self
            .collections
            .read()
            .await
            .get(&collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        Ok(query::evaluate(candidates, predicates))
    }

    async fn create(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> AppResult<Document> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        if docs.contains_key(id) {
            return Err(already_exists(collection, id));
        }

        let now = Utc::now();
        let document = Document {
            id: id.to_string(),
            collection,
            revision: 1,
            created_at: now,
            updated_at: now,
            fields,
        };
        docs.insert(id.to_string(), document.clone());
        Ok(document)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> AppResult<Document> {
        let mut collections = self.collections.write().await;
        let document = collections
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| not_found(collection, id))?;

        document.fields.extend(fields);
        document.revision += 1;
        document.updated_at = Utc::now();
        Ok(document.clone())
    }

    async fn update_at_revision(
        &self,
        collection: Collection,
        id: &str,
        revision: u64,
        fields: Fields,
    ) -> AppResult<Document> {
        // Check and write under one lock so the revision guard is atomic
        let mut collections = self.collections.write().await;
        let document = collections
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| not_found(collection, id))?;

        if document.revision != revision {
            return Err(stale_revision(collection, id, revision, document.revision));
        }

        document.fields.extend(fields);
        document.revision += 1;
        document.updated_at = Utc::now();
        Ok(document.clone())
    }

    async fn delete(&self, collection: Collection, id: &str) -> AppResult<()> {
        self.collections
            .write()
            .await
            .get_mut(&collection)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or_else(|| not_found(collection, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::infrastructure::document_store::encode_fields;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        encode_fields(&value).unwrap()
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let store = MemoryDocumentStore::new();
        let created = store
            .create(Collection::Questions, "q1", fields(json!({"title": "T"})))
            .await
            .unwrap();
        assert_eq!(created.revision, 1);

        let fetched = store.get(Collection::Questions, "q1").await.unwrap();
        assert_eq!(fetched.fields["title"], json!("T"));

        store.delete(Collection::Questions, "q1").await.unwrap();
        let err = store.get(Collection::Questions, "q1").await.unwrap_err();
        assert!(err.is_not_found());

        // Repeat delete surfaces NotFound rather than succeeding silently
        let err = store.delete(Collection::Questions, "q1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let store = MemoryDocumentStore::new();
        store
            .create(Collection::Votes, "v1", Fields::new())
            .await
            .unwrap();
        let err = store
            .create(Collection::Votes, "v1", Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_merges_and_bumps_revision() {
        let store = MemoryDocumentStore::new();
        store
            .create(
                Collection::Users,
                "u1",
                fields(json!({"name": "Ada", "prefs": {"reputation": 0}})),
            )
            .await
            .unwrap();

        let updated = store
            .update(Collection::Users, "u1", fields(json!({"prefs": {"reputation": 1}})))
            .await
            .unwrap();
        assert_eq!(updated.revision, 2);
        assert_eq!(updated.fields["name"], json!("Ada"));
        assert_eq!(updated.fields["prefs"]["reputation"], json!(1));
    }

    #[tokio::test]
    async fn test_stale_revision_rejected() {
        let store = MemoryDocumentStore::new();
        store
            .create(Collection::Users, "u1", fields(json!({"n": 0})))
            .await
            .unwrap();

        store
            .update_at_revision(Collection::Users, "u1", 1, fields(json!({"n": 1})))
            .await
            .unwrap();
        let err = store
            .update_at_revision(Collection::Users, "u1", 1, fields(json!({"n": 2})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(
            store.get(Collection::Users, "u1").await.unwrap().fields["n"],
            json!(1)
        );
    }

    #[tokio::test]
    async fn test_list_all_pages_past_default_limit() {
        let store = MemoryDocumentStore::new();
        for i in 0..230 {
            store
                .create(
                    Collection::Comments,
                    &format!("c{:04}", i),
                    fields(json!({"type": "question", "typeId": "q1"})),
                )
                .await
                .unwrap();
        }

        let page = store
            .list(Collection::Comments, &[Predicate::equal("typeId", "q1")])
            .await
            .unwrap();
        assert_eq!(page.documents.len(), 25);
        assert_eq!(page.total, 230);

        let all = store
            .list_all(Collection::Comments, &[Predicate::equal("typeId", "q1")])
            .await
            .unwrap();
        assert_eq!(all.len(), 230);
        assert_eq!(
            store
                .count(Collection::Comments, &[Predicate::equal("type", "question")])
                .await
                .unwrap(),
            230
        );
    }
}
