// User Directory - externally managed identities with a preference bag
// The reputation counter lives in the preferences, as in the hosted backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::document_store::{encode_fields, Collection, Document, DocumentStore, Predicate};
use super::id_generator::DocumentIdGenerator;
use crate::error::{AppError, AppResult};
use crate::models::user::{User, UserPrefs};

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Register a new account; reputation starts at zero
    async fn create(&self, name: &str, email: &str) -> AppResult<User>;
    async fn get(&self, user_id: &str) -> AppResult<User>;
    async fn get_prefs(&self, user_id: &str) -> AppResult<UserPrefs> {
        Ok(self.get(user_id).await?.prefs)
    }
    /// Replace the preference bag; with `expected_revision`, fail with `Conflict` on a stale read
    async fn update_prefs(
        &self,
        user_id: &str,
        prefs: UserPrefs,
        expected_revision: Option<u64>,
    ) -> AppResult<User>;
    async fn list(&self, predicates: &[Predicate]) -> AppResult<Vec<User>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct UserFields {
    name: String,
    email: String,
    #[serde(default)]
    prefs: UserPrefs,
}

#[derive(Serialize)]
struct PrefsUpdate<'a> {
    prefs: &'a UserPrefs,
}

/// User directory kept in the `users` collection of a document store
pub struct DocumentUserDirectory {
    store: Arc<dyn DocumentStore>,
    ids: DocumentIdGenerator,
}

impl DocumentUserDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            ids: DocumentIdGenerator::new(2),
        }
    }

    fn to_user(doc: Document) -> AppResult<User> {
        let fields: UserFields = doc.decode()?;
        Ok(User {
            id: doc.id,
            name: fields.name,
            email: fields.email,
            prefs: fields.prefs,
            revision: doc.revision,
            created_at: doc.created_at,
        })
    }
}

#[async_trait]
impl UserDirectory for DocumentUserDirectory {
    async fn create(&self, name: &str, email: &str) -> AppResult<User> {
        let name = name.trim();
        let email = email.trim().to_lowercase();
        if name.is_empty() || email.is_empty() {
            return Err(AppError::Validation("Missing required fields".to_string()));
        }

        let taken = self
            .store
            .count(Collection::Users, &[Predicate::equal("email", email.as_str())])
            .await?;
        if taken > 0 {
            return Err(AppError::Conflict(format!(
                "A user with the email '{}' already exists",
                email
            )));
        }

        let fields = encode_fields(&UserFields {
            name: name.to_string(),
            email,
            prefs: UserPrefs::with_reputation(0),
        })?;
        let doc = self
            .store
            .create(Collection::Users, &self.ids.next_id(), fields)
            .await?;
        Self::to_user(doc)
    }

    async fn get(&self, user_id: &str) -> AppResult<User> {
        Self::to_user(self.store.get(Collection::Users, user_id).await?)
    }

    async fn update_prefs(
        &self,
        user_id: &str,
        prefs: UserPrefs,
        expected_revision: Option<u64>,
    ) -> AppResult<User> {
        let fields = encode_fields(&PrefsUpdate { prefs: &prefs })?;
        let doc = match expected_revision {
            Some(revision) => {
                self.store
                    .update_at_revision(Collection::Users, user_id, revision, fields)
                    .await?
            }
            None => self.store.update(Collection::Users, user_id, fields).await?,
        };
        Self::to_user(doc)
    }

    async fn list(&self, predicates: &[Predicate]) -> AppResult<Vec<User>> {
        self.store
            .list(Collection::Users, predicates)
            .await?
            .documents
            .into_iter()
            .map(Self::to_user)
            .collect()
    }
}
