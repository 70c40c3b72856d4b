// Typed records stored in the document store

use async_trait::async_trait;

use crate::error::AppResult;
use crate::infrastructure::document_store::{Collection, Document, DocumentStore};

pub mod answer;
pub mod comment;
pub mod question;
pub mod target;
pub mod user;
pub mod vote;

pub use answer::Answer;
pub use comment::Comment;
pub use question::Question;
pub use target::{Target, TargetKind};
pub use user::{User, UserPrefs};
pub use vote::{Vote, VoteStatus};

/// A typed view over a document of one collection
pub trait Record: Sized + Send {
    const COLLECTION: Collection;

    fn from_document(doc: Document) -> AppResult<Self>;
}

/// Typed fetch/list helpers on top of any document store
#[async_trait]
pub trait RecordStore {
    async fn load<R: Record>(&self, id: &str) -> AppResult<R>;
    async fn load_all<R: Record>(
        &self,
        predicates: &[crate::infrastructure::document_store::Predicate],
    ) -> AppResult<Vec<R>>;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> RecordStore for S {
    async fn load<R: Record>(&self, id: &str) -> AppResult<R> {
        R::from_document(self.get(R::COLLECTION, id).await?)
    }

    async fn load_all<R: Record>(
        &self,
        predicates: &[crate::infrastructure::document_store::Predicate],
    ) -> AppResult<Vec<R>> {
        self.list_all(R::COLLECTION, predicates)
            .await?
            .into_iter()
            .map(R::from_document)
            .collect()
    }
}
