// Storage backends and external collaborators
pub mod attachment_store;      // Binary attachments on object_store
pub mod document_store;        // Document store trait, documents and predicates
pub mod id_generator;          // Time-ordered document ids
pub mod memory_store;          // In-process document store
pub mod query;                 // Predicate evaluation
pub mod sqlite_store;          // SQLite-backed document store
pub mod user_directory;        // User accounts and preference bags

pub use attachment_store::{AttachmentStore, ObjectStoreAttachments};
pub use document_store::{Collection, Document, DocumentList, DocumentStore, Fields, Predicate};
pub use id_generator::DocumentIdGenerator;
pub use memory_store::MemoryDocumentStore;
pub use sqlite_store::SqliteDocumentStore;
pub use user_directory::{DocumentUserDirectory, UserDirectory};
