use std::sync::Arc;
use tracing::info;

use crate::{
    config::Config,
    infrastructure::{
        AttachmentStore, DocumentIdGenerator, DocumentStore, DocumentUserDirectory,
        MemoryDocumentStore, ObjectStoreAttachments, SqliteDocumentStore, UserDirectory,
    },
    services::{
        AnswerService, CascadeDeleter, CommentService, OrphanSweeper, QuestionService,
        ReputationService, TagService, UserService, VoteService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub attachments: Arc<dyn AttachmentStore>,
    pub users: Arc<dyn UserDirectory>,
    pub cascade: Arc<CascadeDeleter>,
    pub reputation: Arc<ReputationService>,
    pub questions: Arc<QuestionService>,
    pub answers: Arc<AnswerService>,
    pub comments: Arc<CommentService>,
    pub votes: Arc<VoteService>,
    pub tags: Arc<TagService>,
    pub profiles: Arc<UserService>,
    pub sweeper: Arc<OrphanSweeper>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Initialize document store
        let store: Arc<dyn DocumentStore> = if config.database.url == "memory" {
            info!("Using in-memory document store");
            Arc::new(MemoryDocumentStore::new())
        } else {
            let sqlite = SqliteDocumentStore::connect(&config.database.url).await?;
            info!(url = %config.database.url, "Using SQLite document store");
            Arc::new(sqlite)
        };

        let attachments: Arc<dyn AttachmentStore> = match &config.storage.attachment_dir {
            Some(dir) => Arc::new(ObjectStoreAttachments::local(
                dir,
                &config.storage.bucket,
                &config.server.public_url,
            )?),
            None => Arc::new(ObjectStoreAttachments::in_memory(
                &config.storage.bucket,
                &config.server.public_url,
            )),
        };

        let users: Arc<dyn UserDirectory> = Arc::new(DocumentUserDirectory::new(store.clone()));

        Ok(Self::from_parts(config, store, attachments, users))
    }

    /// Wire the services over already-built collaborators
    pub fn from_parts(
        config: Config,
        store: Arc<dyn DocumentStore>,
        attachments: Arc<dyn AttachmentStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        let ids = Arc::new(DocumentIdGenerator::new(0));
        let cascade = Arc::new(CascadeDeleter::new(
            store.clone(),
            attachments.clone(),
            config.orchestration.delete_concurrency,
        ));
        let reputation = Arc::new(ReputationService::new(
            users.clone(),
            config.orchestration.reputation_max_attempts,
        ));

        Self {
            questions: Arc::new(QuestionService::new(
                store.clone(),
                attachments.clone(),
                users.clone(),
                ids.clone(),
            )),
            answers: Arc::new(AnswerService::new(
                store.clone(),
                users.clone(),
                cascade.clone(),
                reputation.clone(),
                ids.clone(),
            )),
            comments: Arc::new(CommentService::new(store.clone(), ids.clone())),
            votes: Arc::new(VoteService::new(store.clone(), ids)),
            tags: Arc::new(TagService::new(store.clone())),
            profiles: Arc::new(UserService::new(store.clone(), users.clone())),
            sweeper: Arc::new(OrphanSweeper::new(store.clone(), cascade.clone())),
            config,
            store,
            attachments,
            users,
            cascade,
            reputation,
        }
    }
}
