// Attachment storage - binary question attachments keyed by opaque ids
// Backed by any `object_store` implementation (in-memory or local filesystem)

use async_trait::async_trait;
use object_store::{local::LocalFileSystem, memory::InMemory, path::Path, ObjectStore, PutPayload};
use std::sync::Arc;
use tracing::debug;

use super::id_generator::DocumentIdGenerator;
use crate::error::{AppError, AppResult};

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Store the bytes under a fresh id and return it
    async fn upload(&self, bytes: Vec<u8>) -> AppResult<String>;
    async fn download(&self, id: &str) -> AppResult<Vec<u8>>;
    /// Fails with `NotFound` if no attachment has this id
    async fn delete(&self, id: &str) -> AppResult<()>;
    fn preview_url(&self, id: &str) -> String;
}

pub struct ObjectStoreAttachments {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    public_url: String,
    ids: DocumentIdGenerator,
}

impl ObjectStoreAttachments {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: &str, public_url: &str) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
            ids: DocumentIdGenerator::new(1),
        }
    }

    pub fn in_memory(bucket: &str, public_url: &str) -> Self {
        Self::new(Arc::new(InMemory::new()), bucket, public_url)
    }

    pub fn local(dir: &str, bucket: &str, public_url: &str) -> AppResult<Self> {
        std::fs::create_dir_all(dir).map_err(|e| {
            AppError::ConfigurationError(format!("Cannot create attachment dir {}: {}", dir, e))
        })?;
        let fs = LocalFileSystem::new_with_prefix(dir).map_err(|e| {
            AppError::ConfigurationError(format!("Cannot open attachment dir {}: {}", dir, e))
        })?;
        Ok(Self::new(Arc::new(fs), bucket, public_url))
    }

    fn location(&self, id: &str) -> AppResult<Path> {
        validate_attachment_id(id)?;
        Ok(Path::from(format!("{}/{}", self.bucket, id)))
    }
}

/// Attachment ids are a single path segment of `[A-Za-z0-9._-]`, not starting with a dot
pub fn validate_attachment_id(id: &str) -> AppResult<()> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if !valid {
        return Err(AppError::Validation(format!("Invalid attachment id '{}'", id)));
    }
    Ok(())
}

#[async_trait]
impl AttachmentStore for ObjectStoreAttachments {
    async fn upload(&self, bytes: Vec<u8>) -> AppResult<String> {
        let id = self.ids.next_id();
        let location = self.location(&id)?;
        debug!("Uploading attachment {} ({} bytes)", location, bytes.len());
        self.store.put(&location, PutPayload::from(bytes)).await?;
        Ok(id)
    }

    async fn download(&self, id: &str) -> AppResult<Vec<u8>> {
        let location = self.location(id)?;
        let bytes = self.store.get(&location).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        // Nothing can be stored under an id that does not address an object
        let location = self
            .location(id)
            .map_err(|_| AppError::NotFound(format!("Attachment {} not found", id)))?;
        // Not every backend reports a missing object on delete, so probe first
        self.store.head(&location).await?;
        self.store.delete(&location).await?;
        Ok(())
    }

    fn preview_url(&self, id: &str) -> String {
        format!("{}/api/attachment/{}/preview", self.public_url, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_download_delete() {
        let attachments = ObjectStoreAttachments::in_memory("question-attachment", "http://qa.test/");
        let id = attachments.upload(b"png bytes".to_vec()).await.unwrap();
        assert_eq!(attachments.download(&id).await.unwrap(), b"png bytes".to_vec());
        assert_eq!(
            attachments.preview_url(&id),
            format!("http://qa.test/api/attachment/{}/preview", id)
        );

        attachments.delete(&id).await.unwrap();
        assert!(attachments.delete(&id).await.unwrap_err().is_not_found());
        assert!(attachments.download(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_local_filesystem_backend() {
        let dir = tempfile::tempdir().unwrap();
        let attachments = ObjectStoreAttachments::local(
            dir.path().to_str().unwrap(),
            "question-attachment",
            "http://localhost:3000",
        )
        .unwrap();

        let id = attachments.upload(vec![1, 2, 3]).await.unwrap();
        assert!(dir.path().join("question-attachment").join(&id).exists());
        attachments.delete(&id).await.unwrap();
        assert!(attachments.delete(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let attachments = ObjectStoreAttachments::in_memory("b", "http://x");
        let err = attachments.download("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = attachments.delete("my file.png").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_validate_attachment_id() {
        assert!(validate_attachment_id("0190a1b2c3d4-0001-0002").is_ok());
        assert!(validate_attachment_id("diagram_v2.png").is_ok());
        for bad in ["", ".hidden", "my file.png", "a/b", "..", "ü"] {
            assert!(validate_attachment_id(bad).is_err(), "{:?} accepted", bad);
        }
    }
}
