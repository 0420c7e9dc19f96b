//! On-disk attachment storage

use std::path::{Path, PathBuf};

use rand::Rng;
use thiserror::Error;

use super::sanitize::sanitize_filename;
use crate::models::{Audit, FileRecord};
use crate::store::{ObjectId, Repository, StoreError};

#[derive(Error, Debug)]
pub enum FileStoreError {
    #[error("Uploaded file '{0}' is empty")]
    EmptyFile(String),

    #[error("Failed to write attachment: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Writes attachments under a root directory and records them in the
/// `files` collection.
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
    base_url: String,
    files: Repository<FileRecord>,
}

impl FileStore {
    pub fn new(
        root: impl Into<PathBuf>,
        base_url: impl Into<String>,
        files: Repository<FileRecord>,
    ) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            files,
        }
    }

    /// Persist `bytes` as `{prefix}-{file_id}-{sanitized name}` and record it.
    pub async fn store(
        &self,
        bytes: &[u8],
        original_name: &str,
        content_type: &str,
        prefix: &str,
        actor: Option<ObjectId>,
    ) -> Result<FileRecord, FileStoreError> {
        if bytes.is_empty() {
            return Err(FileStoreError::EmptyFile(original_name.to_string()));
        }

        let name = sanitize_filename(original_name);
        let file_id = generate_file_id();
        let storage_name = format!("{}-{}-{}", prefix, file_id, name);
        let path = self.root.join(&storage_name);

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, bytes).await?;

        let record = FileRecord {
            id: ObjectId::new(),
            url: format!("{}/{}", self.base_url, storage_name),
            path: path.to_string_lossy().into_owned(),
            storage_name,
            name,
            file_id,
            size: bytes.len() as u64,
            content_type: content_type.to_string(),
            audit: Audit::new(actor),
        };

        if let Err(e) = self.files.create(&record).await {
            remove_quietly(&path).await;
            return Err(e.into());
        }

        tracing::debug!(
            file = %record.storage_name,
            size = record.size,
            "Stored attachment"
        );

        Ok(record)
    }

    /// Best-effort removal of an attachment that ended up unreferenced.
    /// Failures are logged, never returned.
    pub async fn discard(&self, record: &FileRecord, actor: Option<ObjectId>) {
        remove_quietly(Path::new(&record.path)).await;

        if let Err(e) = self.files.delete(record.id, actor).await {
            tracing::warn!(
                file = %record.storage_name,
                error = %e,
                "Failed to soft-delete orphaned file record"
            );
        }
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove attachment");
    }
}

/// 16 random hex characters
fn generate_file_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryDocumentStore;

    fn file_store(dir: &Path) -> (FileStore, Repository<FileRecord>) {
        let files = Repository::new(Arc::new(MemoryDocumentStore::new()));
        (FileStore::new(dir, "/files/", files.clone()), files)
    }

    #[tokio::test]
    async fn test_store_writes_file_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let (store, files) = file_store(dir.path());

        let record = store
            .store(b"%PDF-1.4", "../my passport.pdf", "application/pdf", "passport", None)
            .await
            .unwrap();

        assert_eq!(record.name, "my_passport.pdf");
        assert_eq!(record.file_id.len(), 16);
        assert_eq!(
            record.storage_name,
            format!("passport-{}-my_passport.pdf", record.file_id)
        );
        assert_eq!(record.url, format!("/files/{}", record.storage_name));
        assert_eq!(record.size, 8);

        let on_disk = tokio::fs::read(dir.path().join(&record.storage_name)).await.unwrap();
        assert_eq!(on_disk, b"%PDF-1.4");

        let stored = files.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_same_name_uploads_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = file_store(dir.path());

        let a = store.store(b"a", "ticket.png", "image/png", "ticket", None).await.unwrap();
        let b = store.store(b"b", "ticket.png", "image/png", "ticket", None).await.unwrap();

        assert_ne!(a.storage_name, b.storage_name);
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = file_store(dir.path());

        let err = store
            .store(b"", "visa.pdf", "application/pdf", "visa", None)
            .await
            .unwrap_err();
        assert!(matches!(err, FileStoreError::EmptyFile(name) if name == "visa.pdf"));
    }

    #[tokio::test]
    async fn test_discard_removes_file_and_hides_record() {
        let dir = tempfile::tempdir().unwrap();
        let (store, files) = file_store(dir.path());

        let record = store
            .store(b"data", "visa.pdf", "application/pdf", "visa", None)
            .await
            .unwrap();
        store.discard(&record, None).await;

        assert!(!dir.path().join(&record.storage_name).exists());
        assert!(files.find_by_id(record.id).await.unwrap().is_none());
    }
}
