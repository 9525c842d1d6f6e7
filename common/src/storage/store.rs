use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{path::Path as ObjPath, ObjectStore};

use crate::storage::types::use_case::UseCase;
use crate::utils::config::{AppConfig, StorageKind};

pub type DynStore = Arc<dyn ObjectStore>;

/// Object storage for uploaded source files.
#[derive(Clone)]
pub struct StorageManager {
    store: DynStore,
}

impl StorageManager {
    /// Create a new StorageManager with the specified configuration.
    pub async fn new(cfg: &AppConfig) -> object_store::Result<Self> {
        let store = create_storage_backend(cfg).await?;
        Ok(Self::with_backend(store))
    }

    /// Create a StorageManager with a custom storage backend.
    pub fn with_backend(store: DynStore) -> Self {
        Self { store }
    }

    /// In-memory manager for tests and ephemeral deployments.
    pub fn memory() -> Self {
        Self::with_backend(Arc::new(InMemory::new()))
    }

    /// Store bytes at the specified location.
    pub async fn put(&self, location: &str, data: Bytes) -> object_store::Result<()> {
        let path = ObjPath::from(location);
        let payload = object_store::PutPayload::from_bytes(data);
        self.store.put(&path, payload).await.map(|_| ())
    }

    /// Retrieve bytes from the specified location, buffered in memory.
    pub async fn get(&self, location: &str) -> object_store::Result<Bytes> {
        let path = ObjPath::from(location);
        let result = self.store.get(&path).await?;
        result.bytes().await
    }

    /// Check if an object exists at the specified location.
    pub async fn exists(&self, location: &str) -> object_store::Result<bool> {
        let path = ObjPath::from(location);
        self.store
            .head(&path)
            .await
            .map(|_| true)
            .or_else(|e| match e {
                object_store::Error::NotFound { .. } => Ok(false),
                _ => Err(e),
            })
    }
}

/// Object location of an uploaded file, `uploads/{use_case}/{document_id}/{file_name}`.
pub fn upload_location(use_case: UseCase, document_id: &str, file_name: &str) -> String {
    format!(
        "uploads/{use_case}/{document_id}/{}",
        sanitize_file_name(file_name)
    )
}

fn sanitize_file_name(file_name: &str) -> String {
    let clean = |part: &str| -> String {
        part.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    };

    let sanitized = match file_name.rsplit_once('.') {
        Some((name, ext)) => format!("{}.{}", clean(name), clean(ext)),
        None => clean(file_name),
    };

    if sanitized.trim_matches(['_', '.']).is_empty() {
        "document.pdf".to_string()
    } else {
        sanitized
    }
}

async fn create_storage_backend(cfg: &AppConfig) -> object_store::Result<DynStore> {
    match cfg.storage {
        StorageKind::Local => {
            let base = resolve_base_dir(cfg);
            if !base.exists() {
                tokio::fs::create_dir_all(&base).await.map_err(|e| {
                    object_store::Error::Generic {
                        store: "LocalFileSystem",
                        source: e.into(),
                    }
                })?;
            }
            let store = LocalFileSystem::new_with_prefix(base)?;
            Ok(Arc::new(store))
        }
        StorageKind::Memory => {
            Ok(Arc::new(InMemory::new()))
        }
    }
}

/// Resolve the absolute base directory used for local storage from config.
///
/// If `data_dir` is relative, it is resolved against the current working directory.
pub fn resolve_base_dir(cfg: &AppConfig) -> PathBuf {
    if cfg.data_dir.starts_with('/') {
        PathBuf::from(&cfg.data_dir)
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(&cfg.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_put_get_exists() {
        let cfg = AppConfig {
            storage: StorageKind::Memory,
            ..Default::default()
        };
        let storage = StorageManager::new(&cfg)
            .await
            .expect("create storage manager");

        let location = "uploads/study/doc-1/notes.pdf";
        storage
            .put(location, Bytes::from_static(b"%PDF-1.4"))
            .await
            .expect("put");

        assert_eq!(storage.get(location).await.expect("get").as_ref(), b"%PDF-1.4");
        assert!(storage.exists(location).await.expect("exists"));
        assert!(!storage.exists("uploads/missing.pdf").await.expect("exists"));
    }

    #[tokio::test]
    async fn local_backend_writes_below_data_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = AppConfig {
            storage: StorageKind::Local,
            data_dir: dir.path().to_string_lossy().into_owned(),
            ..Default::default()
        };
        let storage = StorageManager::new(&cfg)
            .await
            .expect("create storage manager");

        storage
            .put("uploads/invoice/doc-2/a.pdf", Bytes::from_static(b"bytes"))
            .await
            .expect("put");
        assert!(dir.path().join("uploads/invoice/doc-2/a.pdf").exists());
    }

    #[test]
    fn upload_location_sanitizes_file_name() {
        assert_eq!(
            upload_location(UseCase::Study, "doc-1", "My Notes (v2).pdf"),
            "uploads/study/doc-1/My_Notes__v2_.pdf"
        );
        assert_eq!(
            upload_location(UseCase::Invoice, "doc-1", "../../etc/passwd"),
            "uploads/invoice/doc-1/____._etc_passwd"
        );
        assert_eq!(
            upload_location(UseCase::Study, "doc-1", ""),
            "uploads/study/doc-1/document.pdf"
        );
    }
}
