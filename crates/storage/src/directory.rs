use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use andor_core::Document;
use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::validate_key;
use crate::traits::DocumentStore;

const EXTENSION: &str = "json";

/// Store that keeps one pretty-printed `<key>.json` file per document.
///
/// Writes go to a temporary file in the same directory and are then renamed
/// into place, so a reader never sees a half-written document. Blocking file
/// I/O runs on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::backend(&format!("create {}", root.display()), e))?;
        Ok(DirectoryStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.{EXTENSION}")))
    }

    async fn blocking<T, F>(f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| StoreError::backend("blocking task", e))?
    }
}

fn not_found(key: &str) -> StoreError {
    StoreError::NotFound {
        key: key.to_string(),
    }
}

/// Serialize `doc` into a temp file next to `path`.
fn write_temp(dir: &Path, doc: &Document) -> Result<tempfile::NamedTempFile, StoreError> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(dir)
        .map_err(|e| StoreError::backend("temp file", e))?;
    let bytes =
        serde_json::to_vec_pretty(doc).map_err(|e| StoreError::backend("serialize", e))?;
    tmp.write_all(&bytes)
        .map_err(|e| StoreError::backend("write", e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::backend("sync", e))?;
    Ok(tmp)
}

#[async_trait]
impl DocumentStore for DirectoryStore {
    async fn has(&self, key: &str) -> Result<bool, StoreError> {
        let path = match self.path_for(key) {
            Ok(p) => p,
            Err(StoreError::InvalidKey { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::backend(&format!("stat {}", path.display()), e))
    }

    async fn create(&self, key: &str, doc: Document) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let root = self.root.clone();
        let key = key.to_string();
        Self::blocking(move || {
            let tmp = write_temp(&root, &doc)?;
            tmp.persist_noclobber(&path).map_err(|e| {
                if e.error.kind() == ErrorKind::AlreadyExists {
                    StoreError::AlreadyExists { key }
                } else {
                    StoreError::backend(&format!("persist {}", path.display()), e.error)
                }
            })?;
            Ok(())
        })
        .await
    }

    async fn read(&self, key: &str) -> Result<Document, StoreError> {
        let path = match self.path_for(key) {
            Ok(p) => p,
            Err(StoreError::InvalidKey { .. }) => return Err(not_found(key)),
            Err(e) => return Err(e),
        };
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found(key)),
            Err(e) => return Err(StoreError::backend(&format!("read {}", path.display()), e)),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::backend(&format!("parse {}", path.display()), e))
    }

    async fn update(&self, key: &str, doc: Document) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::backend(&format!("stat {}", path.display()), e))?;
        if !exists {
            return Err(not_found(key));
        }
        let root = self.root.clone();
        Self::blocking(move || {
            let tmp = write_temp(&root, &doc)?;
            tmp.persist(&path)
                .map_err(|e| StoreError::backend(&format!("persist {}", path.display()), e.error))?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(key)),
            Err(e) => Err(StoreError::backend(&format!("remove {}", path.display()), e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StoreError::backend(&format!("list {}", self.root.display()), e))?;
        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::backend("list", e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_key(stem).is_ok() {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance::run_conformance_suite;

    #[tokio::test]
    async fn directory_store_passes_conformance() {
        let dirs = std::sync::Mutex::new(Vec::new());
        let report = run_conformance_suite(|| {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().join("objects");
            dirs.lock().unwrap().push(dir);
            async move { DirectoryStore::open(root).await.unwrap() }
        })
        .await;
        assert_eq!(report.failed, 0, "{report}");
    }

    #[tokio::test]
    async fn documents_are_pretty_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path()).await.unwrap();
        let doc = serde_json::json!({"_State": "created", "title": "On Rust"})
            .as_object()
            .cloned()
            .unwrap();
        store.create("article-1", doc.clone()).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("article-1.json")).unwrap();
        assert!(raw.contains("\n"));
        let parsed: Document = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, doc);
    }

    #[tokio::test]
    async fn update_reports_stat_failure_as_backend_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("objects");
        let store = DirectoryStore::open(&root).await.unwrap();
        // A plain file where the store directory used to be: stat fails
        // with ENOTDIR rather than NotFound.
        std::fs::remove_dir(&root).unwrap();
        std::fs::write(&root, "not a directory").unwrap();

        let err = store.update("article-1", Document::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)), "{err:?}");
    }

    #[tokio::test]
    async fn stray_files_are_not_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join(".tmp-abc.json"), "{}").unwrap();
        let store = DirectoryStore::open(dir.path()).await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }
}
