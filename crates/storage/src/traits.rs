use andor_core::Document;
use async_trait::async_trait;

use crate::error::StoreError;

/// Predicate over a stored document, used by [`DocumentStore::key_filter`].
pub type DocumentPredicate<'a> = &'a (dyn Fn(&Document) -> bool + Send + Sync);

/// The content store documents live in.
///
/// Each call is assumed atomic for the single document it touches. Nothing
/// more is promised: in particular, implementations need not protect
/// themselves against interleaved writers. Callers that share a store
/// serialize their mutations (see `andor-engine`'s `MutationSerializer`).
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be shared behind an
/// `Arc` across request handlers and spawned tasks.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Whether a document is stored under `key`.
    async fn has(&self, key: &str) -> Result<bool, StoreError>;

    /// Store a new document.
    ///
    /// Returns `Err(StoreError::AlreadyExists)` if `key` is taken.
    async fn create(&self, key: &str, doc: Document) -> Result<(), StoreError>;

    /// Read a document.
    ///
    /// Returns `Err(StoreError::NotFound)` if `key` is absent.
    async fn read(&self, key: &str) -> Result<Document, StoreError>;

    /// Replace an existing document.
    ///
    /// Returns `Err(StoreError::NotFound)` if `key` is absent.
    async fn update(&self, key: &str, doc: Document) -> Result<(), StoreError>;

    /// Physically remove a document.
    ///
    /// Returns `Err(StoreError::NotFound)` if `key` is absent.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// All keys, sorted.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Keys, sorted, whose document satisfies `predicate`.
    ///
    /// The default reads every document through [`read`](Self::read); a
    /// document removed between listing and reading is skipped.
    async fn key_filter(&self, predicate: DocumentPredicate<'_>) -> Result<Vec<String>, StoreError> {
        let mut matched = Vec::new();
        for key in self.keys().await? {
            match self.read(&key).await {
                Ok(doc) if predicate(&doc) => matched.push(key),
                Ok(_) | Err(StoreError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(matched)
    }
}
