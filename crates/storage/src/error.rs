/// All errors that can be returned by a `DocumentStore` implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No document is stored under `key`.
    #[error("document not found: {key}")]
    NotFound { key: String },

    /// A document is already stored under `key`; create never overwrites.
    #[error("document already exists: {key}")]
    AlreadyExists { key: String },

    /// The key cannot name a document (empty, path-like, or a list separator).
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// A backend-specific failure (I/O, serialization, ...).
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn backend(context: &str, err: impl std::fmt::Display) -> Self {
        StoreError::Backend(format!("{context}: {err}"))
    }
}
