use andor_storage::StoreError;

/// Why an orchestrator operation did not succeed.
///
/// Permission and lookup failures are terminal for the call; nothing is
/// retried. Store failures are carried through [`From<StoreError>`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// The request itself is malformed: bad key, bad state, empty key list.
    #[error("bad input: {0}")]
    BadInput(String),

    /// The caller's roles do not permit the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The store refused the write, e.g. the key already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A backend failure unrelated to the caller.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OperationError {
    /// Stable lowercase name of the outcome, used in logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            OperationError::BadInput(_) => "bad_input",
            OperationError::Forbidden(_) => "forbidden",
            OperationError::NotFound(_) => "not_found",
            OperationError::Conflict(_) => "conflict",
            OperationError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for OperationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { key } => OperationError::NotFound(key),
            StoreError::AlreadyExists { key } => {
                OperationError::Conflict(format!("'{key}' already exists"))
            }
            e @ StoreError::InvalidKey { .. } => OperationError::BadInput(e.to_string()),
            StoreError::Backend(msg) => OperationError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_outcomes() {
        let e: OperationError = StoreError::NotFound { key: "a".into() }.into();
        assert_eq!(e, OperationError::NotFound("a".into()));

        let e: OperationError = StoreError::AlreadyExists { key: "a".into() }.into();
        assert_eq!(e.kind(), "conflict");

        let e: OperationError = StoreError::InvalidKey {
            key: "a/b".into(),
            reason: "nope",
        }
        .into();
        assert_eq!(e.kind(), "bad_input");

        let e: OperationError = StoreError::Backend("disk on fire".into()).into();
        assert_eq!(e, OperationError::Internal("disk on fire".into()));
    }
}
