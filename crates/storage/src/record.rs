use crate::error::StoreError;

/// Longest key accepted by [`validate_key`].
pub const MAX_KEY_LEN: usize = 200;

/// Check that `key` can name a document in any backend.
///
/// Keys travel in URL paths, comma-separated read lists and file names, so
/// they must be non-blank, carry no surrounding whitespace, and contain no
/// path separators, commas or control characters.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let invalid = |reason| {
        Err(StoreError::InvalidKey {
            key: key.to_string(),
            reason,
        })
    };
    if key.trim().is_empty() {
        return invalid("key is blank");
    }
    if key.trim() != key {
        return invalid("key has surrounding whitespace");
    }
    if key.len() > MAX_KEY_LEN {
        return invalid("key is too long");
    }
    if key == "." || key == ".." || key.starts_with('.') {
        return invalid("key must not start with '.'");
    }
    if key
        .chars()
        .any(|c| matches!(c, '/' | '\\' | ',') || c.is_control())
    {
        return invalid("key contains '/', '\\', ',' or a control character");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_keys() {
        for key in ["article-1", "jane.doe@example.edu", "2024_report", "a b"] {
            assert!(validate_key(key).is_ok(), "{key}");
        }
    }

    #[test]
    fn rejects_unsafe_keys() {
        for key in ["", "   ", " a", "a/b", "..", ".hidden", "a,b", "a\\b", "a\nb"] {
            assert!(
                matches!(validate_key(key), Err(StoreError::InvalidKey { .. })),
                "{key:?}"
            );
        }
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN + 1)).is_err());
    }
}
