//! The closed set of operations a role can be granted on a document.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An operation against a document in the store.
///
/// Configuration files and the wire format spell these in lowercase
/// (`"create"`, `"read"`, ...). Anything else is rejected at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Assign,
}

impl Operation {
    /// Every operation, in declaration order.
    pub const ALL: [Operation; 5] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
        Operation::Assign,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Assign => "assign",
        }
    }

    /// Whether the operation writes to the store and so must hold the
    /// mutation token.
    pub fn is_mutation(self) -> bool {
        !matches!(self, Operation::Read)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown operation name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation '{0}' (expected one of create, read, update, delete, assign)")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Assign".parse::<Operation>().unwrap(), Operation::Assign);
        assert_eq!(" read ".parse::<Operation>().unwrap(), Operation::Read);
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "publish".parse::<Operation>().unwrap_err();
        assert_eq!(err, UnknownOperation("publish".to_string()));
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Operation::Delete).unwrap();
        assert_eq!(json, "\"delete\"");
        let op: Operation = serde_json::from_str("\"update\"").unwrap();
        assert_eq!(op, Operation::Update);
        assert!(serde_json::from_str::<Operation>("\"Update\"").is_err());
    }

    #[test]
    fn only_read_is_not_a_mutation() {
        let non_mutating: Vec<_> = Operation::ALL
            .into_iter()
            .filter(|op| !op.is_mutation())
            .collect();
        assert_eq!(non_mutating, vec![Operation::Read]);
    }
}
