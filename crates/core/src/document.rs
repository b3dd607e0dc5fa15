//! Documents and their reserved state field.

use serde_json::Value;

/// An opaque JSON object held in the store.
pub type Document = serde_json::Map<String, Value>;

/// Reserved field carrying a document's current workflow state.
pub const STATE_FIELD: &str = "_State";

/// What a document says about its own state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredState<'a> {
    /// `_State` holds a string.
    Named(&'a str),
    /// No `_State` field (or an explicit `null`).
    Absent,
    /// `_State` holds something other than a string.
    Malformed,
}

pub fn declared_state(doc: &Document) -> DeclaredState<'_> {
    match doc.get(STATE_FIELD) {
        None | Some(Value::Null) => DeclaredState::Absent,
        Some(Value::String(s)) => DeclaredState::Named(s.as_str()),
        Some(_) => DeclaredState::Malformed,
    }
}

/// The state a stored document is judged at: its declared state, or
/// `default` when it carries none. `None` for a malformed state field,
/// which no role is ever granted anything on.
pub fn effective_state<'a>(doc: &'a Document, default: &'a str) -> Option<&'a str> {
    match declared_state(doc) {
        DeclaredState::Named(s) => Some(s),
        DeclaredState::Absent => Some(default),
        DeclaredState::Malformed => None,
    }
}

pub fn set_state(doc: &mut Document, state: &str) {
    doc.insert(STATE_FIELD.to_string(), Value::String(state.to_string()));
}
