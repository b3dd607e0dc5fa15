//! Workflow states and their progression order.

use std::collections::BTreeMap;

use serde::Serialize;

/// Name of the terminal sentinel state written by a soft delete.
pub const DELETED_STATE: &str = "deleted";

/// Default name of the initial state when the configuration names none.
pub const DEFAULT_INITIAL_STATE: &str = "created";

/// A single workflow state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct State {
    pub name: String,
    /// Ordinal position used to classify a move as an advance or a regression.
    pub index: i64,
}

/// The validated set of states a document can be in.
///
/// Built once by the config loader; never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowModel {
    name: String,
    default_state: String,
    /// Sorted by progression index.
    states: Vec<State>,
    #[serde(skip)]
    by_name: BTreeMap<String, i64>,
}

impl WorkflowModel {
    /// Assemble a model from already-validated parts.
    ///
    /// Callers outside this crate go through [`crate::config`], which checks
    /// names, indexes and the default state before calling this.
    pub(crate) fn new(name: String, default_state: String, mut states: Vec<State>) -> Self {
        states.sort_by_key(|s| s.index);
        let by_name = states.iter().map(|s| (s.name.clone(), s.index)).collect();
        WorkflowModel {
            name,
            default_state,
            states,
            by_name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// State assigned to documents created without one.
    pub fn default_state(&self) -> &str {
        &self.default_state
    }

    /// The soft-delete sentinel. Always part of the model.
    pub fn deleted_state(&self) -> &str {
        DELETED_STATE
    }

    pub fn is_deleted(&self, state: &str) -> bool {
        state == DELETED_STATE
    }

    pub fn is_known_state(&self, state: &str) -> bool {
        self.by_name.contains_key(state)
    }

    /// Configured progression index, or `None` for an unmodeled state.
    pub fn progression_index(&self, state: &str) -> Option<i64> {
        self.by_name.get(state).copied()
    }

    /// States in progression order.
    pub fn states(&self) -> &[State] {
        &self.states
    }
}
