//! Access decisions and transition policy.
//!
//! Both predicates are pure functions of the immutable [`AccessModel`]; they
//! take no locks and can be evaluated from any number of tasks at once.
//!
//! - [`AccessModel::is_allowed`]: may this role bundle perform an operation
//!   on a document in a given state.
//! - [`AccessModel::can_assign`]: may this role bundle move a document from
//!   one state to another. Advances are open to anyone the caller has
//!   already cleared for `Assign`; regressions need an explicit grant.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::operation::Operation;
use crate::registry::RoleRegistry;
use crate::workflow::WorkflowModel;

/// The set of role names a caller holds.
pub type RoleSet = BTreeSet<String>;

/// The resolved operation set for a role bundle at one state.
///
/// Derived on demand; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessGrant {
    pub state: String,
    pub operations: BTreeSet<Operation>,
}

/// Direction of a state change, by progression index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Advance,
    Stay,
    Regress,
}

/// Workflow plus role table: everything needed to authorize an operation.
#[derive(Debug, Clone, Serialize)]
pub struct AccessModel {
    pub(crate) workflow: WorkflowModel,
    pub(crate) registry: RoleRegistry,
}

impl AccessModel {
    pub(crate) fn new(workflow: WorkflowModel, registry: RoleRegistry) -> Self {
        AccessModel { workflow, registry }
    }

    pub fn workflow(&self) -> &WorkflowModel {
        &self.workflow
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// Allowed iff some role in `roles` grants `op` at `state`.
    ///
    /// Unknown roles contribute nothing; an unknown state always denies.
    pub fn is_allowed(&self, roles: &RoleSet, state: &str, op: Operation) -> bool {
        if !self.workflow.is_known_state(state) {
            return false;
        }
        roles
            .iter()
            .any(|role| self.registry.grants(role, state, op))
    }

    /// Union of what every role in the bundle may do at `state`.
    pub fn grant(&self, roles: &RoleSet, state: &str) -> AccessGrant {
        let operations = if self.workflow.is_known_state(state) {
            roles
                .iter()
                .flat_map(|role| self.registry.lookup_permissions(role, state))
                .collect()
        } else {
            BTreeSet::new()
        };
        AccessGrant {
            state: state.to_string(),
            operations,
        }
    }

    /// The derived grant table for a role bundle, one entry per modeled
    /// state, in progression order.
    pub fn grants_by_state(&self, roles: &RoleSet) -> BTreeMap<i64, AccessGrant> {
        self.workflow
            .states()
            .iter()
            .map(|s| (s.index, self.grant(roles, &s.name)))
            .collect()
    }

    /// Classify a move between two modeled states. `None` if either state is
    /// unknown.
    pub fn direction(&self, from: &str, to: &str) -> Option<Direction> {
        let from_idx = self.workflow.progression_index(from)?;
        let to_idx = self.workflow.progression_index(to)?;
        Some(match to_idx.cmp(&from_idx) {
            Ordering::Greater => Direction::Advance,
            Ordering::Equal => Direction::Stay,
            Ordering::Less => Direction::Regress,
        })
    }

    /// Whether `roles` may move a document from `from` to `to`.
    ///
    /// Advances are permitted here and left to the caller's `Assign` check.
    /// Regressions require an explicit `(from, to)` grant on some role. The
    /// deleted sentinel is never a valid target; only a soft delete writes it.
    pub fn can_assign(&self, roles: &RoleSet, from: &str, to: &str) -> bool {
        let Some(direction) = self.direction(from, to) else {
            return false;
        };
        if from == to {
            return true;
        }
        if self.workflow.is_deleted(to) {
            return false;
        }
        match direction {
            Direction::Advance => true,
            // Indexes are unique, so Stay only happens for from == to.
            Direction::Stay => false,
            Direction::Regress => roles
                .iter()
                .any(|role| self.registry.has_transition_grant(role, from, to)),
        }
    }
}
