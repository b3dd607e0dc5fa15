//! Role grants keyed by (role, state).

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::operation::Operation;

/// What a single role may do.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoleGrants {
    /// state -> operations permitted at that state.
    pub permissions: BTreeMap<String, BTreeSet<Operation>>,
    /// Explicit (from, to) regressions this role may perform.
    pub transitions: BTreeSet<(String, String)>,
}

/// Immutable permission table.
///
/// Every state referenced here has been checked against the
/// [`WorkflowModel`](crate::workflow::WorkflowModel) at load time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoleRegistry {
    roles: BTreeMap<String, RoleGrants>,
}

impl RoleRegistry {
    pub(crate) fn new(roles: BTreeMap<String, RoleGrants>) -> Self {
        RoleRegistry { roles }
    }

    /// Operations `role` may perform at `state`. Empty for an unknown role or
    /// a state the role has no entry for.
    pub fn lookup_permissions(&self, role: &str, state: &str) -> BTreeSet<Operation> {
        self.roles
            .get(role)
            .and_then(|g| g.permissions.get(state))
            .cloned()
            .unwrap_or_default()
    }

    /// Single-operation check without materializing the set.
    pub fn grants(&self, role: &str, state: &str, op: Operation) -> bool {
        self.roles
            .get(role)
            .and_then(|g| g.permissions.get(state))
            .is_some_and(|ops| ops.contains(&op))
    }

    /// Whether `role` holds an explicit grant to move a document from `from`
    /// back to `to`.
    pub fn has_transition_grant(&self, role: &str, from: &str, to: &str) -> bool {
        self.roles.get(role).is_some_and(|g| {
            g.transitions
                .iter()
                .any(|(f, t)| f.as_str() == from && t.as_str() == to)
        })
    }

    pub fn is_known_role(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    pub fn role(&self, role: &str) -> Option<&RoleGrants> {
        self.roles.get(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RoleRegistry {
        let mut editor = RoleGrants::default();
        editor.permissions.insert(
            "review".into(),
            [Operation::Read, Operation::Update].into_iter().collect(),
        );
        editor
            .transitions
            .insert(("published".into(), "review".into()));
        RoleRegistry::new([("editor".to_string(), editor)].into_iter().collect())
    }

    #[test]
    fn lookup_is_empty_for_unknown_role_or_state() {
        let r = registry();
        assert!(r.lookup_permissions("guest", "review").is_empty());
        assert!(r.lookup_permissions("editor", "published").is_empty());
        assert_eq!(r.lookup_permissions("editor", "review").len(), 2);
    }

    #[test]
    fn transition_grant_is_directional() {
        let r = registry();
        assert!(r.has_transition_grant("editor", "published", "review"));
        assert!(!r.has_transition_grant("editor", "review", "published"));
        assert!(!r.has_transition_grant("guest", "published", "review"));
    }

    #[test]
    fn known_roles_are_the_configured_ones() {
        let r = registry();
        assert!(r.is_known_role("editor"));
        assert!(!r.is_known_role("guest"));
        assert_eq!(r.role_names().collect::<Vec<_>>(), vec!["editor"]);
    }
}
