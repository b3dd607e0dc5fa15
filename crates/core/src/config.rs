//! Access model configuration format and loader.
//!
//! The model is read once at startup from TOML (or JSON, chosen by file
//! extension) and validated exhaustively before anything can use it.
//!
//! # Example
//!
//! ```toml
//! [workflow]
//! name = "articles"
//! default_state = "created"
//!
//! [[workflow.states]]
//! name = "created"
//! index = 0
//!
//! [[workflow.states]]
//! name = "review"
//! index = 1
//!
//! [[workflow.states]]
//! name = "published"
//! index = 2
//!
//! [roles.editor.permissions]
//! review = ["read", "update", "assign"]
//! published = ["read"]
//!
//! [[roles.editor.transitions]]
//! from = "published"
//! to = "review"
//! ```
//!
//! The `deleted` sentinel state is added automatically, after the highest
//! configured index, unless the file declares it explicitly.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::access::AccessModel;
use crate::error::{ConfigError, ModelError};
use crate::operation::Operation;
use crate::registry::{RoleGrants, RoleRegistry};
use crate::workflow::{State, WorkflowModel, DEFAULT_INITIAL_STATE, DELETED_STATE};

// ── Types ─────────────────────────────────────────────────────────────────────

/// Top-level access model file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub workflow: WorkflowSection,
    /// Role grants, keyed by role name.
    #[serde(default)]
    pub roles: BTreeMap<String, RoleSection>,
}

/// `[workflow]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowSection {
    #[serde(default = "default_workflow_name")]
    pub name: String,
    /// Initial state for documents created without one.
    pub default_state: Option<String>,
    pub states: Vec<StateSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateSection {
    pub name: String,
    pub index: i64,
}

/// `[roles.<name>]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleSection {
    /// state -> operations.
    #[serde(default)]
    pub permissions: BTreeMap<String, BTreeSet<Operation>>,
    /// Regressions this role may perform explicitly.
    #[serde(default)]
    pub transitions: Vec<TransitionSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionSection {
    pub from: String,
    pub to: String,
}

fn default_workflow_name() -> String {
    "default".to_string()
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Read a `.toml` or `.json` file and deserialize it.
pub(crate) fn read_config_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| parse_err(e.to_string())),
        Some("json") => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string())),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

impl ModelConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        read_config_file(path)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Validate and freeze into an [`AccessModel`]. `origin` names the source
    /// in error messages.
    pub fn into_model(self, origin: impl AsRef<Path>) -> Result<AccessModel, ConfigError> {
        self.validate().map_err(|source| ConfigError::InvalidModel {
            path: origin.as_ref().to_path_buf(),
            source,
        })
    }

    fn validate(self) -> Result<AccessModel, ModelError> {
        let workflow = build_workflow(self.workflow)?;
        let registry = build_registry(self.roles, &workflow)?;
        Ok(AccessModel::new(workflow, registry))
    }
}

impl AccessModel {
    /// Load and validate an access model file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        ModelConfig::load(path)?.into_model(path)
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

fn build_workflow(section: WorkflowSection) -> Result<WorkflowModel, ModelError> {
    if section.states.is_empty() {
        return Err(ModelError::NoStates);
    }

    let mut names: BTreeSet<&str> = BTreeSet::new();
    let mut indexes: BTreeMap<i64, &str> = BTreeMap::new();
    for state in &section.states {
        let name = state.name.trim();
        if name.is_empty() || name != state.name {
            return Err(ModelError::EmptyStateName);
        }
        if !names.insert(name) {
            return Err(ModelError::DuplicateState {
                state: name.to_string(),
            });
        }
        if let Some(first) = indexes.insert(state.index, name) {
            return Err(ModelError::DuplicateIndex {
                index: state.index,
                first: first.to_string(),
                second: name.to_string(),
            });
        }
    }

    let default_state = section
        .default_state
        .unwrap_or_else(|| DEFAULT_INITIAL_STATE.to_string());
    if default_state == DELETED_STATE {
        return Err(ModelError::DeletedAsDefault {
            state: default_state,
        });
    }
    if !names.contains(default_state.as_str()) {
        return Err(ModelError::UnknownDefaultState {
            state: default_state,
        });
    }

    let mut states: Vec<State> = section
        .states
        .into_iter()
        .map(|s| State {
            name: s.name,
            index: s.index,
        })
        .collect();
    if !states.iter().any(|s| s.name == DELETED_STATE) {
        let last = states.iter().map(|s| s.index).max().unwrap_or(0);
        states.push(State {
            name: DELETED_STATE.to_string(),
            index: last.saturating_add(1),
        });
    }

    Ok(WorkflowModel::new(section.name, default_state, states))
}

fn build_registry(
    roles: BTreeMap<String, RoleSection>,
    workflow: &WorkflowModel,
) -> Result<RoleRegistry, ModelError> {
    let mut table = BTreeMap::new();
    for (role, section) in roles {
        if role.trim().is_empty() {
            return Err(ModelError::EmptyRoleName);
        }
        for state in section.permissions.keys() {
            if !workflow.is_known_state(state) {
                return Err(ModelError::UnknownPermissionState {
                    role,
                    state: state.clone(),
                });
            }
        }

        let mut transitions = BTreeSet::new();
        for t in section.transitions {
            let (Some(from_idx), Some(to_idx)) = (
                workflow.progression_index(&t.from),
                workflow.progression_index(&t.to),
            ) else {
                return Err(ModelError::UnknownTransitionState {
                    role,
                    from: t.from,
                    to: t.to,
                });
            };
            if workflow.is_deleted(&t.to) {
                return Err(ModelError::TransitionIntoDeleted {
                    role,
                    from: t.from,
                    to: t.to,
                });
            }
            if from_idx <= to_idx {
                return Err(ModelError::NotARegression {
                    role,
                    from: t.from,
                    to: t.to,
                });
            }
            transitions.insert((t.from, t.to));
        }

        table.insert(
            role,
            RoleGrants {
                permissions: section.permissions,
                transitions,
            },
        );
    }
    Ok(RoleRegistry::new(table))
}
