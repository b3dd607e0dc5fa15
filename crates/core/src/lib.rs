//! andor-core: the And/Or access model.
//!
//! Holds everything that decides whether an operation may happen, and
//! nothing that performs it:
//!
//! - [`Operation`] -- the closed set of document operations
//! - [`WorkflowModel`] -- states and their progression indexes
//! - [`RoleRegistry`] -- grants keyed by (role, state)
//! - [`AccessModel`] -- `is_allowed` and `can_assign` over the two tables
//! - [`ModelConfig`] -- the on-disk format, validated into an `AccessModel`
//! - [`UserDirectory`] / [`Identity`] -- username to role bundle, plus the
//!   edits behind `andor users`
//!
//! The model is immutable once loaded and is shared between tasks behind an
//! `Arc` without any locking.

pub mod access;
pub mod config;
pub mod document;
pub mod error;
pub mod operation;
pub mod registry;
pub mod users;
pub mod workflow;

pub use access::{AccessGrant, AccessModel, Direction, RoleSet};
pub use config::ModelConfig;
pub use document::{Document, STATE_FIELD};
pub use error::{ConfigError, ModelError, UserAdminError};
pub use operation::Operation;
pub use registry::RoleRegistry;
pub use users::{Identity, User, UserDirectory};
pub use workflow::{State, WorkflowModel, DELETED_STATE};
