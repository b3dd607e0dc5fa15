//! andor-engine: serialized, permission-checked document operations.
//!
//! [`Orchestrator`] is the single entry point for create, read, update,
//! delete, assign and key listing. It consults an immutable
//! [`AccessModel`](andor_core::AccessModel) for every decision and holds the
//! process-wide [`MutationSerializer`] token across each mutation's fresh
//! read, decision and write.

pub mod error;
pub mod orchestrator;
pub mod serializer;

pub use error::OperationError;
pub use orchestrator::{split_keys, Orchestrator, ReadItem, UpdateReport};
pub use serializer::{MutationSerializer, MutationToken};
