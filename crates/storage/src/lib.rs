//! Storage abstraction for And/Or.
//!
//! This crate defines the `DocumentStore` trait that every content backend
//! implements, the error type those backends return, and two reference
//! backends:
//!
//! - [`MemoryStore`] -- a sorted in-process map
//! - [`DirectoryStore`] -- one JSON file per document under a root directory
//!
//! The [`conformance`] module carries a backend-agnostic test suite that any
//! implementation can run against itself.

mod error;
mod record;
mod traits;

pub mod conformance;
pub mod directory;
pub mod memory;

pub use directory::DirectoryStore;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use record::{validate_key, MAX_KEY_LEN};
pub use traits::{DocumentPredicate, DocumentStore};
