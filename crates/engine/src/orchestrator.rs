//! Permission-checked document operations.
//!
//! The [`Orchestrator`] ties an [`AccessModel`], a [`DocumentStore`] and the
//! [`MutationSerializer`] together. Every mutation runs the same steps:
//!
//! 1. Acquire the mutation token
//! 2. Re-read the stored document under the token
//! 3. Decide against the access model using that fresh copy
//! 4. Write, log, release
//!
//! Reads and key listings never take the token.

use std::collections::BTreeSet;
use std::sync::Arc;

use andor_core::document::{declared_state, effective_state, set_state, DeclaredState};
use andor_core::{AccessModel, Document, Identity, Operation, STATE_FIELD};
use andor_storage::{validate_key, DocumentStore, StoreError};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::OperationError;
use crate::serializer::{MutationSerializer, MutationToken};

/// A document returned by [`Orchestrator::read`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadItem {
    pub key: String,
    pub document: Document,
}

/// Outcome of a successful [`Orchestrator::update`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateReport {
    pub key: String,
    /// State the document was written with.
    pub state: String,
    /// Target state the caller asked for but may not move to. The update
    /// still succeeded, at `state`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_state: Option<String>,
    pub document: Document,
}

/// Split a comma-separated key list, dropping blanks.
pub fn split_keys(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect()
}

/// Serialized, permission-checked operations over one document collection.
///
/// `Orchestrator` is `Send + Sync` and meant to be shared behind an `Arc`.
/// `S` may be unsized, so `Orchestrator<dyn DocumentStore>` works when the
/// backend is picked at runtime.
///
/// Orchestrators built from the same `serializer` never mutate at the same
/// time, even over different stores.
pub struct Orchestrator<S: ?Sized> {
    model: Arc<AccessModel>,
    store: Arc<S>,
    serializer: Arc<MutationSerializer>,
}

impl<S: DocumentStore + ?Sized> Orchestrator<S> {
    pub fn new(
        model: Arc<AccessModel>,
        store: Arc<S>,
        serializer: Arc<MutationSerializer>,
    ) -> Self {
        Orchestrator {
            model,
            store,
            serializer,
        }
    }

    pub fn model(&self) -> &AccessModel {
        &self.model
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutations that have held the shared token so far, across every
    /// orchestrator using it.
    pub fn mutations(&self) -> u64 {
        self.serializer.mutations()
    }

    /// Store a new document under `key`.
    ///
    /// The initial state is the document's own `_State`, else the caller's
    /// preferred create state, else the workflow default. Returns the stored
    /// document, state field included.
    pub async fn create(
        &self,
        key: &str,
        mut doc: Document,
        who: &Identity,
    ) -> Result<Document, OperationError> {
        validate_key(key)?;
        if self.exists("create", key).await? {
            return Err(already_exists(key));
        }

        let workflow = self.model.workflow();
        let state = match declared_state(&doc) {
            DeclaredState::Named(s) => s.to_string(),
            DeclaredState::Absent => who
                .create_state
                .clone()
                .unwrap_or_else(|| workflow.default_state().to_string()),
            DeclaredState::Malformed => {
                return Err(OperationError::BadInput(format!(
                    "{STATE_FIELD} must be a string"
                )))
            }
        };
        if !workflow.is_known_state(&state) {
            return Err(OperationError::BadInput(format!("unknown state '{state}'")));
        }
        if workflow.is_deleted(&state) {
            return Err(OperationError::BadInput(format!(
                "documents cannot be created in state '{state}'"
            )));
        }
        if !self.model.is_allowed(&who.roles, &state, Operation::Create) {
            return Err(denied(who, key, &state, Operation::Create));
        }
        set_state(&mut doc, &state);

        let _token = self.serializer.acquire(Operation::Create).await;
        if self.exists("create", key).await? {
            return Err(already_exists(key));
        }
        self.store
            .create(key, doc.clone())
            .await
            .map_err(|e| store_failure("create", key, e))?;
        info!(user = %who.username, key, state = %state, "document created");
        Ok(doc)
    }

    /// Read each key independently and return the documents the caller may
    /// see, in request order.
    ///
    /// Keys the caller may not read and keys that do not exist are both
    /// dropped. If nothing is left the call fails: `Forbidden` if any key was
    /// dropped for permission, `NotFound` otherwise.
    pub async fn read<K>(&self, keys: &[K], who: &Identity) -> Result<Vec<ReadItem>, OperationError>
    where
        K: AsRef<str> + Sync,
    {
        let mut seen = BTreeSet::new();
        let mut wanted = Vec::new();
        for key in keys {
            let key = key.as_ref().trim();
            if !key.is_empty() && seen.insert(key) {
                wanted.push(key);
            }
        }
        if wanted.is_empty() {
            return Err(OperationError::BadInput("no keys given".to_string()));
        }

        let default = self.model.workflow().default_state();
        let mut found = Vec::new();
        let mut unauthorized = false;
        for key in wanted {
            let doc = match self.store.read(key).await {
                Ok(doc) => doc,
                Err(StoreError::NotFound { .. }) => continue,
                Err(e) => return Err(store_failure("read", key, e)),
            };
            let readable = effective_state(&doc, default)
                .is_some_and(|state| self.model.is_allowed(&who.roles, state, Operation::Read));
            if readable {
                found.push(ReadItem {
                    key: key.to_string(),
                    document: doc,
                });
            } else {
                warn!(user = %who.username, key, "read denied");
                unauthorized = true;
            }
        }

        if found.is_empty() {
            return Err(if unauthorized {
                OperationError::Forbidden("not permitted to read the requested documents".into())
            } else {
                OperationError::NotFound("none of the requested documents exist".into())
            });
        }
        Ok(found)
    }

    /// Replace a document's contents.
    ///
    /// A missing `_State` keeps the current state. A state change the caller
    /// may not make is dropped: the document is written at its current state
    /// and the report carries the rejected target.
    pub async fn update(
        &self,
        key: &str,
        mut doc: Document,
        who: &Identity,
    ) -> Result<UpdateReport, OperationError> {
        let token = self.serializer.acquire(Operation::Update).await;
        let (_, current) = self.current(&token, key).await?;
        let from = self.authorize(who, key, current.as_deref(), Operation::Update)?;

        let mut rejected_state = None;
        let state = match declared_state(&doc) {
            DeclaredState::Absent => from.to_string(),
            DeclaredState::Malformed => {
                return Err(OperationError::BadInput(format!(
                    "{STATE_FIELD} must be a string"
                )))
            }
            DeclaredState::Named(to) if to == from => from.to_string(),
            DeclaredState::Named(to) => {
                if self.model.can_assign(&who.roles, from, to) {
                    to.to_string()
                } else {
                    warn!(
                        user = %who.username,
                        key,
                        from,
                        to,
                        "state change not permitted, keeping current state"
                    );
                    rejected_state = Some(to.to_string());
                    from.to_string()
                }
            }
        };
        set_state(&mut doc, &state);

        self.write(&token, "update", key, doc.clone()).await?;
        info!(user = %who.username, key, state = %state, "document updated");
        Ok(UpdateReport {
            key: key.to_string(),
            state,
            rejected_state,
            document: doc,
        })
    }

    /// Soft delete: the document stays in the store with `_State` set to the
    /// deleted sentinel.
    pub async fn delete(&self, key: &str, who: &Identity) -> Result<Document, OperationError> {
        let token = self.serializer.acquire(Operation::Delete).await;
        let (mut doc, current) = self.current(&token, key).await?;
        let from = self.authorize(who, key, current.as_deref(), Operation::Delete)?;

        set_state(&mut doc, self.model.workflow().deleted_state());
        self.write(&token, "delete", key, doc.clone()).await?;
        info!(user = %who.username, key, from, "document deleted");
        Ok(doc)
    }

    /// Move a document to `target`. Needs `Assign` at the current state and
    /// a permitted transition.
    pub async fn assign(
        &self,
        key: &str,
        target: &str,
        who: &Identity,
    ) -> Result<Document, OperationError> {
        if target.trim().is_empty() {
            return Err(OperationError::BadInput("target state is blank".to_string()));
        }

        let token = self.serializer.acquire(Operation::Assign).await;
        let (mut doc, current) = self.current(&token, key).await?;
        let from = self.authorize(who, key, current.as_deref(), Operation::Assign)?;
        if !self.model.can_assign(&who.roles, from, target) {
            warn!(user = %who.username, key, from, to = target, "transition denied");
            return Err(OperationError::Forbidden(format!(
                "'{}' may not move '{key}' from '{from}' to '{target}'",
                who.username
            )));
        }

        set_state(&mut doc, target);
        self.write(&token, "assign", key, doc.clone()).await?;
        info!(user = %who.username, key, from, state = target, "document assigned");
        Ok(doc)
    }

    /// All keys, sorted; or only those whose document is in `state`.
    pub async fn keys(&self, state: Option<&str>) -> Result<Vec<String>, OperationError> {
        let Some(state) = state else {
            return self
                .store
                .keys()
                .await
                .map_err(|e| store_failure("list", "*", e));
        };

        let workflow = self.model.workflow();
        if !workflow.is_known_state(state) {
            return Err(OperationError::BadInput(format!("unknown state '{state}'")));
        }
        let default = workflow.default_state();
        let in_state = |doc: &Document| effective_state(doc, default) == Some(state);
        self.store
            .key_filter(&in_state)
            .await
            .map_err(|e| store_failure("list", "*", e))
    }

    async fn exists(&self, action: &'static str, key: &str) -> Result<bool, OperationError> {
        self.store
            .has(key)
            .await
            .map_err(|e| store_failure(action, key, e))
    }

    // ── Token-holding helpers ────────────────────────────────────────────────

    /// Fresh copy of the stored document and the state it is judged at
    /// (`None` for a malformed state field).
    async fn current(
        &self,
        _token: &MutationToken<'_>,
        key: &str,
    ) -> Result<(Document, Option<String>), OperationError> {
        let doc = match self.store.read(key).await {
            Ok(doc) => doc,
            Err(StoreError::NotFound { .. }) => {
                return Err(OperationError::NotFound(key.to_string()))
            }
            Err(e) => return Err(store_failure("read", key, e)),
        };
        let state =
            effective_state(&doc, self.model.workflow().default_state()).map(str::to_string);
        Ok((doc, state))
    }

    async fn write(
        &self,
        _token: &MutationToken<'_>,
        action: &'static str,
        key: &str,
        doc: Document,
    ) -> Result<(), OperationError> {
        self.store
            .update(key, doc)
            .await
            .map_err(|e| store_failure(action, key, e))
    }

    fn authorize<'s>(
        &self,
        who: &Identity,
        key: &str,
        state: Option<&'s str>,
        op: Operation,
    ) -> Result<&'s str, OperationError> {
        match state {
            Some(state) if self.model.is_allowed(&who.roles, state, op) => Ok(state),
            Some(state) => Err(denied(who, key, state, op)),
            None => Err(denied(who, key, "<malformed>", op)),
        }
    }
}

fn already_exists(key: &str) -> OperationError {
    OperationError::Conflict(format!("'{key}' already exists"))
}

fn denied(who: &Identity, key: &str, state: &str, op: Operation) -> OperationError {
    warn!(user = %who.username, key, state, operation = %op, "operation denied");
    OperationError::Forbidden(format!(
        "'{}' may not {op} '{key}' in state '{state}'",
        who.username
    ))
}

fn store_failure(action: &'static str, key: &str, e: StoreError) -> OperationError {
    match &e {
        StoreError::Backend(_) => error!(action, key, error = %e, "store failure"),
        _ => warn!(action, key, error = %e, "store rejected request"),
    }
    e.into()
}
