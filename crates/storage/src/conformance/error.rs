use std::future::Future;

use super::{make_document, TestResult};
use crate::{DocumentStore, StoreError};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "error",
        "read_missing_is_not_found",
        read_missing_is_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "update_missing_is_not_found",
        update_missing_is_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "delete_missing_is_not_found",
        delete_missing_is_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "duplicate_create_is_already_exists",
        duplicate_create_is_already_exists(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "invalid_key_is_rejected_on_create",
        invalid_key_is_rejected_on_create(factory).await,
    ));

    results
}

async fn read_missing_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.read("missing").await {
        Err(StoreError::NotFound { key }) if key == "missing" => Ok(()),
        other => Err(format!("expected NotFound, got {:?}", other)),
    }
}

/// An update never creates.
async fn update_missing_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.update("missing", make_document("created", "x")).await {
        Err(StoreError::NotFound { .. }) => {}
        other => return Err(format!("expected NotFound, got {:?}", other)),
    }
    if s.has("missing").await.map_err(|e| format!("has: {e}"))? {
        return Err("update of a missing key created it".to_string());
    }
    Ok(())
}

async fn delete_missing_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.delete("missing").await {
        Err(StoreError::NotFound { .. }) => Ok(()),
        other => Err(format!("expected NotFound, got {:?}", other)),
    }
}

/// A second create must fail and leave the first document untouched.
async fn duplicate_create_is_already_exists<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let first = make_document("created", "First");
    s.create("doc-1", first.clone())
        .await
        .map_err(|e| format!("create: {e}"))?;
    match s.create("doc-1", make_document("review", "Second")).await {
        Err(StoreError::AlreadyExists { key }) if key == "doc-1" => {}
        other => return Err(format!("expected AlreadyExists, got {:?}", other)),
    }
    let read = s.read("doc-1").await.map_err(|e| format!("read: {e}"))?;
    if read != first {
        return Err(format!("duplicate create overwrote document: {:?}", read));
    }
    Ok(())
}

async fn invalid_key_is_rejected_on_create<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for key in ["", "a/b", "a,b", ".hidden"] {
        match s.create(key, make_document("created", "x")).await {
            Err(StoreError::InvalidKey { .. }) => {}
            other => return Err(format!("key {:?}: expected InvalidKey, got {:?}", key, other)),
        }
    }
    let keys = s.keys().await.map_err(|e| format!("keys: {e}"))?;
    if !keys.is_empty() {
        return Err(format!("invalid keys were stored: {:?}", keys));
    }
    Ok(())
}
