use std::future::Future;

use super::{make_document, TestResult};
use crate::DocumentStore;

pub(super) async fn run_basic_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "basic",
        "empty_store_has_no_keys",
        empty_store_has_no_keys(factory).await,
    ));
    results.push(TestResult::from_result(
        "basic",
        "create_then_read_roundtrips",
        create_then_read_roundtrips(factory).await,
    ));
    results.push(TestResult::from_result(
        "basic",
        "create_makes_key_visible_to_has",
        create_makes_key_visible_to_has(factory).await,
    ));
    results.push(TestResult::from_result(
        "basic",
        "update_replaces_document",
        update_replaces_document(factory).await,
    ));
    results.push(TestResult::from_result(
        "basic",
        "delete_removes_document",
        delete_removes_document(factory).await,
    ));
    results.push(TestResult::from_result(
        "basic",
        "keys_are_sorted",
        keys_are_sorted(factory).await,
    ));

    results
}

// ── 1. A fresh store is empty ─────────────────────────────────────────────────

async fn empty_store_has_no_keys<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let keys = s.keys().await.map_err(|e| format!("keys: {e}"))?;
    if !keys.is_empty() {
        return Err(format!("expected no keys, got {:?}", keys));
    }
    if s.has("anything").await.map_err(|e| format!("has: {e}"))? {
        return Err("has() true on empty store".to_string());
    }
    Ok(())
}

// ── 2. Created document reads back unchanged ──────────────────────────────────

async fn create_then_read_roundtrips<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = make_document("created", "First");
    s.create("doc-1", doc.clone())
        .await
        .map_err(|e| format!("create: {e}"))?;
    let read = s.read("doc-1").await.map_err(|e| format!("read: {e}"))?;
    if read != doc {
        return Err(format!("read back {:?}, expected {:?}", read, doc));
    }
    Ok(())
}

// ── 3. has() reflects create ──────────────────────────────────────────────────

async fn create_makes_key_visible_to_has<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create("doc-1", make_document("created", "First"))
        .await
        .map_err(|e| format!("create: {e}"))?;
    if !s.has("doc-1").await.map_err(|e| format!("has: {e}"))? {
        return Err("has(doc-1) false after create".to_string());
    }
    if s.has("doc-2").await.map_err(|e| format!("has: {e}"))? {
        return Err("has(doc-2) true but never created".to_string());
    }
    Ok(())
}

// ── 4. update replaces the whole document ─────────────────────────────────────

async fn update_replaces_document<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create("doc-1", make_document("created", "First"))
        .await
        .map_err(|e| format!("create: {e}"))?;
    let replacement = make_document("review", "Second");
    s.update("doc-1", replacement.clone())
        .await
        .map_err(|e| format!("update: {e}"))?;
    let read = s.read("doc-1").await.map_err(|e| format!("read: {e}"))?;
    if read != replacement {
        return Err(format!("read back {:?} after update", read));
    }
    Ok(())
}

// ── 5. delete removes the document and its key ────────────────────────────────

async fn delete_removes_document<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create("doc-1", make_document("created", "First"))
        .await
        .map_err(|e| format!("create: {e}"))?;
    s.delete("doc-1").await.map_err(|e| format!("delete: {e}"))?;
    if s.has("doc-1").await.map_err(|e| format!("has: {e}"))? {
        return Err("has(doc-1) true after delete".to_string());
    }
    let keys = s.keys().await.map_err(|e| format!("keys: {e}"))?;
    if !keys.is_empty() {
        return Err(format!("keys after delete: {:?}", keys));
    }
    Ok(())
}

// ── 6. keys() is sorted regardless of insertion order ─────────────────────────

async fn keys_are_sorted<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for key in ["charlie", "alpha", "bravo"] {
        s.create(key, make_document("created", key))
            .await
            .map_err(|e| format!("create {key}: {e}"))?;
    }
    let keys = s.keys().await.map_err(|e| format!("keys: {e}"))?;
    if keys != ["alpha", "bravo", "charlie"] {
        return Err(format!("expected sorted keys, got {:?}", keys));
    }
    Ok(())
}
