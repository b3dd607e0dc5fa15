use std::future::Future;
use std::sync::Arc;

use super::{make_document, TestResult};
use crate::{DocumentStore, StoreError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_creates_same_key_exactly_one_wins",
        concurrent_creates_same_key_exactly_one_wins(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_creates_different_keys_all_succeed",
        concurrent_creates_different_keys_all_succeed(factory).await,
    ));

    results
}

// ── Same key: exactly one wins ────────────────────────────────────────────────

/// N tasks race to create the same key. Each single-document call is atomic,
/// so exactly one succeeds and every other task sees AlreadyExists.
async fn concurrent_creates_same_key_exactly_one_wins<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.create("contested", make_document("created", &format!("writer-{i}")))
                .await
        }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.map_err(|e| format!("join: {e}"))? {
            Ok(()) => successes += 1,
            Err(StoreError::AlreadyExists { .. }) => conflicts += 1,
            Err(e) => return Err(format!("unexpected error: {e}")),
        }
    }

    if successes != 1 {
        return Err(format!("expected exactly 1 success, got {successes}"));
    }
    if conflicts != N - 1 {
        return Err(format!("expected {} AlreadyExists, got {conflicts}", N - 1));
    }
    Ok(())
}

// ── Distinct keys: all succeed ────────────────────────────────────────────────

async fn concurrent_creates_different_keys_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            let key = format!("doc-{i:02}");
            s.create(&key, make_document("created", &key)).await
        }));
    }

    for handle in handles {
        handle
            .await
            .map_err(|e| format!("join: {e}"))?
            .map_err(|e| format!("create: {e}"))?;
    }

    let keys = store.keys().await.map_err(|e| format!("keys: {e}"))?;
    let expected: Vec<String> = (0..N).map(|i| format!("doc-{i:02}")).collect();
    if keys != expected {
        return Err(format!("expected {:?}, got {:?}", expected, keys));
    }
    Ok(())
}
