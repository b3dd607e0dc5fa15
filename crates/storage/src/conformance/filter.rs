use std::future::Future;

use andor_core::{Document, STATE_FIELD};

use super::{make_document, TestResult};
use crate::DocumentStore;

pub(super) async fn run_filter_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "filter",
        "key_filter_selects_by_state",
        key_filter_selects_by_state(factory).await,
    ));
    results.push(TestResult::from_result(
        "filter",
        "key_filter_sees_updates",
        key_filter_sees_updates(factory).await,
    ));

    results
}

async fn key_filter_selects_by_state<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for (key, state) in [("d", "review"), ("a", "created"), ("c", "review"), ("b", "published")] {
        s.create(key, make_document(state, key))
            .await
            .map_err(|e| format!("create {key}: {e}"))?;
    }
    let in_review = s
        .key_filter(&|doc: &Document| doc.get(STATE_FIELD).and_then(|v| v.as_str()) == Some("review"))
        .await
        .map_err(|e| format!("key_filter: {e}"))?;
    if in_review != ["c", "d"] {
        return Err(format!("expected [c, d], got {:?}", in_review));
    }
    let none = s
        .key_filter(&|_: &Document| false)
        .await
        .map_err(|e| format!("key_filter: {e}"))?;
    if !none.is_empty() {
        return Err(format!("always-false predicate matched {:?}", none));
    }
    Ok(())
}

async fn key_filter_sees_updates<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create("doc-1", make_document("created", "x"))
        .await
        .map_err(|e| format!("create: {e}"))?;
    s.update("doc-1", make_document("deleted", "x"))
        .await
        .map_err(|e| format!("update: {e}"))?;
    let deleted = s
        .key_filter(&|doc: &Document| doc.get(STATE_FIELD).and_then(|v| v.as_str()) == Some("deleted"))
        .await
        .map_err(|e| format!("key_filter: {e}"))?;
    if deleted != ["doc-1"] {
        return Err(format!("expected [doc-1], got {:?}", deleted));
    }
    Ok(())
}
