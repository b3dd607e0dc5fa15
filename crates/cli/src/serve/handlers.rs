//! Route handlers: health, access, keys, and the document operations.

use std::sync::Arc;

use andor_core::{Document, Identity};
use andor_engine::split_keys;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::{json, Value};

use super::state::{AppState, CollectionState};
use super::{json_error, operation_error};

/// Set on an update response when the requested state change was dropped.
pub(crate) const REJECTED_STATE_HEADER: &str = "x-rejected-state";

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = json!({
        "status": "ok",
        "collections": state.collections,
        "andor_version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// GET /{collection}/access/
///
/// The caller's user record, roles, and the operations they hold at every
/// state.
pub(crate) async fn handle_access(
    State(state): State<Arc<CollectionState>>,
    Extension(who): Extension<Identity>,
) -> impl IntoResponse {
    let model = state.orchestrator.model();
    let grants: Vec<Value> = model
        .grants_by_state(&who.roles)
        .into_iter()
        .map(|(index, grant)| {
            json!({
                "state": grant.state,
                "index": index,
                "operations": grant.operations,
            })
        })
        .collect();
    let create_state = who
        .create_state
        .as_deref()
        .unwrap_or(model.workflow().default_state());

    let response = json!({
        "collection": state.name,
        "user": state.users.get(&who.username),
        "roles": who.roles,
        "create_state": create_state,
        "grants": grants,
    });
    (StatusCode::OK, Json(response))
}

/// GET /{collection}/keys/
pub(crate) async fn handle_keys(State(state): State<Arc<CollectionState>>) -> Response {
    match state.orchestrator.keys(None).await {
        Ok(keys) => Json(keys).into_response(),
        Err(e) => operation_error(e),
    }
}

/// GET /{collection}/keys/state/{state}
pub(crate) async fn handle_keys_in_state(
    State(state): State<Arc<CollectionState>>,
    Path(wanted): Path<String>,
) -> Response {
    match state.orchestrator.keys(Some(&wanted)).await {
        Ok(keys) => Json(keys).into_response(),
        Err(e) => operation_error(e),
    }
}

/// POST /{collection}/create/{key}
pub(crate) async fn handle_create(
    State(state): State<Arc<CollectionState>>,
    Extension(who): Extension<Identity>,
    Path(key): Path<String>,
    body: Bytes,
) -> Response {
    let doc = match parse_document(&body) {
        Ok(doc) => doc,
        Err(response) => return response,
    };
    match state.orchestrator.create(&key, doc, &who).await {
        Ok(doc) => (StatusCode::CREATED, Json(doc)).into_response(),
        Err(e) => operation_error(e),
    }
}

/// GET /{collection}/read/{keys}
///
/// `keys` is comma-separated. A single requested key answers with the
/// document itself; several answer with an array of the readable ones.
pub(crate) async fn handle_read(
    State(state): State<Arc<CollectionState>>,
    Extension(who): Extension<Identity>,
    Path(keys): Path<String>,
) -> Response {
    let wanted = split_keys(&keys);
    match state.orchestrator.read(wanted.as_slice(), &who).await {
        Ok(mut items) if wanted.len() == 1 && items.len() == 1 => {
            Json(items.remove(0).document).into_response()
        }
        Ok(items) => {
            let docs: Vec<Document> = items.into_iter().map(|i| i.document).collect();
            Json(docs).into_response()
        }
        Err(e) => operation_error(e),
    }
}

/// POST /{collection}/update/{key}
pub(crate) async fn handle_update(
    State(state): State<Arc<CollectionState>>,
    Extension(who): Extension<Identity>,
    Path(key): Path<String>,
    body: Bytes,
) -> Response {
    let doc = match parse_document(&body) {
        Ok(doc) => doc,
        Err(response) => return response,
    };
    match state.orchestrator.update(&key, doc, &who).await {
        Ok(report) => {
            let mut headers = HeaderMap::new();
            if let Some(v) = report
                .rejected_state
                .as_deref()
                .and_then(|s| HeaderValue::from_str(s).ok())
            {
                headers.insert(REJECTED_STATE_HEADER, v);
            }
            (StatusCode::OK, headers, Json(report.document)).into_response()
        }
        Err(e) => operation_error(e),
    }
}

/// POST /{collection}/delete/{key}
pub(crate) async fn handle_delete(
    State(state): State<Arc<CollectionState>>,
    Extension(who): Extension<Identity>,
    Path(key): Path<String>,
) -> Response {
    match state.orchestrator.delete(&key, &who).await {
        Ok(doc) => Json(doc).into_response(),
        Err(e) => operation_error(e),
    }
}

/// POST /{collection}/assign/{key}/{state}
pub(crate) async fn handle_assign(
    State(state): State<Arc<CollectionState>>,
    Extension(who): Extension<Identity>,
    Path((key, target)): Path<(String, String)>,
) -> Response {
    match state.orchestrator.assign(&key, &target, &who).await {
        Ok(doc) => Json(doc).into_response(),
        Err(e) => operation_error(e),
    }
}

/// Parse a request body into a document. An empty body is an empty
/// document; anything but a JSON object is a 400.
fn parse_document(body: &[u8]) -> Result<Document, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Document::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(_) => Err(
            json_error(StatusCode::BAD_REQUEST, "document must be a JSON object").into_response(),
        ),
        Err(e) => Err(
            json_error(StatusCode::BAD_REQUEST, &format!("invalid JSON: {}", e)).into_response(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_document_accepts_objects_and_empty_bodies() {
        assert_eq!(parse_document(b"  ").unwrap(), Document::new());
        let doc = parse_document(br#"{"title": "x"}"#).unwrap();
        assert_eq!(doc["title"], "x");
    }

    #[test]
    fn parse_document_rejects_other_json() {
        for body in [&b"[1, 2]"[..], b"\"text\"", b"{not json"] {
            let response = parse_document(body).unwrap_err();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }
}
