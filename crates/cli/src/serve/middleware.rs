//! HTTP middleware: caller identity.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::state::CollectionState;

/// Header carrying the username, set by the authenticating proxy in front
/// of the server.
pub(crate) const REMOTE_USER_HEADER: &str = "x-remote-user";

/// Resolve the caller named in `X-Remote-User` and attach their
/// [`Identity`](andor_core::Identity) to the request.
///
/// A missing header or a user absent from the directory is rejected with
/// 401 before any handler runs.
pub(crate) async fn identity_middleware(
    State(state): State<Arc<CollectionState>>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let username = request
        .headers()
        .get(REMOTE_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    let Some(username) = username else {
        return super::json_error(StatusCode::UNAUTHORIZED, "authentication required")
            .into_response();
    };

    match state.users.resolve(&username) {
        Some(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        None => {
            tracing::warn!(user = %username, collection = %state.name, "unknown user");
            super::json_error(StatusCode::UNAUTHORIZED, "unknown user").into_response()
        }
    }
}
