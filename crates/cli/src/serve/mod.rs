//! `andor serve` -- HTTP request layer over the configured document
//! collections.
//!
//! Maps HTTP requests onto [`Orchestrator`] calls using `axum` + `tokio`.
//! Each collection gets its own store and orchestrator; all of them share
//! the model, the users and a single [`MutationSerializer`].
//! Identity comes from the `X-Remote-User` header, set by an authenticating
//! proxy in front of this server, and is resolved through the user
//! directory.
//!
//! Endpoints (`{c}` is each configured collection):
//! - GET  /health                    - Server status (no identity required)
//! - GET  /{c}/access/               - Caller's user record and grants
//! - GET  /{c}/keys/                 - All keys
//! - GET  /{c}/keys/state/{state}    - Keys of documents in a state
//! - POST /{c}/create/{key}          - Create from a JSON body
//! - GET  /{c}/read/{keys}           - Read comma-separated keys
//! - POST /{c}/update/{key}          - Replace from a JSON body
//! - POST /{c}/delete/{key}          - Soft delete
//! - POST /{c}/assign/{key}/{state}  - Move to another state
//!
//! Unmatched paths fall through to static files under `htdocs` when one is
//! configured. All API responses use Content-Type: application/json.

mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use andor_core::{AccessModel, UserDirectory};
use andor_engine::{MutationSerializer, OperationError, Orchestrator};
use andor_storage::{DirectoryStore, DocumentStore, MemoryStore};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use self::handlers::{
    handle_access, handle_assign, handle_create, handle_delete, handle_health, handle_keys,
    handle_keys_in_state, handle_not_found, handle_read, handle_update,
};
use self::middleware::identity_middleware;
use self::state::{AppState, CollectionState};
use crate::config::{ServiceConfig, ServiceConfigError};

/// Maximum request body size: 10 MB.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Map an orchestrator failure onto its HTTP status.
fn operation_error(e: OperationError) -> Response {
    let status = match &e {
        OperationError::BadInput(_) => StatusCode::BAD_REQUEST,
        OperationError::Forbidden(_) => StatusCode::FORBIDDEN,
        OperationError::NotFound(_) => StatusCode::NOT_FOUND,
        OperationError::Conflict(_) => StatusCode::CONFLICT,
        OperationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, &e.to_string()).into_response()
}

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer, ServiceConfigError> {
    let allow = match origin {
        None | Some("*") => AllowOrigin::any(),
        Some(o) => AllowOrigin::exact(
            HeaderValue::from_str(o)
                .map_err(|_| ServiceConfigError::InvalidCorsOrigin(o.to_string()))?,
        ),
    };
    Ok(CorsLayer::new()
        .allow_origin(allow)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any))
}

/// One collection's routes, behind the identity middleware.
fn collection_routes(state: Arc<CollectionState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/access/", get(handle_access))
        .route("/keys/", get(handle_keys))
        .route("/keys/state/{state}", get(handle_keys_in_state))
        .route("/create/{key}", post(handle_create))
        .route("/read/{keys}", get(handle_read))
        .route("/update/{key}", post(handle_update))
        .route("/delete/{key}", post(handle_delete))
        .route("/assign/{key}/{state}", post(handle_assign))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ))
        .with_state(state)
}

/// Assemble the router: each collection nested at `/{name}`, `/health`
/// outside them, static files (or a JSON 404) as the fallback.
fn build_router(
    collections: Vec<Arc<CollectionState>>,
    config: &ServiceConfig,
) -> Result<Router, ServiceConfigError> {
    let state = Arc::new(AppState {
        collections: collections.iter().map(|c| c.name.clone()).collect(),
    });
    let mut app = Router::new().route("/health", get(handle_health));
    for collection in collections {
        let path = format!("/{}", collection.name);
        app = app.nest(&path, collection_routes(collection));
    }
    let app = match &config.htdocs {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app.fallback(handle_not_found),
    };

    Ok(app
        .layer(cors_layer(config.cors_origin.as_deref())?)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state))
}

/// Load the model, users and one store per collection named by `config`,
/// then serve until Ctrl+C.
///
/// When TLS cert/key paths are configured, the server listens over HTTPS
/// using `axum-server` with rustls (requires the `tls` feature).
pub(crate) async fn start_server(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let model = Arc::new(AccessModel::load(&config.model)?);
    let users = Arc::new(UserDirectory::load(&config.users, &model)?);
    let serializer = Arc::new(MutationSerializer::new());
    info!(
        workflow = model.workflow().name(),
        states = model.workflow().states().len(),
        users = users.len(),
        collections = config.collections.len(),
        "loaded configuration"
    );

    let mut collections = Vec::with_capacity(config.collections.len());
    for name in &config.collections {
        let store: Arc<dyn DocumentStore> = match config.store_dir_for(name) {
            Some(dir) => Arc::new(DirectoryStore::open(dir).await?),
            None => Arc::new(MemoryStore::new()),
        };
        info!(
            collection = %name,
            store = if config.store_dir.is_some() { "directory" } else { "memory" },
            "mounting collection"
        );
        collections.push(Arc::new(CollectionState {
            name: name.clone(),
            orchestrator: Orchestrator::new(model.clone(), store, serializer.clone()),
            users: users.clone(),
        }));
    }
    let app = build_router(collections, &config)?;
    let addr = config.bind_addr();

    #[cfg(feature = "tls")]
    if let (Some(cert_path), Some(key_path)) = (&config.tls_cert, &config.tls_key) {
        let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;
        let socket_addr: std::net::SocketAddr = addr.parse()?;
        info!(addr = %socket_addr, "listening (https)");
        axum_server::bind_rustls(socket_addr, tls)
            .serve(app.into_make_service())
            .await?;
        return Ok(());
    }
    #[cfg(not(feature = "tls"))]
    if config.tls_cert.is_some() {
        return Err("tls_cert is set but andor was built without the `tls` feature".into());
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(e) => {
            tracing::error!(error = %e, "could not install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
