// crates/server/src/lib.rs
//! AgencyDesk server library.
//!
//! Serves the JSON API over the data-access façade, the SSE change streams,
//! uploaded objects under `/storage`, and Prometheus metrics at `/metrics`.

pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::*;
pub use metrics::{init_metrics, render_metrics};
pub use routes::api_routes;
pub use state::AppState;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agencydesk_core::LocalObjectStore;
use agencydesk_db::Database;
use agencydesk_observability::{propagate_request_id_layer, set_request_id_layer, trace_layer};
use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

/// Create the app with a filesystem store rooted at `storage_root`.
///
/// Object URLs are relative (`/storage/<bucket>/<key>`). Used by tests and
/// anything embedding the router without a public host.
pub fn create_app(db: Database, storage_root: &Path) -> Router {
    let store = Arc::new(LocalObjectStore::new(storage_root, ""));
    create_app_full(AppState::new(db, store), Some(storage_root.to_path_buf()))
}

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes under `/api` and `/metrics`
/// - Static serving of stored objects under `/storage` (when `storage_root` is set)
/// - Request metrics, a request-body size cap, CORS
/// - Request ids and request tracing
pub fn create_app_full(state: Arc<AppState>, storage_root: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.max_upload_bytes;

    let mut app = api_routes(state);
    if let Some(root) = storage_root {
        app = app.nest_service("/storage", ServeDir::new(root));
    }

    app.layer(middleware::from_fn(metrics::track_requests))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(propagate_request_id_layer())
        .layer(trace_layer())
        .layer(set_request_id_layer())
}
