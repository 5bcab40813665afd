//! API route handlers for the AgencyDesk server.

pub mod approvals;
pub mod blog;
pub mod clients;
pub mod conversations;
pub mod dashboard;
pub mod health;
pub mod invoices;
pub mod leads;
pub mod metrics;
pub mod profiles;
pub mod projects;
pub mod realtime;
pub mod reports;
pub mod storage;
pub mod tasks;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - /api/profiles, /api/clients, /api/projects, /api/tasks, /api/invoices,
///   /api/leads, /api/approvals, /api/reports - resource CRUD
/// - POST /api/tasks/{id}/cycle - Advance a task's status
/// - POST /api/invoices/mark-overdue - Flag pending invoices past due
/// - POST /api/leads/{id}/convert - Turn a lead into a client
/// - POST /api/approvals/upload - Store an asset file and create its approval
/// - POST /api/approvals/{id}/status - Approve or reject with a comment
/// - /api/conversations/... - Messaging, including the SSE message stream
/// - GET  /api/realtime/{table} - SSE stream of raw change events
/// - /api/storage/{bucket} - Object uploads and deletes
/// - /api/blog/... - Public posts and the editor's endpoints
/// - GET  /api/dashboard/admin, GET /api/clients/{id}/overview - Summary numbers
pub fn api_routes(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(health::router())
        .merge(profiles::router())
        .merge(clients::router())
        .merge(projects::router())
        .merge(tasks::router())
        .merge(invoices::router())
        .merge(leads::router())
        .merge(approvals::router())
        .merge(reports::router())
        .merge(conversations::router())
        .merge(realtime::router())
        .merge(storage::router())
        .merge(blog::router())
        .merge(dashboard::router());

    Router::new()
        .nest("/api", api)
        .merge(metrics::router())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agencydesk_core::LocalObjectStore;

    #[tokio::test]
    async fn test_api_routes_creation() {
        let db = agencydesk_db::Database::new_in_memory().await.expect("in-memory DB");
        let tmp = tempfile::tempdir().unwrap();
        let state = AppState::new(db, Arc::new(LocalObjectStore::new(tmp.path(), "http://localhost")));
        // Overlapping routes panic at construction.
        let _router = api_routes(state);
    }
}
