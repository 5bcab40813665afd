// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use agencydesk_core::ObjectStore;
use agencydesk_db::Database;

/// Upload size cap when none is configured: 25 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Interval between heartbeat events on open SSE streams.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(15);

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Data-access façade. Also owns the change bus.
    pub db: Database,
    /// Where uploads go. Public URLs returned by the store are served under `/storage`.
    pub storage: Arc<dyn ObjectStore>,
    /// Largest accepted request body for upload routes.
    pub max_upload_bytes: usize,
    /// Heartbeat interval for SSE streams.
    pub heartbeat: Duration,
}

impl AppState {
    pub fn new(db: Database, storage: Arc<dyn ObjectStore>) -> Arc<Self> {
        Self::with_upload_limit(db, storage, DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn with_upload_limit(
        db: Database,
        storage: Arc<dyn ObjectStore>,
        max_upload_bytes: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            db,
            storage,
            max_upload_bytes,
            heartbeat: DEFAULT_HEARTBEAT,
        })
    }

    /// A copy of this state with a different SSE heartbeat interval.
    pub fn with_heartbeat(&self, heartbeat: Duration) -> Arc<Self> {
        Arc::new(Self {
            start_time: self.start_time,
            db: self.db.clone(),
            storage: Arc::clone(&self.storage),
            max_upload_bytes: self.max_upload_bytes,
            heartbeat,
        })
    }

    /// Seconds since the server started.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
