// crates/server/src/main.rs
//! AgencyDesk server binary.
//!
//! Opens the database, mounts the API and object storage, then serves until
//! Ctrl-C. An hourly background sweep flags overdue invoices.

use std::sync::Arc;
use std::time::{Duration, Instant};

use agencydesk_core::LocalObjectStore;
use agencydesk_db::Database;
use agencydesk_observability::init_tracing;
use agencydesk_server::{create_app_full, init_metrics, AppState, Config};
use anyhow::Result;
use clap::Parser;

/// How often pending invoices are checked against their due date.
const OVERDUE_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Flag overdue invoices. Failures are logged and retried on the next tick.
async fn run_overdue_sweep(db: &Database) {
    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
    match db.mark_overdue_invoices(&today).await {
        Ok(0) => tracing::debug!("Overdue sweep: nothing to update"),
        Ok(count) => tracing::info!(count, "Overdue sweep complete"),
        Err(e) => tracing::warn!(error = %e, "Overdue sweep failed (non-fatal)"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    let _log_guard = init_tracing(config.log_format, config.log_dir.as_deref())?;
    let startup_start = Instant::now();

    init_metrics();

    eprintln!("\nagencydesk v{}\n", env!("CARGO_PKG_VERSION"));

    // Step 1: Open database
    let db = match &config.db_path {
        Some(path) => Database::new(path).await?,
        None => Database::open_default().await?,
    };

    // Step 2: Object storage
    let storage_root = config.storage_dir()?;
    tokio::fs::create_dir_all(&storage_root).await?;
    let store = Arc::new(LocalObjectStore::new(&storage_root, config.public_url()));

    // Step 3: Build the app
    let state = AppState::with_upload_limit(db.clone(), store, config.max_upload_bytes);
    let app = create_app_full(state, Some(storage_root.clone()));

    // Step 4: Periodic overdue sweep (first tick runs immediately)
    let sweep_db = db.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(OVERDUE_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            run_overdue_sweep(&sweep_db).await;
        }
    });

    // Step 5: Serve
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %addr,
        db = %db.db_path().display(),
        storage = %storage_root.display(),
        startup_ms = startup_start.elapsed().as_millis() as u64,
        "AgencyDesk listening"
    );
    eprintln!("  Ready at {}\n", config.public_url());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
