// crates/server/src/routes/realtime.rs
//! Raw change feed for one table.
//!
//! `GET /api/realtime/{table}` forwards every committed change to that
//! table as a `change` event. Dashboards use it as a "re-fetch now" signal.

use std::convert::Infallible;
use std::sync::Arc;

use agencydesk_db::Notification;
use agencydesk_types::Table;
use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
    Router,
};

use crate::error::ApiResult;
use crate::metrics::SubscriberGauge;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/realtime/{table}", get(table_stream))
}

/// | Event name  | When emitted                                        |
/// |-------------|-----------------------------------------------------|
/// | `change`    | A row in the table was inserted, updated or deleted |
/// | `resync`    | The client fell behind; re-fetch everything         |
/// | `heartbeat` | Every 15 seconds by default                         |
async fn table_stream(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
) -> ApiResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    let table: Table = table.parse()?;
    let mut subscription = state.db.changes().subscribe_table(table);
    let heartbeat_every = state.heartbeat;

    let stream = async_stream::stream! {
        let _open = SubscriberGauge::open();
        let mut heartbeat = tokio::time::interval(heartbeat_every);
        heartbeat.tick().await;
        loop {
            tokio::select! {
                notification = subscription.recv() => {
                    match notification {
                        Some(Notification::Changed(event)) => {
                            yield Ok(Event::default().event("change").data(
                                serde_json::to_string(&event).unwrap_or_default()
                            ));
                        }
                        Some(Notification::Resync { missed }) => {
                            yield Ok(Event::default().event("resync").data(
                                serde_json::json!({ "missed": missed }).to_string()
                            ));
                        }
                        None => break,
                    }
                }
                _ = heartbeat.tick() => {
                    yield Ok(Event::default().event("heartbeat").data("{}"));
                }
            }
        }
    };

    Ok(Sse::new(stream))
}
