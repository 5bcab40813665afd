// crates/db/src/fallback.rs
use crate::DbResult;

/// Degrade a failed list read to an empty list.
///
/// Dashboards render an empty state instead of an error when a list cannot
/// be loaded. The failure is still logged.
pub trait OrEmpty<T> {
    fn or_empty(self, what: &str) -> Vec<T>;
}

impl<T> OrEmpty<T> for DbResult<Vec<T>> {
    fn or_empty(self, what: &str) -> Vec<T> {
        match self {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load {what}, returning empty list");
                Vec::new()
            }
        }
    }
}
