// crates/db/src/queries/mod.rs
// Entity reads and writes for the AgencyDesk SQLite database.

pub(crate) mod row;

mod approvals;
mod blog;
mod clients;
mod dashboard;
mod invoices;
mod leads;
mod messaging;
mod profiles;
mod projects;
mod reports;
mod tasks;

pub use approvals::*;
pub use blog::*;
pub use clients::*;
pub use dashboard::*;
pub use invoices::*;
pub use leads::*;
pub use messaging::*;
pub use profiles::*;
pub use projects::*;
pub use reports::*;
pub use tasks::*;
