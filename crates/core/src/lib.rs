// crates/core/src/lib.rs
pub mod error;
pub mod messaging;
pub mod paths;
pub mod slug;
pub mod storage;

pub use error::*;
pub use messaging::*;
pub use slug::slugify;
pub use storage::*;
