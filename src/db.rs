pub mod error;
pub mod history_store;
pub mod models;

pub use error::DbError;
pub use history_store::{HistoryStore, PgHistoryStore};
pub use models::*;
