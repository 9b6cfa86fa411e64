//! Local persistence layer for Larder

mod connection;
mod migrations;
mod store;

pub use connection::Database;
pub use store::{LocalStore, ReconcileSummary, SqliteStore};
