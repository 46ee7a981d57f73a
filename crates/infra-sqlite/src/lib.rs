// Queueline Infrastructure - SQLite Adapter
// Implements: DocumentStore (feed and roster documents)

mod connection;
mod document_store;
mod error;
mod migration;

pub use connection::create_pool;
pub use document_store::SqliteDocumentStore;
pub use migration::run_migrations;

// Note: sqlx::Error conversion is handled by map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
