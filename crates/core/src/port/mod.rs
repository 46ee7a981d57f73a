// Port Layer - Interfaces for external collaborators

pub mod document_store;
pub mod id_provider; // For deterministic testing
pub mod roster_store;
pub mod time_provider;

// Re-exports
pub use document_store::{Document, DocumentStore, SnapshotHub, Subscription, TransactFn};
pub use id_provider::IdProvider;
pub use roster_store::RosterStore;
pub use time_provider::TimeProvider;
