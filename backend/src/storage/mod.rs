//! # Storage Module
//!
//! Handles all data persistence for the bill tracker.
//!
//! - **traits**: `StateStore` (per-user synced documents with revision
//!   checks) and `DocumentStore` (the local bill document)
//! - **sqlite**: SQLite state store via sqlx
//! - **memory**: in-memory stores for tests and ephemeral servers
//! - **file_document_store**: local document on disk

pub mod traits;
pub mod sqlite;
pub mod memory;
pub mod file_document_store;

pub use traits::{DocumentStore, ReplaceOutcome, StateStore, StoredState};
pub use sqlite::{DbConnection, StateRepository};
pub use memory::{InMemoryDocumentStore, InMemoryStateStore};
pub use file_document_store::FileDocumentStore;
