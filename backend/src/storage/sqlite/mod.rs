//! # SQLite Storage Module
//!
//! sqlx-backed implementation of the [`StateStore`](crate::storage::StateStore)
//! used by the sync server.

pub mod connection;
pub mod state_repository;

pub use connection::DbConnection;
pub use state_repository::StateRepository;
