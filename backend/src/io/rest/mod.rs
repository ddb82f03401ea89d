//! # REST API Interface Layer
//!
//! - `GET  /api/health`: public liveness check
//! - `GET  /api/state`: the caller's synced document and its revision
//! - `PUT  /api/state?force=0|1`: replace the document, conditional on `If-Match`
//!
//! Everything under `/api` except the health check requires identity headers.

pub mod errors;
pub mod health_apis;
pub mod identity;
pub mod state_apis;

pub use errors::{json_error, method_not_allowed, not_found};
pub use identity::{identity_from_headers, require_identity};
