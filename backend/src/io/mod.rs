//! # IO Module
//!
//! Interface layer between HTTP clients and the domain logic. Translates
//! requests into domain operations and domain results into JSON responses.
//!
//! - **Web Framework**: Axum handlers, one module per resource
//! - **Identity**: access-proxy headers checked by middleware before dispatch
//! - **Error Translation**: every failure becomes a JSON `{ "error": ... }` body

pub mod rest;

pub use rest::*;
