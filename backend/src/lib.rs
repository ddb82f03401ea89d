//! # Bill Tracker Backend
//!
//! Contains all non-UI logic for the bill tracker.
//!
//! - **Domain**: bills, payment marks, month derivation, insights, exports
//!   and the document sync rules
//! - **Storage**: SQLite and in-memory stores for synced documents, file and
//!   in-memory stores for the local document
//! - **IO**: the REST API that exposes document sync to the browser
//!
//! ## Architecture
//!
//! ```text
//! Browser UI
//!     ↓
//! IO Layer (REST API, identity middleware)
//!     ↓
//! Domain Layer (tracker controller, sync service, pure derivation)
//!     ↓
//! Storage Layer (SQLite, memory, files)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    middleware, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::config::{ServerConfig, StorageKind};
use crate::domain::{SharedClock, SyncService, SystemClock};
use crate::storage::{DbConnection, InMemoryStateStore, StateRepository, StateStore};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub sync_service: SyncService,
}

impl AppState {
    pub fn new(sync_service: SyncService) -> Self {
        Self { sync_service }
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &ServerConfig) -> Result<AppState> {
    let store: Arc<dyn StateStore> = match config.storage {
        StorageKind::Sqlite => {
            info!("Setting up database at {}", config.database_url);
            let db = DbConnection::new(&config.database_url)
                .await
                .with_context(|| format!("Failed to open database {}", config.database_url))?;
            Arc::new(StateRepository::new(db))
        }
        StorageKind::Memory => {
            info!("Using in-memory state store; documents are lost on restart");
            Arc::new(InMemoryStateStore::new())
        }
    };

    info!("Setting up application state");
    let clock: SharedClock = Arc::new(SystemClock);
    Ok(AppState::new(SyncService::new(store, clock)))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, config: &ServerConfig) -> Router {
    // CORS setup to allow the frontend to make requests
    let cors = match config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(origin),
        Err(_) => {
            tracing::warn!("Ignoring invalid CORS origin '{}'", config.cors_origin);
            CorsLayer::new()
        }
    }
    .allow_methods([Method::GET, Method::PUT])
    .allow_headers(Any)
    .expose_headers([axum::http::header::ETAG]);

    // Everything under /api except the health check needs identity,
    // unknown paths included.
    let api_routes = io::rest::state_apis::router()
        .fallback(io::not_found)
        .layer(middleware::from_fn(io::rest::identity::require_identity))
        .merge(io::rest::health_apis::router());

    let router = Router::new().nest("/api", api_routes).with_state(app_state);

    let router = match &config.static_dir {
        Some(dir) => {
            info!("Serving static files from {:?}", dir);
            router.fallback_service(ServeDir::new(dir))
        }
        None => router.fallback(io::not_found),
    };

    router.layer(cors)
}
