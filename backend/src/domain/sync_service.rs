//! Per-user document sync with optimistic concurrency.
//!
//! Each authenticated user owns exactly one stored document. Writers pass the
//! revision they last saw; a mismatch is reported as a conflict carrying the
//! current revision, unless the write is forced.

use serde_json::Value;
use shared::Revision;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::clock::SharedClock;
use crate::storage::{ReplaceOutcome, StateStore};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Conflict")]
    Conflict { current: Revision },
    #[error("{0}")]
    MalformedInput(String),
    #[error("Storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

/// An authenticated caller, as established by the access proxy in front of the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: String,
    pub email: String,
}

/// A stored document and its revision
#[derive(Debug, Clone, PartialEq)]
pub struct SyncedDocument {
    pub state: Value,
    pub updated_at: Revision,
}

#[derive(Clone)]
pub struct SyncService {
    store: Arc<dyn StateStore>,
    clock: SharedClock,
}

impl SyncService {
    pub fn new(store: Arc<dyn StateStore>, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// The user's stored document, or `None` when nothing has been synced yet
    pub async fn fetch(&self, user: &UserIdentity) -> Result<Option<SyncedDocument>, SyncError> {
        let Some(stored) = self.store.get_state(&user.user_id).await? else {
            return Ok(None);
        };

        let state = serde_json::from_str(&stored.state_json).map_err(|e| {
            SyncError::Storage(anyhow::anyhow!(
                "stored document for {} is not valid JSON: {}",
                user.user_id,
                e
            ))
        })?;

        Ok(Some(SyncedDocument {
            state,
            updated_at: stored.updated_at,
        }))
    }

    /// Replace the user's document with `candidate`.
    ///
    /// Returns the new revision, or [`SyncError::Conflict`] when `expected`
    /// does not match the stored revision and `force` is not set. Non-object
    /// candidates are rejected before the store is touched.
    pub async fn replace(
        &self,
        user: &UserIdentity,
        candidate: Value,
        expected: Option<Revision>,
        force: bool,
    ) -> Result<Revision, SyncError> {
        if !candidate.is_object() {
            return Err(SyncError::MalformedInput("Body must be an object".to_string()));
        }
        let state_json = serde_json::to_string(&candidate).map_err(|e| SyncError::Storage(e.into()))?;

        let outcome = self
            .store
            .replace_state(&user.user_id, &state_json, expected, force, self.clock.now_millis())
            .await?;

        match outcome {
            ReplaceOutcome::Stored(revision) => {
                info!("Stored document for {} at revision {}", user.user_id, revision);
                Ok(revision)
            }
            ReplaceOutcome::Conflict { current } => {
                warn!(
                    "Rejected stale write for {}: expected {:?}, current {}",
                    user.user_id, expected, current
                );
                Err(SyncError::Conflict { current })
            }
        }
    }
}
