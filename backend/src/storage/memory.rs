//! In-memory storage backends, used by tests and the `memory` storage mode.
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::Revision;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::traits::{is_conflict, next_revision, DocumentStore, ReplaceOutcome, StateStore, StoredState};

/// State store backed by a mutex-guarded map; the lock makes check-then-write atomic
#[derive(Clone, Default)]
pub struct InMemoryStateStore {
    rows: Arc<Mutex<HashMap<String, StoredState>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get_state(&self, user_id: &str) -> Result<Option<StoredState>> {
        let rows = self.rows.lock().map_err(|_| anyhow!("state store lock poisoned"))?;
        Ok(rows.get(user_id).cloned())
    }

    async fn replace_state(
        &self,
        user_id: &str,
        state_json: &str,
        expected: Option<Revision>,
        force: bool,
        now_millis: i64,
    ) -> Result<ReplaceOutcome> {
        let mut rows = self.rows.lock().map_err(|_| anyhow!("state store lock poisoned"))?;
        let current = rows.get(user_id).map(|row| row.updated_at);

        if is_conflict(current, expected, force) {
            if let Some(current) = current {
                return Ok(ReplaceOutcome::Conflict { current });
            }
        }

        let revision = next_revision(current, now_millis);
        rows.insert(
            user_id.to_string(),
            StoredState {
                state_json: state_json.to_string(),
                updated_at: revision,
            },
        );
        Ok(ReplaceOutcome::Stored(revision))
    }
}

/// Document store kept in memory. `fail_saves` simulates a full or unavailable store.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    slot: Arc<Mutex<Option<String>>>,
    fail_saves: Arc<Mutex<bool>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(json: &str) -> Self {
        let store = Self::default();
        if let Ok(mut slot) = store.slot.lock() {
            *slot = Some(json.to_string());
        }
        store
    }

    pub fn set_fail_saves(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_saves.lock() {
            *flag = fail;
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn load(&self) -> Result<Option<String>> {
        let slot = self.slot.lock().map_err(|_| anyhow!("document store lock poisoned"))?;
        Ok(slot.clone())
    }

    fn save(&self, json: &str) -> Result<()> {
        let failing = *self.fail_saves.lock().map_err(|_| anyhow!("document store lock poisoned"))?;
        if failing {
            return Err(anyhow!("document store quota exceeded"));
        }
        let mut slot = self.slot.lock().map_err(|_| anyhow!("document store lock poisoned"))?;
        *slot = Some(json.to_string());
        Ok(())
    }

    fn wipe(&self) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|_| anyhow!("document store lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}
