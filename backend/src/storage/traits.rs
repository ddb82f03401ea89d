//! # Storage Traits
//!
//! Abstractions the domain layer persists through, so the sync service and
//! the tracker controller work with any backend (SQLite, in-memory, files).

use anyhow::Result;
use async_trait::async_trait;
use shared::Revision;

/// A synced document as stored for one user
#[derive(Debug, Clone, PartialEq)]
pub struct StoredState {
    pub state_json: String,
    pub updated_at: Revision,
}

/// Result of a conditional replace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// The document was written under this new revision
    Stored(Revision),
    /// The stored revision did not match; nothing was written
    Conflict { current: Revision },
}

/// Keyed store of one JSON document plus revision per user.
///
/// `replace_state` must perform its revision check and write atomically for
/// a given user id.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch the stored document for a user, if any
    async fn get_state(&self, user_id: &str) -> Result<Option<StoredState>>;

    /// Insert or fully replace a user's document.
    ///
    /// Unless `force` is set, a supplied `expected` revision that differs from
    /// the stored one yields [`ReplaceOutcome::Conflict`]. The new revision is
    /// [`next_revision`] of the stored one and `now_millis`.
    async fn replace_state(
        &self,
        user_id: &str,
        state_json: &str,
        expected: Option<Revision>,
        force: bool,
        now_millis: i64,
    ) -> Result<ReplaceOutcome>;
}

/// Single-slot store for the locally persisted bill document
pub trait DocumentStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;

    fn save(&self, json: &str) -> Result<()>;

    fn wipe(&self) -> Result<()>;
}

/// Whether a write against `current` must be rejected
pub fn is_conflict(current: Option<Revision>, expected: Option<Revision>, force: bool) -> bool {
    match (current, expected) {
        (Some(current), Some(expected)) => !force && current != expected,
        _ => false,
    }
}

/// Next revision: the clock reading, bumped past the stored revision when the clock has not advanced
pub fn next_revision(current: Option<Revision>, now_millis: i64) -> Revision {
    match current {
        Some(Revision(current)) if now_millis <= current => Revision(current + 1),
        _ => Revision(now_millis),
    }
}
