use anyhow::Result;
use async_trait::async_trait;
use shared::Revision;
use sqlx::Row;

use crate::storage::sqlite::connection::DbConnection;
use crate::storage::traits::{ReplaceOutcome, StateStore, StoredState};

/// Repository for per-user synced documents
#[derive(Clone)]
pub struct StateRepository {
    db: DbConnection,
}

impl StateRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    async fn current_revision(&self, user_id: &str) -> Result<Option<Revision>> {
        let row = sqlx::query("SELECT updated_at FROM user_state WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(|r| Revision(r.get("updated_at"))))
    }
}

#[async_trait]
impl StateStore for StateRepository {
    async fn get_state(&self, user_id: &str) -> Result<Option<StoredState>> {
        let row = sqlx::query(
            r#"
            SELECT state_json, updated_at
            FROM user_state
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| StoredState {
            state_json: r.get("state_json"),
            updated_at: Revision(r.get("updated_at")),
        }))
    }

    async fn replace_state(
        &self,
        user_id: &str,
        state_json: &str,
        expected: Option<Revision>,
        force: bool,
        now_millis: i64,
    ) -> Result<ReplaceOutcome> {
        // The revision check and the write happen in one statement, so
        // concurrent writers for the same user cannot interleave.
        let row = sqlx::query(
            r#"
            INSERT INTO user_state (user_id, state_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                state_json = excluded.state_json,
                updated_at = MAX(excluded.updated_at, user_state.updated_at + 1)
            WHERE ?4 = 1 OR ?5 IS NULL OR user_state.updated_at = ?5
            RETURNING updated_at
            "#,
        )
        .bind(user_id)
        .bind(state_json)
        .bind(now_millis)
        .bind(force)
        .bind(expected.map(|r| r.0))
        .fetch_optional(self.db.pool())
        .await?;

        if let Some(row) = row {
            return Ok(ReplaceOutcome::Stored(Revision(row.get("updated_at"))));
        }

        match self.current_revision(user_id).await? {
            Some(current) => Ok(ReplaceOutcome::Conflict { current }),
            None => Err(anyhow::anyhow!(
                "user_state row for {} vanished during conditional write",
                user_id
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test() -> StateRepository {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        StateRepository::new(db)
    }

    #[tokio::test]
    async fn test_get_missing_state() {
        let repo = setup_test().await;
        assert!(repo.get_state("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let repo = setup_test().await;

        let outcome = repo
            .replace_state("alice", r#"{"bills":[]}"#, None, false, 1_000)
            .await
            .unwrap();
        assert_eq!(outcome, ReplaceOutcome::Stored(Revision(1_000)));

        let stored = repo.get_state("alice").await.unwrap().unwrap();
        assert_eq!(stored.state_json, r#"{"bills":[]}"#);
        assert_eq!(stored.updated_at, Revision(1_000));
    }

    #[tokio::test]
    async fn test_matching_revision_replaces() {
        let repo = setup_test().await;
        repo.replace_state("alice", r#"{"v":1}"#, None, false, 1_000).await.unwrap();

        let outcome = repo
            .replace_state("alice", r#"{"v":2}"#, Some(Revision(1_000)), false, 2_000)
            .await
            .unwrap();
        assert_eq!(outcome, ReplaceOutcome::Stored(Revision(2_000)));
        assert_eq!(repo.get_state("alice").await.unwrap().unwrap().state_json, r#"{"v":2}"#);
    }

    #[tokio::test]
    async fn test_stale_revision_conflicts_without_writing() {
        let repo = setup_test().await;
        repo.replace_state("alice", r#"{"v":1}"#, None, false, 1_000).await.unwrap();

        let outcome = repo
            .replace_state("alice", r#"{"v":2}"#, Some(Revision(500)), false, 2_000)
            .await
            .unwrap();
        assert_eq!(outcome, ReplaceOutcome::Conflict { current: Revision(1_000) });

        let stored = repo.get_state("alice").await.unwrap().unwrap();
        assert_eq!(stored.state_json, r#"{"v":1}"#);
        assert_eq!(stored.updated_at, Revision(1_000));
    }

    #[tokio::test]
    async fn test_force_overrides_stale_revision() {
        let repo = setup_test().await;
        repo.replace_state("alice", r#"{"v":1}"#, None, false, 1_000).await.unwrap();

        let outcome = repo
            .replace_state("alice", r#"{"v":2}"#, Some(Revision(500)), true, 2_000)
            .await
            .unwrap();
        assert_eq!(outcome, ReplaceOutcome::Stored(Revision(2_000)));
    }

    #[tokio::test]
    async fn test_revision_advances_within_same_millisecond() {
        let repo = setup_test().await;
        repo.replace_state("alice", "{}", None, false, 1_000).await.unwrap();

        let outcome = repo.replace_state("alice", "{}", None, false, 1_000).await.unwrap();
        assert_eq!(outcome, ReplaceOutcome::Stored(Revision(1_001)));

        let outcome = repo.replace_state("alice", "{}", None, false, 900).await.unwrap();
        assert_eq!(outcome, ReplaceOutcome::Stored(Revision(1_002)));
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let repo = setup_test().await;
        repo.replace_state("alice", r#"{"who":"alice"}"#, None, false, 1_000).await.unwrap();
        repo.replace_state("bob", r#"{"who":"bob"}"#, Some(Revision(3)), false, 1_000).await.unwrap();

        assert_eq!(repo.get_state("alice").await.unwrap().unwrap().state_json, r#"{"who":"alice"}"#);
        assert_eq!(repo.get_state("bob").await.unwrap().unwrap().state_json, r#"{"who":"bob"}"#);
    }
}
