//! SQLite store: one row per user holding the serialized state document.

use async_trait::async_trait;
use careerswarm_core::error::StoreError;
use careerswarm_core::state::SwarmState;
use careerswarm_core::store::SwarmStore;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, error, info};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Unavailable(format!("Failed to create database directory: {e}"))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to open SQLite: {e}")))?;

        let store = Self::from_pool(pool).await?;
        info!("SQLite swarm store initialized at {}", path.display());
        Ok(store)
    }

    /// An ephemeral database. A single connection keeps every query on the
    /// same in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Unavailable(format!("Invalid SQLite options: {e}")))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to open SQLite: {e}")))?;
        Self::from_pool(pool).await
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS swarm_states (
                user_id      TEXT PRIMARY KEY NOT NULL,
                current_week INTEGER NOT NULL,
                state        TEXT NOT NULL,
                updated_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("swarm_states table: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl SwarmStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, user_id: &str) -> Result<Option<SwarmState>, StoreError> {
        let row = sqlx::query("SELECT state FROM swarm_states WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(user_id, error = %e, "Failed to read swarm state");
                StoreError::Unavailable(format!("SELECT failed: {e}"))
            })?;

        let Some(row) = row else {
            return Ok(None);
        };

        let document: String = row
            .try_get("state")
            .map_err(|e| StoreError::Unavailable(format!("state column: {e}")))?;

        serde_json::from_str(&document)
            .map(Some)
            .map_err(|e| StoreError::Corrupted {
                user_id: user_id.to_string(),
                reason: e.to_string(),
            })
    }

    async fn put(&self, user_id: &str, state: &SwarmState) -> Result<(), StoreError> {
        let document =
            serde_json::to_string(state).map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO swarm_states (user_id, current_week, state, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id) DO UPDATE SET
                current_week = excluded.current_week,
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(i64::from(state.current_week))
        .bind(&document)
        .bind(state.last_updated.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(user_id, error = %e, "Failed to write swarm state");
            StoreError::Unavailable(format!("INSERT failed: {e}"))
        })?;

        debug!(user_id, week = state.current_week, "Stored swarm state");
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM swarm_states WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week(n: u32) -> SwarmState {
        let mut state = SwarmState::initial();
        state.current_week = n;
        state
    }

    #[tokio::test]
    async fn upsert_replaces_previous_state() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.put("u1", &week(1)).await.unwrap();

        let second = week(2);
        store.put("u1", &second).await.unwrap();

        assert_eq!(store.get("u1").await.unwrap(), Some(second));
        assert!(store.get("u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_existed() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.put("u1", &week(1)).await.unwrap();
        assert!(store.delete("u1").await.unwrap());
        assert!(!store.delete("u1").await.unwrap());
        assert!(store.get("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("swarm.db");

        let original = week(5);
        {
            let store = SqliteStore::open(&path).await.unwrap();
            store.put("u1", &original).await.unwrap();
            store.pool.close().await;
        }

        let store = SqliteStore::open(&path).await.unwrap();
        assert_eq!(store.get("u1").await.unwrap(), Some(original));
    }

    #[tokio::test]
    async fn corrupted_row_is_reported() {
        let store = SqliteStore::in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO swarm_states (user_id, current_week, state, updated_at) VALUES ('u', 1, 'nope', '')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        assert!(matches!(
            store.get("u").await,
            Err(StoreError::Corrupted { .. })
        ));
    }
}
