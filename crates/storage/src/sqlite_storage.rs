//! SQLite storage backend.
//!
//! Pathways are stored as JSON documents; progress lives in a
//! `user_progress` table keyed by `(user_id, pathway_id)`. A conditional
//! write and the read of the conflicting value run in one transaction; the
//! write statement takes SQLite's write lock, so no other writer can commit
//! between them.

use std::str::FromStr;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pathway_core::{Pathway, PathwayId, ProgressRecord, UserId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::debug;

use super::trait_::{CasOutcome, PathwayStore, Result, StorageError};

const PROGRESS_COLUMNS: &str = "user_id, pathway_id, completed_steps, created_at, updated_at";

/// SQLite storage implementation.
#[derive(Clone)]
pub struct SqliteStorage {
    /// Database connection pool
    pool: sqlx::SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a database, e.g. `sqlite://pathways.db`.
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(db_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Create an in-memory database for testing.
    ///
    /// The pool is capped at one connection since every in-memory
    /// connection would otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS pathways (
                id TEXT PRIMARY KEY,
                slug TEXT NOT NULL UNIQUE,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_progress (
                user_id TEXT NOT NULL,
                pathway_id TEXT NOT NULL,
                completed_steps INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, pathway_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    fn pathway_from_row(row: &SqliteRow) -> Result<Pathway> {
        let data: String = row.try_get("data").map_err(db_err)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn progress_from_row(row: &SqliteRow) -> Result<ProgressRecord> {
        let user_id: String = row.try_get("user_id").map_err(db_err)?;
        let pathway_id: String = row.try_get("pathway_id").map_err(db_err)?;
        let completed_steps: i64 = row.try_get("completed_steps").map_err(db_err)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(db_err)?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(db_err)?;

        Ok(ProgressRecord {
            user_id: UserId::new(user_id).map_err(|e| StorageError::Other(e.to_string()))?,
            pathway_id: pathway_id
                .parse()
                .map_err(|e: pathway_core::IdError| StorageError::Other(e.to_string()))?,
            completed_steps: u32::try_from(completed_steps)
                .map_err(|e| StorageError::Other(e.to_string()))?,
            created_at,
            updated_at,
        })
    }
}

#[async_trait]
impl PathwayStore for SqliteStorage {
    async fn save_pathway(&self, pathway: &Pathway) -> Result<()> {
        let data = serde_json::to_string(pathway)?;

        sqlx::query(
            "INSERT INTO pathways (id, slug, data, created_at) VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET slug = excluded.slug, data = excluded.data",
        )
        .bind(pathway.id.to_string())
        .bind(&pathway.slug)
        .bind(data)
        .bind(pathway.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn load_pathway(&self, id: PathwayId) -> Result<Option<Pathway>> {
        let row = sqlx::query("SELECT data FROM pathways WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(Self::pathway_from_row).transpose()
    }

    async fn load_pathway_by_slug(&self, slug: &str) -> Result<Option<Pathway>> {
        let row = sqlx::query("SELECT data FROM pathways WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(Self::pathway_from_row).transpose()
    }

    async fn list_pathways(&self) -> Result<Vec<Pathway>> {
        let rows = sqlx::query("SELECT data FROM pathways ORDER BY created_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(Self::pathway_from_row).collect()
    }

    async fn load_progress(&self, user: &UserId, pathway: PathwayId) -> Result<Option<ProgressRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_id = ? AND pathway_id = ?"
        ))
        .bind(user.as_str())
        .bind(pathway.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(Self::progress_from_row).transpose()
    }

    async fn list_progress(&self, user: &UserId) -> Result<Vec<ProgressRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_id = ?"
        ))
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(Self::progress_from_row).collect()
    }

    async fn upsert_progress(
        &self,
        user: &UserId,
        pathway: PathwayId,
        completed_steps: u32,
    ) -> Result<ProgressRecord> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO user_progress ({PROGRESS_COLUMNS}) VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, pathway_id) DO UPDATE
                SET completed_steps = excluded.completed_steps, updated_at = excluded.updated_at
            RETURNING {PROGRESS_COLUMNS}"
        ))
        .bind(user.as_str())
        .bind(pathway.to_string())
        .bind(i64::from(completed_steps))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        debug!("Stored progress {}/{} = {}", user, pathway, completed_steps);
        Self::progress_from_row(&row)
    }

    async fn compare_and_set_progress(
        &self,
        user: &UserId,
        pathway: PathwayId,
        expected: u32,
        completed_steps: u32,
    ) -> Result<CasOutcome> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let written = if expected == 0 {
            // An absent row counts as zero, so insert-or-update-if-zero.
            sqlx::query(&format!(
                "INSERT INTO user_progress ({PROGRESS_COLUMNS}) VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(user_id, pathway_id) DO UPDATE
                    SET completed_steps = excluded.completed_steps, updated_at = excluded.updated_at
                    WHERE user_progress.completed_steps = 0
                RETURNING {PROGRESS_COLUMNS}"
            ))
            .bind(user.as_str())
            .bind(pathway.to_string())
            .bind(i64::from(completed_steps))
            .bind(now)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
        } else {
            sqlx::query(&format!(
                "UPDATE user_progress SET completed_steps = ?, updated_at = ?
                WHERE user_id = ? AND pathway_id = ? AND completed_steps = ?
                RETURNING {PROGRESS_COLUMNS}"
            ))
            .bind(i64::from(completed_steps))
            .bind(now)
            .bind(user.as_str())
            .bind(pathway.to_string())
            .bind(i64::from(expected))
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
        };

        let outcome = match written {
            Some(row) => {
                debug!("Stored progress {}/{} = {}", user, pathway, completed_steps);
                CasOutcome::Applied(Self::progress_from_row(&row)?)
            }
            None => {
                let actual: Option<i64> = sqlx::query_scalar(
                    "SELECT completed_steps FROM user_progress WHERE user_id = ? AND pathway_id = ?",
                )
                .bind(user.as_str())
                .bind(pathway.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
                let actual = u32::try_from(actual.unwrap_or(0))
                    .map_err(|e| StorageError::Other(e.to_string()))?;
                CasOutcome::Conflict { actual }
            }
        };

        tx.commit().await.map_err(db_err)?;
        Ok(outcome)
    }
}

fn db_err(e: sqlx::Error) -> StorageError {
    StorageError::Other(e.to_string())
}
