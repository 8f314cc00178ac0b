use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;
use tracing::info;

/// Last-checked timestamps, one per trigger instance.
///
/// Keys come from [`crate::config::TriggerConfig::watermark_key`], scoping a
/// watermark to its (stack, table, trigger field) identity. The store is
/// always injected; there is no process-wide global.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Get the stored watermark. Returns None before the first poll.
    async fn get(&self, key: &str) -> anyhow::Result<Option<DateTime<Utc>>>;

    /// Set the watermark. Creates or overwrites the key.
    async fn set(&self, key: &str, ts: DateTime<Utc>) -> anyhow::Result<()>;
}

/// SQLite-backed watermark store. Timestamps stored as RFC 3339 text.
pub struct SqliteWatermarkStore {
    pool: SqlitePool,
}

impl SqliteWatermarkStore {
    pub async fn new(db_path: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        migrate(&pool).await?;
        info!(db_path, "Watermark store ready");
        Ok(Self { pool })
    }
}

/// Idempotent schema setup, safe to call on every startup.
async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS watermarks (
            key TEXT PRIMARY KEY,
            last_time_checked TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[async_trait]
impl WatermarkStore for SqliteWatermarkStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT last_time_checked FROM watermarks WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("last_time_checked");
                let ts = DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| anyhow::anyhow!("Corrupt watermark for '{}': {}", key, e))?;
                Ok(Some(ts.with_timezone(&Utc)))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, ts: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO watermarks (key, last_time_checked, updated_at) VALUES (?, ?, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET
               last_time_checked = excluded.last_time_checked,
               updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(ts.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// In-memory watermark store for tests and dry runs.
#[derive(Default)]
pub struct MemoryWatermarkStore {
    inner: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
        Ok(self.inner.lock().await.get(key).copied())
    }

    async fn set(&self, key: &str, ts: DateTime<Utc>) -> anyhow::Result<()> {
        self.inner.lock().await.insert(key.to_string(), ts);
        Ok(())
    }
}
