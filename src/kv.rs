//! Key-value persistence for local session state.
//!
//! The [`KeyValueStore`] trait is the only persistence surface the cache
//! depends on, so the on-disk backend can be swapped for an in-memory one
//! in tests or throwaway sessions.
//!
//! | Backend | Durability |
//! |---------|------------|
//! | [`SqliteKvStore`] | survives restarts (WAL-mode SQLite file) |
//! | [`MemoryKvStore`] | process lifetime only |
//!
//! Every `set` replaces the whole record in a single statement, so a
//! reader never observes a partially written value.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::config::CacheConfig;
use crate::{db, migrate};

/// A scoped store of named string records.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a record. `Ok(None)` when the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Create or replace a record.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a record. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Open the backend named by `[cache].backend`.
pub async fn open(config: &CacheConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryKvStore::new())),
        "sqlite" => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| anyhow!("cache.path required for sqlite backend"))?;
            Ok(Arc::new(SqliteKvStore::open(path).await?))
        }
        other => Err(anyhow!("Unknown cache backend: {}", other)),
    }
}

// ============ In-memory ============

/// Process-local store backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryKvStore {
    records: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let records = self.records.read().map_err(|_| anyhow!("kv lock poisoned"))?;
        Ok(records.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("kv lock poisoned"))?;
        records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("kv lock poisoned"))?;
        records.remove(key);
        Ok(())
    }
}

// ============ SQLite ============

/// Durable store kept in a single SQLite table.
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    /// Open (creating if needed) the database file and ensure the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
