//! Durable collection of cached documents.
//!
//! The whole collection is persisted as one JSON record in a
//! [`KeyValueStore`]. Every mutation rewrites the record before returning,
//! and a failed write rolls the in-memory change back, so the in-memory
//! list and the persisted snapshot never diverge.
//!
//! Loading is forgiving: a missing, unreadable or unparsable record yields
//! an empty cache, and individual entries whose content no longer decodes
//! are dropped.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::codec;
use crate::kv::KeyValueStore;
use crate::models::CachedDocument;

pub struct CacheStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    docs: Vec<CachedDocument>,
}

impl CacheStore {
    /// Read the persisted collection. Never fails.
    pub async fn load(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let docs = match kv.get(&key).await {
            Ok(Some(raw)) => parse_snapshot(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key = %key, error = %e, "failed to read cache, starting empty");
                Vec::new()
            }
        };
        debug!(key = %key, count = docs.len(), "cache loaded");
        Self { kv, key, docs }
    }

    /// Append a document and persist the updated collection.
    pub async fn add(&mut self, doc: CachedDocument) -> Result<()> {
        self.docs.push(doc);
        if let Err(e) = self.persist().await {
            self.docs.pop();
            return Err(e);
        }
        if let Some(doc) = self.docs.last() {
            info!(name = %doc.name, count = self.docs.len(), "document cached");
        }
        Ok(())
    }

    /// Read a file from disk and cache it under its file name.
    pub async fn add_file(&mut self, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.add(CachedDocument::from_bytes(name, &bytes)).await
    }

    /// Remove the document at `index`. Out of range is a no-op returning `None`.
    pub async fn remove(&mut self, index: usize) -> Result<Option<CachedDocument>> {
        if index >= self.docs.len() {
            return Ok(None);
        }
        let removed = self.docs.remove(index);
        if let Err(e) = self.persist().await {
            self.docs.insert(index, removed);
            return Err(e);
        }
        info!(name = %removed.name, index, "document removed from cache");
        Ok(Some(removed))
    }

    /// Drop every cached document and delete the persisted record.
    pub async fn clear(&mut self) -> Result<()> {
        self.kv
            .delete(&self.key)
            .await
            .with_context(|| format!("Failed to clear cache record '{}'", self.key))?;
        self.docs.clear();
        info!("cache cleared");
        Ok(())
    }

    pub fn list(&self) -> &[CachedDocument] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    async fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.docs)?;
        self.kv
            .set(&self.key, &raw)
            .await
            .with_context(|| format!("Failed to persist cache record '{}'", self.key))
    }
}

fn parse_snapshot(raw: &str) -> Vec<CachedDocument> {
    let docs: Vec<CachedDocument> = match serde_json::from_str(raw) {
        Ok(docs) => docs,
        Err(e) => {
            warn!(error = %e, "cache record is corrupt, starting empty");
            return Vec::new();
        }
    };

    docs.into_iter()
        .filter(|doc| match codec::decode(&doc.content) {
            Ok(_) => true,
            Err(e) => {
                warn!(name = %doc.name, error = %e, "dropping undecodable cache entry");
                false
            }
        })
        .collect()
}
