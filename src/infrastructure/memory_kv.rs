use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::{KvBackend, KvFields};
use crate::domain::errors::StoreError;

struct Entry {
    fields: KvFields,
    deadline: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline.is_none_or(|deadline| now < deadline)
    }
}

/// Process-local KV store with per-key expiry.
///
/// Expired keys are invisible immediately and physically removed either by
/// the next write touching them or by [`InMemoryKv::sweep_expired`].
#[derive(Default)]
pub struct InMemoryKv {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys still visible to readers.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every expired key and returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}

/// Periodically evicts expired keys until the runtime shuts down.
pub fn spawn_sweeper(kv: Arc<InMemoryKv>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = kv.sweep_expired().await;
            if removed > 0 {
                debug!(removed, "swept expired keys");
            }
        }
    })
}

#[async_trait]
impl KvBackend for InMemoryKv {
    async fn hget_all(&self, key: &str) -> Result<Option<KvFields>, StoreError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.fields.clone()))
    }

    async fn hset(&self, key: &str, fields: Vec<(String, String)>) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }

        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            fields: KvFields::new(),
            deadline: None,
        });
        entry.fields.extend(fields);
        Ok(())
    }

    async fn hincr_existing(
        &self,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<i64>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let Some(entry) = entries.get_mut(key) else {
            return Ok(None);
        };
        if !entry.is_live(now) {
            entries.remove(key);
            return Ok(None);
        }

        let current = match entry.fields.get(field) {
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                StoreError::corrupt(key, format!("field '{field}' is not an integer"))
            })?,
            None => 0,
        };
        let next = current
            .checked_add(delta)
            .ok_or_else(|| StoreError::corrupt(key, format!("field '{field}' overflowed")))?;
        entry.fields.insert(field.to_string(), next.to_string());

        Ok(Some(next))
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(key) else {
            return Ok(false);
        };
        if !entry.is_live(now) {
            entries.remove(key);
            return Ok(false);
        }

        // An expiry too far out to represent means "never".
        entry.deadline = now.checked_add(Duration::from_secs(seconds));
        Ok(true)
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let removed = self.entries.write().await.remove(key);
        Ok(removed.is_some_and(|entry| entry.is_live(now)))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
