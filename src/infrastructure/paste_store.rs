use std::sync::Arc;

use tracing::error;

use super::KvBackend;
use crate::domain::{
    errors::StoreError,
    paste::{Paste, PasteRecord},
};

const RECORD_FIELD: &str = "record";
const VIEW_COUNT_FIELD: &str = "view_count";

/// Typed view of pastes over a [`KvBackend`].
///
/// Each paste lives in one hash at `paste:{id}`: the immutable fields are a
/// JSON document under `record`, and `view_count` is kept as a separate
/// integer field so it can be bumped atomically by the backend.
#[derive(Clone)]
pub struct PasteStore {
    backend: Arc<dyn KvBackend>,
}

impl PasteStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    pub fn key(id: &str) -> String {
        format!("paste:{id}")
    }

    pub async fn get(&self, id: &str) -> Result<Option<Paste>, StoreError> {
        let key = Self::key(id);
        let Some(fields) = self
            .backend
            .hget_all(&key)
            .await
            .inspect_err(|err| error!(paste_id = %id, error = %err, "failed to fetch paste"))?
        else {
            return Ok(None);
        };

        // A hash without a record is a stray counter, not a paste.
        let Some(raw_record) = fields.get(RECORD_FIELD) else {
            return Ok(None);
        };
        let record: PasteRecord = serde_json::from_str(raw_record)
            .map_err(|err| StoreError::corrupt(&key, err.to_string()))?;
        let view_count = match fields.get(VIEW_COUNT_FIELD) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| StoreError::corrupt(&key, "view_count is not a counter"))?,
            None => 0,
        };

        Ok(Some(Paste::from_record(id, record, view_count)))
    }

    /// Writes the full paste. When it carries an expiry, a store-level TTL
    /// of `ceil((expires_at - now) / 1000)` seconds backs up the logical
    /// check done on every read.
    pub async fn put(&self, paste: &Paste, now_ms: i64) -> Result<(), StoreError> {
        let key = Self::key(&paste.id);
        let record = serde_json::to_string(&paste.record())
            .map_err(|err| StoreError::corrupt(&key, err.to_string()))?;

        self.backend
            .hset(
                &key,
                vec![
                    (RECORD_FIELD.to_string(), record),
                    (VIEW_COUNT_FIELD.to_string(), paste.view_count.to_string()),
                ],
            )
            .await
            .inspect_err(|err| {
                error!(paste_id = %paste.id, error = %err, "failed to store paste")
            })?;

        if let Some(ttl_seconds) = paste.expires_at.and_then(|at| store_ttl_seconds(at, now_ms)) {
            self.backend
                .expire(&key, ttl_seconds)
                .await
                .inspect_err(|err| {
                    error!(paste_id = %paste.id, error = %err, "failed to set paste ttl")
                })?;
        }

        Ok(())
    }

    /// Atomically bumps the view counter. `None` means the paste disappeared
    /// before the increment landed.
    pub async fn increment_view_count(&self, id: &str) -> Result<Option<u64>, StoreError> {
        let key = Self::key(id);
        let next = self
            .backend
            .hincr_existing(&key, VIEW_COUNT_FIELD, 1)
            .await
            .inspect_err(|err| error!(paste_id = %id, error = %err, "failed to count view"))?;

        next.map(|count| {
            u64::try_from(count).map_err(|_| StoreError::corrupt(&key, "negative view_count"))
        })
        .transpose()
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.backend
            .del(&Self::key(id))
            .await
            .inspect_err(|err| error!(paste_id = %id, error = %err, "failed to delete paste"))?;
        Ok(())
    }

    pub async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        self.backend
            .exists(&Self::key(id))
            .await
            .inspect_err(|err| error!(paste_id = %id, error = %err, "failed to check paste"))
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.backend
            .ping()
            .await
            .inspect_err(|err| error!(error = %err, "store ping failed"))
    }
}

fn store_ttl_seconds(expires_at: i64, now_ms: i64) -> Option<u64> {
    let remaining_ms = expires_at.checked_sub(now_ms)?;
    if remaining_ms <= 0 {
        return None;
    }
    u64::try_from(remaining_ms).ok().map(|ms| ms.div_ceil(1000))
}
