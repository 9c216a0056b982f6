use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::errors::StoreError;

pub mod memory_kv;
pub mod paste_store;
pub mod rest_kv;

pub type KvFields = HashMap<String, String>;

/// Key-value primitives the paste store is built on. Every method is a
/// single store round-trip; implementations must make `hincr_existing`
/// atomic with respect to concurrent callers on the same key.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn hget_all(&self, key: &str) -> Result<Option<KvFields>, StoreError>;
    async fn hset(&self, key: &str, fields: Vec<(String, String)>) -> Result<(), StoreError>;
    /// Adds `delta` to `field` only while `key` exists. `None` means the key
    /// is gone and nothing was written.
    async fn hincr_existing(
        &self,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<i64>, StoreError>;
    async fn expire(&self, key: &str, seconds: u64) -> Result<bool, StoreError>;
    async fn del(&self, key: &str) -> Result<bool, StoreError>;
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
    async fn ping(&self) -> Result<(), StoreError>;
}
