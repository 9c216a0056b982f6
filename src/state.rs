use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::{
    application::{creation::CreationService, lifecycle::LifecycleEngine},
    config::{AppConfig, StoreBackend},
    domain::clock::{Clock, SystemClock},
    infrastructure::{
        KvBackend,
        memory_kv::{InMemoryKv, spawn_sweeper},
        paste_store::PasteStore,
        rest_kv::{RestKv, UnconfiguredKv},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub store: PasteStore,
    pub creation: CreationService,
    pub lifecycle: LifecycleEngine,
    pub clock: Arc<dyn Clock>,
    pub test_mode: bool,
    pub public_base_url: Option<String>,
}

impl AppState {
    pub fn new(store: PasteStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            creation: CreationService::new(store.clone()),
            lifecycle: LifecycleEngine::new(store.clone()),
            store,
            clock,
            test_mode: false,
            public_base_url: None,
        }
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn with_public_base_url(mut self, base_url: Option<String>) -> Self {
        self.public_base_url = base_url;
        self
    }

    /// Wires the configured KV backend. Must run inside a tokio runtime: the
    /// in-memory backend starts its expiry sweeper here.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let backend: Arc<dyn KvBackend> = match config.store {
            StoreBackend::Memory => {
                let kv = Arc::new(InMemoryKv::new());
                spawn_sweeper(kv.clone(), config.sweep_interval);
                kv
            }
            StoreBackend::Rest => match (&config.kv_rest_url, &config.kv_rest_token) {
                (Some(url), Some(token)) => Arc::new(RestKv::new(url, token, config.kv_timeout)?),
                _ => {
                    warn!("KV_REST_API_URL / KV_REST_API_TOKEN missing; store calls will fail");
                    Arc::new(UnconfiguredKv)
                }
            },
        };

        Ok(Self::new(PasteStore::new(backend), Arc::new(SystemClock))
            .with_test_mode(config.test_mode)
            .with_public_base_url(config.public_base_url.clone()))
    }
}
