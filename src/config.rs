use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, Result, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Rest,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Enables the `x-test-now-ms` clock override. Never on in production.
    pub test_mode: bool,
    pub store: StoreBackend,
    pub kv_rest_url: Option<String>,
    pub kv_rest_token: Option<String>,
    pub kv_timeout: Duration,
    pub public_base_url: Option<String>,
    pub sweep_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env_string = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let env_optional = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = env_string("BURNPASTE_BIND_ADDR", "127.0.0.1:3000")
            .parse::<SocketAddr>()
            .context("BURNPASTE_BIND_ADDR must be a valid host:port")?;

        let test_mode = env_string("TEST_MODE", "0") == "1";

        let kv_rest_url = env_optional("KV_REST_API_URL");
        let kv_rest_token = env_optional("KV_REST_API_TOKEN");

        let store = match env_optional("BURNPASTE_STORE").as_deref() {
            Some("memory") => StoreBackend::Memory,
            Some("rest") => StoreBackend::Rest,
            Some(other) => bail!("BURNPASTE_STORE must be 'memory' or 'rest', got '{other}'"),
            None if kv_rest_url.is_some() => StoreBackend::Rest,
            None => StoreBackend::Memory,
        };

        let kv_timeout = env_string("BURNPASTE_KV_TIMEOUT_SECS", "5")
            .parse::<u64>()
            .map(Duration::from_secs)
            .context("BURNPASTE_KV_TIMEOUT_SECS must be u64")?;

        let sweep_interval = env_string("BURNPASTE_SWEEP_INTERVAL_SECS", "30")
            .parse::<u64>()
            .context("BURNPASTE_SWEEP_INTERVAL_SECS must be u64")?;
        if sweep_interval == 0 {
            bail!("BURNPASTE_SWEEP_INTERVAL_SECS must be greater than 0");
        }

        Ok(Self {
            bind_addr,
            test_mode,
            store,
            kv_rest_url,
            kv_rest_token,
            kv_timeout,
            public_base_url: env_optional("PUBLIC_BASE_URL"),
            sweep_interval: Duration::from_secs(sweep_interval),
        })
    }
}
