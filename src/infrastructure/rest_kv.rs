//! Redis reached over the Upstash / Vercel KV REST protocol.
//!
//! Each command is a `POST` of a JSON array (`["HSET", "key", "f", "v"]`) to
//! the endpoint, authenticated with a bearer token. Replies look like
//! `{"result": ...}` or `{"error": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{KvBackend, KvFields};
use crate::domain::errors::StoreError;

/// Increments a hash field only when the hash already exists, so a racing
/// delete can never leave a counter-only key behind.
const HINCR_EXISTING_SCRIPT: &str = "if redis.call('EXISTS', KEYS[1]) == 1 then \
     return redis.call('HINCRBY', KEYS[1], ARGV[1], ARGV[2]) \
     else return nil end";

pub const NOT_CONFIGURED_MESSAGE: &str = "Redis environment variables not configured";

#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

pub struct RestKv {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl RestKv {
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| StoreError::Misconfigured(err.to_string()))?;

        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    async fn command(&self, args: Value) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await
            .map_err(|err| StoreError::unavailable(err.to_string()))?;

        let status = response.status();
        let reply = response
            .json::<RestReply>()
            .await
            .map_err(|err| StoreError::unavailable(format!("unreadable reply ({status}): {err}")))?;

        if let Some(error) = reply.error {
            return Err(StoreError::unavailable(error));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(StoreError::Misconfigured(
                "KV REST API rejected the token".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(StoreError::unavailable(format!(
                "KV REST API returned {status}"
            )));
        }

        Ok(reply.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl KvBackend for RestKv {
    async fn hget_all(&self, key: &str) -> Result<Option<KvFields>, StoreError> {
        let reply = self.command(json!(["HGETALL", key])).await?;
        fields_from_reply(key, reply)
    }

    async fn hset(&self, key: &str, fields: Vec<(String, String)>) -> Result<(), StoreError> {
        let mut args = vec![json!("HSET"), json!(key)];
        for (field, value) in fields {
            args.push(Value::String(field));
            args.push(Value::String(value));
        }
        self.command(Value::Array(args)).await?;
        Ok(())
    }

    async fn hincr_existing(
        &self,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<i64>, StoreError> {
        let reply = self
            .command(json!([
                "EVAL",
                HINCR_EXISTING_SCRIPT,
                "1",
                key,
                field,
                delta.to_string()
            ]))
            .await?;

        match reply {
            Value::Null => Ok(None),
            other => integer_from_reply(key, &other).map(Some),
        }
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<bool, StoreError> {
        let reply = self.command(json!(["EXPIRE", key, seconds.to_string()])).await?;
        Ok(integer_from_reply(key, &reply)? == 1)
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let reply = self.command(json!(["DEL", key])).await?;
        Ok(integer_from_reply(key, &reply)? > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let reply = self.command(json!(["EXISTS", key])).await?;
        Ok(integer_from_reply(key, &reply)? > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.command(json!(["PING"])).await?;
        Ok(())
    }
}

/// Stand-in used when the REST backend is selected but its URL or token is
/// missing. Every call fails, which surfaces through the health check.
pub struct UnconfiguredKv;

impl UnconfiguredKv {
    fn fail<T>(&self) -> Result<T, StoreError> {
        Err(StoreError::Misconfigured(NOT_CONFIGURED_MESSAGE.to_string()))
    }
}

#[async_trait]
impl KvBackend for UnconfiguredKv {
    async fn hget_all(&self, _key: &str) -> Result<Option<KvFields>, StoreError> {
        self.fail()
    }

    async fn hset(&self, _key: &str, _fields: Vec<(String, String)>) -> Result<(), StoreError> {
        self.fail()
    }

    async fn hincr_existing(
        &self,
        _key: &str,
        _field: &str,
        _delta: i64,
    ) -> Result<Option<i64>, StoreError> {
        self.fail()
    }

    async fn expire(&self, _key: &str, _seconds: u64) -> Result<bool, StoreError> {
        self.fail()
    }

    async fn del(&self, _key: &str) -> Result<bool, StoreError> {
        self.fail()
    }

    async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
        self.fail()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.fail()
    }
}

/// HGETALL replies are flat `[field, value, field, value, ...]` arrays; an
/// empty array means the key does not exist.
fn fields_from_reply(key: &str, reply: Value) -> Result<Option<KvFields>, StoreError> {
    let items = match reply {
        Value::Null => return Ok(None),
        Value::Array(items) => items,
        other => {
            return Err(StoreError::corrupt(
                key,
                format!("expected array from HGETALL, got {other}"),
            ));
        }
    };
    if items.is_empty() {
        return Ok(None);
    }
    if items.len() % 2 != 0 {
        return Err(StoreError::corrupt(key, "odd number of HGETALL items"));
    }

    let mut fields = KvFields::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
        fields.insert(scalar_to_string(key, field)?, scalar_to_string(key, value)?);
    }
    Ok(Some(fields))
}

fn scalar_to_string(key: &str, value: Value) -> Result<String, StoreError> {
    match value {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(StoreError::corrupt(key, format!("unexpected item {other}"))),
    }
}

fn integer_from_reply(key: &str, reply: &Value) -> Result<i64, StoreError> {
    match reply {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| StoreError::corrupt(key, format!("expected integer reply, got {reply}")))
}
