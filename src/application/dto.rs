use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{errors::PasteError, paste::PasteView};

pub const CONTENT_REQUIRED_MESSAGE: &str = "content is required and must be a non-empty string";
pub const TTL_SECONDS_INVALID_MESSAGE: &str = "ttl_seconds must be an integer >= 1";
pub const MAX_VIEWS_INVALID_MESSAGE: &str = "max_views must be an integer >= 1";

/// Raw create body. Fields stay loosely typed so that a wrong type gets the
/// same field-specific message as a wrong value. Only a JSON object
/// deserializes; a key that is present keeps its value, `null` included.
#[derive(Debug, Default, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct CreatePasteRequest {
    pub content: Option<Value>,
    pub ttl_seconds: Option<Value>,
    pub max_views: Option<Value>,
}

impl From<Map<String, Value>> for CreatePasteRequest {
    fn from(mut body: Map<String, Value>) -> Self {
        Self {
            content: body.remove("content"),
            ttl_seconds: body.remove("ttl_seconds"),
            max_views: body.remove("max_views"),
        }
    }
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaste {
    pub content: String,
    pub ttl_seconds: Option<u64>,
    pub max_views: Option<u64>,
}

impl CreatePasteRequest {
    pub fn validate(&self) -> Result<NewPaste, PasteError> {
        let content = match &self.content {
            Some(Value::String(content)) if !content.trim().is_empty() => content.clone(),
            _ => return Err(PasteError::validation(CONTENT_REQUIRED_MESSAGE)),
        };

        let ttl_seconds =
            optional_positive_integer(&self.ttl_seconds, TTL_SECONDS_INVALID_MESSAGE)?;
        let max_views = optional_positive_integer(&self.max_views, MAX_VIEWS_INVALID_MESSAGE)?;

        Ok(NewPaste {
            content,
            ttl_seconds,
            max_views,
        })
    }
}

fn optional_positive_integer(
    value: &Option<Value>,
    message: &'static str,
) -> Result<Option<u64>, PasteError> {
    value
        .as_ref()
        .map(|value| positive_integer(value).ok_or_else(|| PasteError::validation(message)))
        .transpose()
}

/// Accepts JSON integers >= 1, including integral floats such as `5.0`.
/// `null` is not an integer.
fn positive_integer(value: &Value) -> Option<u64> {
    if let Some(integer) = value.as_u64() {
        return (integer >= 1).then_some(integer);
    }

    let float = value.as_f64()?;
    if float.fract() == 0.0 && float >= 1.0 && float <= u64::MAX as f64 {
        Some(float as u64)
    } else {
        None
    }
}

#[derive(Debug, Serialize)]
pub struct CreatePasteResponse {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct PasteViewResponse {
    pub content: String,
    pub remaining_views: Option<u64>,
    pub expires_at: Option<String>,
}

impl From<PasteView> for PasteViewResponse {
    fn from(view: PasteView) -> Self {
        let expires_at = view.expires_at_iso();
        Self {
            content: view.content,
            remaining_views: view.remaining_views,
            expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
