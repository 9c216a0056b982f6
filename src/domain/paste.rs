use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paste {
    pub id: String,
    pub content: String,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub max_views: Option<u64>,
    pub view_count: u64,
}

impl Paste {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        matches!(self.expires_at, Some(expires_at) if now_ms >= expires_at)
    }

    /// Checked before the view counter moves: a paste sitting at its cap has
    /// nothing left to hand out.
    pub fn is_view_limit_exceeded(&self) -> bool {
        matches!(self.max_views, Some(max_views) if self.view_count >= max_views)
    }

    pub fn record(&self) -> PasteRecord {
        PasteRecord {
            content: self.content.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            max_views: self.max_views,
        }
    }

    pub fn from_record(id: impl Into<String>, record: PasteRecord, view_count: u64) -> Self {
        Self {
            id: id.into(),
            content: record.content,
            created_at: record.created_at,
            expires_at: record.expires_at,
            max_views: record.max_views,
            view_count,
        }
    }
}

/// Immutable part of a paste as serialized into the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasteRecord {
    pub content: String,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub max_views: Option<u64>,
}

/// What a successful view hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteView {
    pub content: String,
    pub remaining_views: Option<u64>,
    pub expires_at: Option<i64>,
}

impl PasteView {
    pub fn expires_at_iso(&self) -> Option<String> {
        self.expires_at.and_then(format_epoch_ms)
    }
}

pub fn remaining_views(max_views: Option<u64>, view_count: u64) -> Option<u64> {
    max_views.map(|max_views| max_views.saturating_sub(view_count))
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn format_epoch_ms(epoch_ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|instant| instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}
