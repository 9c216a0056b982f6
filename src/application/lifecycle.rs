use tracing::{debug, warn};

use crate::{
    domain::{
        errors::StoreError,
        paste::{PasteView, remaining_views},
    },
    infrastructure::paste_store::PasteStore,
};

/// Outcome of a single view attempt. Everything but `Live` is reported to
/// clients as the same not-found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewResult {
    Missing,
    Expired,
    ViewLimitExceeded,
    Live(PasteView),
}

impl ViewResult {
    pub fn reason(&self) -> &'static str {
        match self {
            ViewResult::Missing => "missing",
            ViewResult::Expired => "expired",
            ViewResult::ViewLimitExceeded => "view limit exceeded",
            ViewResult::Live(_) => "live",
        }
    }
}

/// Decides, per access, whether a paste is visible, counts the view and
/// removes pastes that are expired or used up.
#[derive(Clone)]
pub struct LifecycleEngine {
    store: PasteStore,
}

impl LifecycleEngine {
    pub fn new(store: PasteStore) -> Self {
        Self { store }
    }

    /// Runs the view protocol for `id` as of `now_ms`:
    ///
    /// 1. absent -> `Missing`
    /// 2. `now_ms >= expires_at` -> delete, `Expired`
    /// 3. `view_count >= max_views` before counting -> delete, `ViewLimitExceeded`
    /// 4. atomically count the view; the access that reaches `max_views` still
    ///    gets the content while deletion runs in the background, and any
    ///    access that lands past the cap is refused.
    ///
    /// Store failures are returned as-is; nothing is retried here.
    pub async fn access_for_view(&self, id: &str, now_ms: i64) -> Result<ViewResult, StoreError> {
        let Some(paste) = self.store.get(id).await? else {
            return Ok(ViewResult::Missing);
        };

        if paste.is_expired(now_ms) {
            self.delete_best_effort(id, "expired").await;
            return Ok(ViewResult::Expired);
        }

        if paste.is_view_limit_exceeded() {
            self.delete_best_effort(id, "view limit reached").await;
            return Ok(ViewResult::ViewLimitExceeded);
        }

        let Some(view_count) = self.store.increment_view_count(id).await? else {
            // Deleted between the read and the increment.
            return Ok(ViewResult::Missing);
        };

        if let Some(max_views) = paste.max_views {
            if view_count > max_views {
                // A concurrent viewer took the last slot.
                self.schedule_delete(id);
                return Ok(ViewResult::ViewLimitExceeded);
            }
            if view_count == max_views {
                self.schedule_delete(id);
            }
        }

        Ok(ViewResult::Live(PasteView {
            content: paste.content,
            remaining_views: remaining_views(paste.max_views, view_count),
            expires_at: paste.expires_at,
        }))
    }

    async fn delete_best_effort(&self, id: &str, reason: &'static str) {
        match self.store.delete(id).await {
            Ok(()) => debug!(paste_id = %id, reason, "deleted paste"),
            Err(err) => warn!(paste_id = %id, reason, error = %err, "failed to delete paste"),
        }
    }

    /// Deletes off the response path; the caller never waits on it.
    fn schedule_delete(&self, id: &str) {
        let store = self.store.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            match store.delete(&id).await {
                Ok(()) => debug!(paste_id = %id, "deleted paste after final view"),
                Err(err) => {
                    warn!(paste_id = %id, error = %err, "failed to delete paste after final view")
                }
            }
        });
    }
}
