use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    application::{dto::CreatePasteRequest, id::generate_paste_id},
    domain::{errors::PasteError, paste::Paste},
    infrastructure::paste_store::PasteStore,
};

/// Attempts at finding an unused id before giving up.
pub const MAX_ID_ATTEMPTS: usize = 5;

pub type IdGenerator = Arc<dyn Fn(i64) -> String + Send + Sync>;

#[derive(Clone)]
pub struct CreationService {
    store: PasteStore,
    generate_id: IdGenerator,
}

impl CreationService {
    pub fn new(store: PasteStore) -> Self {
        Self::with_id_generator(store, Arc::new(generate_paste_id))
    }

    pub fn with_id_generator(store: PasteStore, generate_id: IdGenerator) -> Self {
        Self { store, generate_id }
    }

    /// Validates `request` and stores a fresh paste created at `now_ms`.
    pub async fn create(
        &self,
        request: &CreatePasteRequest,
        now_ms: i64,
    ) -> Result<Paste, PasteError> {
        let new_paste = request.validate()?;

        let expires_at = new_paste
            .ttl_seconds
            .map(|ttl_seconds| {
                i64::try_from(ttl_seconds)
                    .ok()
                    .and_then(|seconds| seconds.checked_mul(1000))
                    .and_then(|ttl_ms| now_ms.checked_add(ttl_ms))
                    .ok_or_else(|| PasteError::validation("ttl_seconds is too large"))
            })
            .transpose()?;

        let id = self.allocate_id(now_ms).await?;
        let paste = Paste {
            id,
            content: new_paste.content,
            created_at: now_ms,
            expires_at,
            max_views: new_paste.max_views,
            view_count: 0,
        };

        self.store.put(&paste, now_ms).await?;

        info!(
            paste_id = %paste.id,
            ttl_seconds = ?new_paste.ttl_seconds,
            max_views = ?paste.max_views,
            "created paste"
        );
        Ok(paste)
    }

    async fn allocate_id(&self, now_ms: i64) -> Result<String, PasteError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = (self.generate_id)(now_ms);
            if !self.store.exists(&candidate).await? {
                return Ok(candidate);
            }
            warn!(paste_id = %candidate, "generated paste id already in use");
        }

        Err(PasteError::internal("could not allocate a unique paste id"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::infrastructure::memory_kv::InMemoryKv;

    fn request(body: serde_json::Value) -> CreatePasteRequest {
        serde_json::from_value(body).unwrap()
    }

    fn service() -> (PasteStore, CreationService) {
        let store = PasteStore::new(Arc::new(InMemoryKv::new()));
        (store.clone(), CreationService::new(store))
    }

    #[tokio::test]
    async fn create_persists_a_fresh_paste() {
        let (store, service) = service();

        let paste = service
            .create(
                &request(json!({"content": "hello", "ttl_seconds": 60, "max_views": 3})),
                1_000,
            )
            .await
            .unwrap();

        assert_eq!(paste.created_at, 1_000);
        assert_eq!(paste.expires_at, Some(61_000));
        assert_eq!(paste.max_views, Some(3));
        assert_eq!(paste.view_count, 0);
        assert_eq!(store.get(&paste.id).await.unwrap(), Some(paste));
    }

    #[tokio::test]
    async fn invalid_request_never_touches_the_store() {
        let kv = Arc::new(InMemoryKv::new());
        let service = CreationService::new(PasteStore::new(kv.clone()));

        let err = service
            .create(&request(json!({"content": "  "})), 1_000)
            .await
            .unwrap_err();

        assert!(matches!(err, PasteError::Validation(_)));
        assert!(kv.is_empty().await);
    }

    #[tokio::test]
    async fn colliding_ids_are_regenerated() {
        let store = PasteStore::new(Arc::new(InMemoryKv::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let service = CreationService::with_id_generator(
            store.clone(),
            Arc::new(move |_: i64| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 { "taken".to_string() } else { format!("id{n}") }
            }),
        );

        let first = service.create(&request(json!({"content": "a"})), 0).await.unwrap();
        assert_eq!(first.id, "taken");

        let second = service.create(&request(json!({"content": "b"})), 0).await.unwrap();
        assert_eq!(second.id, "id2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_when_every_id_collides() {
        let store = PasteStore::new(Arc::new(InMemoryKv::new()));
        let service = CreationService::with_id_generator(
            store.clone(),
            Arc::new(|_: i64| "same".to_string()),
        );

        service.create(&request(json!({"content": "a"})), 0).await.unwrap();
        let err = service
            .create(&request(json!({"content": "b"})), 0)
            .await
            .unwrap_err();

        assert!(matches!(err, PasteError::Internal(_)));
    }

    #[tokio::test]
    async fn oversized_ttl_is_rejected() {
        let (_, service) = service();
        let err = service
            .create(
                &request(json!({"content": "a", "ttl_seconds": u64::MAX})),
                0,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PasteError::Validation(_)));
    }
}
