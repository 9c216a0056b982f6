use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
};
use tracing::debug;

use crate::{
    application::{
        dto::{CreatePasteRequest, CreatePasteResponse, HealthResponse, PasteViewResponse},
        lifecycle::ViewResult,
    },
    domain::{
        clock::{TEST_NOW_HEADER, resolve_now},
        errors::{PasteError, StoreError},
    },
    interface::http::problem::{ApiError, ApiResult},
    state::AppState,
};

pub async fn healthcheck(State(state): State<AppState>) -> Json<HealthResponse> {
    match state.store.ping().await {
        Ok(()) => Json(HealthResponse {
            ok: true,
            error: None,
        }),
        Err(err) => Json(HealthResponse {
            ok: false,
            error: Some(health_error(err)),
        }),
    }
}

fn health_error(err: StoreError) -> String {
    match err {
        StoreError::Misconfigured(message) => message,
        other => other.to_string(),
    }
}

pub async fn create_paste(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<CreatePasteResponse>)> {
    // Any Content-Type is accepted.
    let request: CreatePasteRequest = serde_json::from_slice(&body).map_err(|err| {
        debug!(error = %err, "rejected create body");
        ApiError::invalid_body()
    })?;

    let now_ms = request_now(&state, &headers);
    let paste = state.creation.create(&request, now_ms).await?;
    let url = paste_url(&state, &headers, &paste.id);

    Ok((
        StatusCode::CREATED,
        Json(CreatePasteResponse { id: paste.id, url }),
    ))
}

pub async fn get_paste(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<PasteViewResponse>> {
    let now_ms = request_now(&state, &headers);

    match state.lifecycle.access_for_view(&id, now_ms).await? {
        ViewResult::Live(view) => Ok(Json(PasteViewResponse::from(view))),
        refused => {
            debug!(paste_id = %id, reason = refused.reason(), "paste not viewable");
            Err(PasteError::NotFound.into())
        }
    }
}

fn request_now(state: &AppState, headers: &HeaderMap) -> i64 {
    let override_ms = headers
        .get(TEST_NOW_HEADER)
        .and_then(|value| value.to_str().ok());
    resolve_now(state.clock.as_ref(), state.test_mode, override_ms)
}

/// Shareable link for `id`; without a configured base URL it is derived
/// from the request's `Host`.
fn paste_url(state: &AppState, headers: &HeaderMap, id: &str) -> String {
    let base = match &state.public_base_url {
        Some(base_url) => base_url.trim_end_matches('/').to_string(),
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("localhost");
            let scheme = if host.contains("localhost") || host.starts_with("127.0.0.1") {
                "http"
            } else {
                "https"
            };
            format!("{scheme}://{host}")
        }
    };

    format!("{base}/p/{id}")
}
