//! Key, content and logo proxy routes.

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;

use crate::api::error::ApiResult;
use crate::state::AppState;

/// `GET /key/{token}` — decryption key bytes.
pub async fn key(State(state): State<AppState>, Path(token): Path<String>) -> ApiResult<Response> {
    let bytes = state.daddylive.fetch_key(&token).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::CONTENT_DISPOSITION, "attachment; filename=key"),
        ],
        bytes,
    )
        .into_response())
}

/// `GET /content/{token}` — streamed media segment bytes.
///
/// The upstream body is forwarded chunk by chunk; dropping the client
/// connection drops this stream and with it the upstream connection.
pub async fn content(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Response> {
    let upstream = state.daddylive.open_content(&token).await?;
    let stream = upstream.bytes_stream().map_err(std::io::Error::other);

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Body::from_stream(stream),
    )
        .into_response())
}

/// `GET /logo/{token}` — channel logo, disk-cached.
pub async fn logo(State(state): State<AppState>, Path(token): Path<String>) -> ApiResult<Response> {
    let bytes = state
        .daddylive
        .fetch_logo(&token, &state.config.logo_cache_dir)
        .await?;

    let content_type = state
        .daddylive
        .codec()
        .decode(&token)
        .ok()
        .map(|url| logo_content_type(&url))
        .unwrap_or("application/octet-stream");

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// `GET /schedule` — upstream event schedule as JSON.
pub async fn schedule(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    Ok(Json(state.daddylive.schedule().await?))
}

fn logo_content_type(url: &str) -> &'static str {
    let path = url.split('?').next().unwrap_or(url);
    match path.rsplit('.').next() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
