//! Per-channel manifest resolution.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::playlist::HLS_CONTENT_TYPE;
use crate::state::AppState;

/// `GET /stream/{channel_id}.m3u8`
///
/// The `.m3u8` suffix is part of the route contract; paths without it
/// are 404. Serves from the manifest cache when a fresh rewrite
/// exists; otherwise runs the full resolution chain. Failures map to
/// 404 when the channel or a hop yield is missing, 500 otherwise.
pub async fn stream(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> ApiResult<Response> {
    let Some(channel_id) = file.strip_suffix(".m3u8") else {
        return Err(ApiError::not_found("stream not found"));
    };
    let channel_id = channel_id.to_string();

    if let Some(manifest) = state.manifests.get(&channel_id) {
        return Ok(manifest_response(&channel_id, manifest));
    }

    let manifest = state.daddylive.resolve_stream(&channel_id).await?;
    state
        .manifests
        .insert(channel_id.clone(), manifest.clone());

    Ok(manifest_response(&channel_id, manifest))
}

fn manifest_response(channel_id: &str, manifest: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, HLS_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={channel_id}.m3u8"),
            ),
        ],
        manifest,
    )
        .into_response()
}
