//! Aggregate playlist listing every catalog channel.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::state::AppState;

pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

pub async fn playlist(State(state): State<AppState>) -> impl IntoResponse {
    let mut data = String::from("#EXTM3U\n");

    if let Some(catalog) = state.catalog.current() {
        for channel in catalog.channels() {
            if channel.logo.is_empty() {
                data.push_str(&format!("#EXTINF:-1,{}\n", channel.name));
            } else {
                data.push_str(&format!(
                    "#EXTINF:-1 tvg-logo=\"{}\",{}\n",
                    channel.logo, channel.name
                ));
            }
            data.push_str(&format!(
                "{}/stream/{}.m3u8\n",
                state.config.public_base_url, channel.id
            ));
        }
    }

    (
        [
            (header::CONTENT_TYPE, HLS_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=playlist.m3u8",
            ),
        ],
        data,
    )
}
