pub mod health;
pub mod meeting;
pub mod ws;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/meeting/start-bbh", post(meeting::start))
        .route("/meeting/upload-file-chunk", post(meeting::upload_chunk))
        .route("/meeting/chat", post(meeting::chat))
        .route("/meeting/{request_id}/diarize", post(meeting::trigger_diarize))
        .route("/meeting/{request_id}/status", get(meeting::get_status))
        .route("/meeting/ws/{request_id}", get(ws::stream_status))
        .route("/meeting/{request_id}/info", patch(meeting::update_info))
        .route("/meeting/{request_id}/language", post(meeting::change_language))
        .route(
            "/meeting/{request_id}/transcript/plain",
            put(meeting::update_transcript),
        )
        .route("/meeting/{request_id}/cancel", delete(meeting::cancel))
        .route("/meeting/{request_id}/summary", post(meeting::summary))
        .route("/meeting/{request_id}/download/audio", get(meeting::download_audio))
        .route(
            "/meeting/{request_id}/download/document",
            get(meeting::download_document),
        )
}
