//! `GET /api/image/:image_id?session=<id>`: serves images held in the
//! ephemeral store.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde_json::json;

use felos_tools::image_store::image_key;

use crate::state::AppState;

const IMMUTABLE: &str = "public, max-age=31536000, immutable";

pub async fn get_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let Some(session_id) = query.get("session").filter(|s| !s.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Session ID required" })),
        )
            .into_response();
    };

    let Some(data) = state.images.get(&image_key(session_id, &image_id)) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Image not found" })),
        )
            .into_response();
    };

    match decode_image(&data) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, IMMUTABLE),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(image_id = %image_id, error = %e, "stored image is not valid base64");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to serve image" })),
            )
                .into_response()
        }
    }
}

/// Decode stored base64, tolerating a `data:...;base64,` prefix.
fn decode_image(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let raw = data.split_once(',').map_or(data, |(_, b64)| b64);
    B64.decode(raw.trim())
}
