use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use birdtag_core::PipelineError;

use crate::error::{ErrorResponse, HttpError};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/media/{id}",
    tag = "media",
    params(
        ("id" = Uuid, Path, description = "Media record ID")
    ),
    responses(
        (status = 200, description = "Media record found", body = serde_json::Value),
        (status = 404, description = "Media record not found", body = ErrorResponse)
    )
)]
pub async fn get_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let record = state
        .media
        .get(id)
        .await?
        .ok_or_else(|| PipelineError::Lookup(format!("media record not found: {}", id)))?;

    Ok(Json(record))
}
