//! Upload handler: accepts base64-encoded files, stores each object,
//! creates a pending media record and triggers the tagging pipeline.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use birdtag_core::{MediaKind, MediaRecord, PipelineError};
use birdtag_pipeline::{classify, ObjectEvent};

use crate::error::{ErrorResponse, HttpError};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub files: Vec<UploadFile>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    /// Base64-encoded file content.
    pub base64_data: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub uploaded: Vec<UploadedFile>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadedFile {
    pub file_id: Uuid,
    pub file_name: String,
    pub object_url: String,
}

/// Replace anything outside a conservative character set and strip path
/// components, so object keys stay predictable.
fn sanitize_filename(filename: &str) -> String {
    const MAX: usize = 255;
    let base = std::path::Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    if base.contains("..") {
        return "file".to_string();
    }
    let s: String = base
        .chars()
        .take(MAX)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim_matches('_').is_empty() {
        "file".to_string()
    } else {
        s
    }
}

fn kind_folder(kind: Option<MediaKind>) -> &'static str {
    match kind {
        Some(MediaKind::Image) => "images",
        Some(MediaKind::Video) => "videos",
        Some(MediaKind::Audio) => "audios",
        None => "other",
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/upload",
    tag = "media",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Files stored, records created", body = UploadResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UploadRequest>,
) -> Result<impl IntoResponse, HttpError> {
    if request.files.is_empty() {
        return Err(PipelineError::Validation("no files provided".to_string()).into());
    }

    let mut uploaded = Vec::with_capacity(request.files.len());

    for file in &request.files {
        if file.file_name.trim().is_empty() {
            return Err(PipelineError::Validation("fileName is required".to_string()).into());
        }

        // Validation happens before any store or db mutation for this file.
        let data = STANDARD.decode(&file.base64_data).map_err(|e| {
            PipelineError::Validation(format!(
                "invalid base64 data for {}: {}",
                file.file_name, e
            ))
        })?;

        if data.len() > state.config.max_upload_size_bytes {
            return Err(PipelineError::Validation(format!(
                "{} exceeds the maximum upload size of {} bytes",
                file.file_name, state.config.max_upload_size_bytes
            ))
            .into());
        }

        let file_id = Uuid::new_v4();
        let safe_name = sanitize_filename(&file.file_name);
        let date_prefix = Utc::now().format("%Y-%m-%d");
        let object_key = format!(
            "uploads/{}/{}/{}_{}",
            kind_folder(classify(&file.file_name)),
            date_prefix,
            file_id,
            safe_name
        );

        let object_url = state
            .storage
            .upload(&object_key, &file.mime_type, data)
            .await
            .map_err(PipelineError::from)?;

        let record = MediaRecord::pending(
            file_id,
            object_key.clone(),
            object_url.clone(),
            safe_name,
            file.mime_type.clone(),
        );
        state.media.create_pending(&record).await?;

        // Object arrival is the trigger for the tagging pipeline.
        state
            .worker
            .submit(ObjectEvent {
                file_id,
                object_key,
            })
            .await?;

        tracing::info!(file_id = %file_id, file_name = %file.file_name, "File uploaded");

        uploaded.push(UploadedFile {
            file_id,
            file_name: file.file_name.clone(),
            object_url,
        });
    }

    Ok(Json(UploadResponse { uploaded }))
}
