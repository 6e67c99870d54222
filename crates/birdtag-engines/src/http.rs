//! HTTP client for the model server.
//!
//! The model server exposes one inference endpoint per media kind and
//! returns raw detection rows; all gating and aggregation happens in the
//! analyzer adapters. A 422 from the server means the content could not
//! be decoded; everything else non-2xx is an engine failure.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use birdtag_core::PipelineError;

use crate::engine::{Detection, DetectionEngine, SegmentDetection, VideoInference};

#[derive(Clone)]
pub struct ModelServerClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct InferRequest {
    /// Base64-encoded media content.
    content: String,
}

#[derive(Debug, Deserialize)]
struct ImageInferResponse {
    detections: Vec<Detection>,
}

#[derive(Debug, Deserialize)]
struct AudioInferResponse {
    segments: Vec<SegmentDetection>,
}

impl ModelServerClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                PipelineError::Internal(anyhow::anyhow!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, kind: &str) -> String {
        format!("{}/v1/detect/{}", self.base_url, kind)
    }

    async fn post_infer<T: serde::de::DeserializeOwned>(
        &self,
        kind: &str,
        content: &[u8],
    ) -> Result<T, PipelineError> {
        let request = InferRequest {
            content: STANDARD.encode(content),
        };

        let response = self
            .client
            .post(self.endpoint(kind))
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Engine(format!("{} inference request failed: {}", kind, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            let detail = response.text().await.unwrap_or_default();
            return Err(PipelineError::Decode(format!(
                "model server could not decode {} content: {}",
                kind, detail
            )));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PipelineError::Engine(format!(
                "model server returned {} for {} inference: {}",
                status, kind, detail
            )));
        }

        response.json::<T>().await.map_err(|e| {
            PipelineError::Engine(format!("invalid {} inference response: {}", kind, e))
        })
    }
}

#[async_trait]
impl DetectionEngine for ModelServerClient {
    #[tracing::instrument(skip(self, content), fields(content_len = content.len()))]
    async fn infer_image(&self, content: &[u8]) -> Result<Vec<Detection>, PipelineError> {
        let response: ImageInferResponse = self.post_infer("image", content).await?;
        Ok(response.detections)
    }

    #[tracing::instrument(skip(self, content), fields(content_len = content.len()))]
    async fn infer_video(&self, content: &[u8]) -> Result<VideoInference, PipelineError> {
        self.post_infer("video", content).await
    }

    #[tracing::instrument(skip(self, content), fields(content_len = content.len()))]
    async fn infer_audio(&self, content: &[u8]) -> Result<Vec<SegmentDetection>, PipelineError> {
        let response: AudioInferResponse = self.post_infer("audio", content).await?;
        Ok(response.segments)
    }
}
