//! Thumbnail generation collaborator.
//!
//! Invoked fire-and-forget from image dispatch. The pipeline only depends
//! on the trait; the default implementation resizes with the image crate
//! and stores the result next to the original under `thumbnails/`.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use image::ImageFormat;
use uuid::Uuid;

use birdtag_core::constants::{THUMBNAIL_KEY_PREFIX, THUMBNAIL_MAX_DIMENSION};
use birdtag_core::PipelineError;
use birdtag_storage::ObjectStore;

#[async_trait]
pub trait Thumbnailer: Send + Sync {
    /// Generate and store a thumbnail for the object at `object_key`,
    /// returning the thumbnail's public URL.
    async fn generate(&self, file_id: Uuid, object_key: &str) -> Result<String, PipelineError>;
}

/// Resizes images to a bounded JPEG thumbnail.
pub struct ImageThumbnailer {
    storage: Arc<dyn ObjectStore>,
    max_dimension: u32,
}

impl ImageThumbnailer {
    pub fn new(storage: Arc<dyn ObjectStore>) -> Self {
        Self {
            storage,
            max_dimension: THUMBNAIL_MAX_DIMENSION,
        }
    }

    fn thumbnail_key(file_id: Uuid) -> String {
        format!("{}/{}_thumb.jpg", THUMBNAIL_KEY_PREFIX, file_id)
    }
}

#[async_trait]
impl Thumbnailer for ImageThumbnailer {
    #[tracing::instrument(skip(self))]
    async fn generate(&self, file_id: Uuid, object_key: &str) -> Result<String, PipelineError> {
        let content = self.storage.download(object_key).await?;

        let img = image::load_from_memory(&content)
            .map_err(|e| PipelineError::Decode(format!("failed to decode image: {}", e)))?;

        // `thumbnail` preserves aspect ratio within the bounding box.
        let thumb = img.thumbnail(self.max_dimension, self.max_dimension);

        let mut buffer = Cursor::new(Vec::new());
        // JPEG has no alpha channel.
        image::DynamicImage::ImageRgb8(thumb.to_rgb8())
            .write_to(&mut buffer, ImageFormat::Jpeg)
            .map_err(|e| PipelineError::Internal(anyhow::anyhow!("failed to encode thumbnail: {}", e)))?;

        let key = Self::thumbnail_key(file_id);
        let url = self
            .storage
            .upload(&key, "image/jpeg", buffer.into_inner())
            .await?;

        tracing::debug!(file_id = %file_id, key = %key, "Thumbnail stored");
        Ok(url)
    }
}
