//! Shared constants used across BirdTag crates.

/// File extensions classified as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// File extensions classified as videos.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov"];

/// File extensions classified as audio clips.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac"];

/// Minimum detection confidence for image and video inference.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Minimum per-segment confidence for audio inference.
pub const DEFAULT_AUDIO_MIN_CONFIDENCE: f32 = 0.1;

/// Prefix for per-tag notification channel names.
/// Channel identity is a pure function of the normalized tag.
pub const CHANNEL_NAME_PREFIX: &str = "notifications-";

/// Longest edge of generated thumbnails, in pixels.
pub const THUMBNAIL_MAX_DIMENSION: u32 = 256;

/// Storage key prefix for generated thumbnails.
pub const THUMBNAIL_KEY_PREFIX: &str = "thumbnails";
