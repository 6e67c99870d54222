//! Type dispatch: classify a stored object by its key's extension.
//!
//! Classification is strictly by case-insensitive extension suffix.
//! Unknown extensions yield `None` — a defined no-op outcome, not an
//! error; the media record is left untouched.

use birdtag_core::constants::{AUDIO_EXTENSIONS, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use birdtag_core::MediaKind;

/// Classify an object key (or filename) into a media kind.
pub fn classify(key: &str) -> Option<MediaKind> {
    let extension = key.rsplit('.').next()?.to_lowercase();
    if key.len() == extension.len() {
        // No '.' in the key at all.
        return None;
    }

    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        Some(MediaKind::Video)
    } else if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        Some(MediaKind::Audio)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_extensions_route_to_image() {
        for key in ["a.jpg", "b.jpeg", "c.png", "uploads/images/d.JPG"] {
            assert_eq!(classify(key), Some(MediaKind::Image), "key: {}", key);
        }
    }

    #[test]
    fn video_extensions_route_to_video() {
        for key in ["a.mp4", "b.mov", "c.avi", "clips/d.MOV"] {
            assert_eq!(classify(key), Some(MediaKind::Video), "key: {}", key);
        }
    }

    #[test]
    fn audio_extensions_route_to_audio() {
        for key in ["a.mp3", "b.wav", "c.flac", "field/d.WAV"] {
            assert_eq!(classify(key), Some(MediaKind::Audio), "key: {}", key);
        }
    }

    #[test]
    fn unknown_extensions_are_unsupported() {
        for key in ["notes.txt", "archive.zip", "noextension", "trailingdot."] {
            assert_eq!(classify(key), None, "key: {}", key);
        }
    }
}
