//! Object store abstraction for BirdTag.
//!
//! The pipeline only needs get/put/delete over opaque keys; backends are
//! S3 (production) and the local filesystem (development and tests).
//! Keys are caller-provided, e.g. `uploads/images/{date}/{file_id}_{name}`
//! or `thumbnails/{file_id}_thumb.jpg`.

mod traits;

#[cfg(feature = "storage-local")]
mod local;
#[cfg(feature = "storage-s3")]
mod s3;

pub use traits::{ObjectStore, StorageError, StorageResult};

#[cfg(feature = "storage-local")]
pub use local::LocalObjectStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3ObjectStore;
