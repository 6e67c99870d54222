//! Data models for the application
//!
//! Each sub-module covers one domain area: media records and the tagging
//! state machine, tag subscriptions, and notification payloads.

mod media;
mod notification;
mod subscription;

pub use media::*;
pub use notification::*;
pub use subscription::*;
