//! HTTP handlers, one module per feature area.

pub mod media_get;
pub mod search;
pub mod subscriptions;
pub mod upload;
