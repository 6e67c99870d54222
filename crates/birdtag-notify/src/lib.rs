//! Tag-indexed notification fan-out for BirdTag.
//!
//! Channels are provisioned dynamically, one per normalized tag, through
//! an idempotent create-or-get; the registry keeps subscription records in
//! the metadata store with lookups by subscriber and by tag; the fan-out
//! publishes one message per detected tag with per-tag failure isolation.

mod channel;
mod fanout;
mod registry;

#[cfg(feature = "channel-sns")]
mod sns;

pub mod test_helpers;

pub use channel::ChannelService;
pub use fanout::{FanoutReport, NotificationFanout};
pub use registry::SubscriptionRegistry;

#[cfg(feature = "channel-sns")]
pub use sns::SnsChannelService;
