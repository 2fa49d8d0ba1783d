//! Troth event bus and notice delivery.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`] -- the event envelope published on the bus.
//! - [`EventBusNotifier`] -- publishes core match notices onto the bus.
//! - [`NoticeLog`] -- background subscriber that writes every event to the
//!   tracing log.

pub mod bus;
pub mod notice_log;
pub mod notifier;

pub use bus::{EventBus, PlatformEvent};
pub use notice_log::NoticeLog;
pub use notifier::EventBusNotifier;
