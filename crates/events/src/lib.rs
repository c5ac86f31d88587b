//! Domain events and notification fan-out for PropDesk.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope handlers publish.
//! - [`NotificationRouter`]: background consumer that turns events into
//!   per-user rows in the `notifications` table.

pub mod bus;
pub mod router;
pub mod types;

pub use bus::{EventBus, PlatformEvent};
pub use router::NotificationRouter;
