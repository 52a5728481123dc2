//! Notification outbox module
//!
//! Notifications are enqueued as rows inside the same transaction as the
//! operation that caused them, then delivered by a background dispatcher.
//! Delivery is fire-and-forget: a failed or slow sink can never fail or roll
//! back a financial operation.

mod model;
mod service;

pub use model::*;
pub use service::{run_notification_dispatcher, NotificationService};
