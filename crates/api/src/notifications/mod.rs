//! Notification fan-out.
//!
//! The [`NotificationRouter`] subscribes to the event bus and turns each
//! notifying event into stored notifications, WebSocket pushes and email.

pub mod router;

pub use router::NotificationRouter;
