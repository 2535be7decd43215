//! Well-known notification channel name constants.

/// In-app notification delivered via WebSocket push and stored for the
/// notification bell UI.
pub const CHANNEL_IN_APP: &str = "in_app";

/// Notification additionally delivered as templated email.
pub const CHANNEL_EMAIL: &str = "email";
