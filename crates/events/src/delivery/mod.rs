//! Outbound mail for platform notifications.
//!
//! [`email`] renders and sends templated messages over SMTP; [`dispatch`]
//! wraps it so failures are logged to `mail_logs` instead of propagating.

pub mod dispatch;
pub mod email;
