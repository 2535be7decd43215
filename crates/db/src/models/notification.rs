//! Notification and mail log models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use learnhub_core::types::{DbId, Timestamp};

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub kind: String,
    pub channel: String,
    pub title: String,
    pub link: Option<String>,
    pub image: Option<String>,
    pub payload: serde_json::Value,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for inserting a notification.
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: DbId,
    pub kind: String,
    pub channel: String,
    pub title: String,
    pub link: Option<String>,
    pub image: Option<String>,
    pub payload: serde_json::Value,
}

/// Query parameters for listing notifications.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
