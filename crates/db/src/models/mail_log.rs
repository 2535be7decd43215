//! Failed-mail log model.

use serde::Serialize;
use sqlx::FromRow;
use learnhub_core::types::{DbId, Timestamp};

/// A row from the `mail_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MailLog {
    pub id: DbId,
    pub to_email: String,
    pub subject: String,
    pub template: String,
    pub context: serde_json::Value,
    pub error: String,
    pub created_at: Timestamp,
}
