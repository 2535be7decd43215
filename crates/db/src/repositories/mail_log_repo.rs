//! Repository for the `mail_logs` table.

use sqlx::PgPool;
use learnhub_core::types::DbId;

use crate::models::mail_log::MailLog;

/// Records outbound mail that could not be delivered.
pub struct MailLogRepo;

impl MailLogRepo {
    pub async fn create(
        pool: &PgPool,
        to_email: &str,
        subject: &str,
        template: &str,
        context: &serde_json::Value,
        error: &str,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO mail_logs (to_email, subject, template, context, error) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(to_email)
        .bind(subject)
        .bind(template)
        .bind(context)
        .bind(error)
        .fetch_one(pool)
        .await
    }

    /// Most recent failures first.
    pub async fn list(pool: &PgPool, limit: i64) -> Result<Vec<MailLog>, sqlx::Error> {
        sqlx::query_as::<_, MailLog>(
            "SELECT id, to_email, subject, template, context, error, created_at \
             FROM mail_logs ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
