//! Repository for the `training_requests` table.

use sqlx::{PgPool, Postgres, Transaction};
use learnhub_core::types::DbId;

use crate::models::training_request::{CreateTrainingRequest, TrainingRequest};

/// Column list for `training_requests` queries.
const COLUMNS: &str = "id, course_id, title, description, status, pending_attendee_ids, \
    completed_attendee_ids, requested_by, created_at, updated_at";

/// Provides persistence for training requests.
pub struct TrainingRequestRepo;

impl TrainingRequestRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateTrainingRequest,
        requested_by: DbId,
    ) -> Result<TrainingRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO training_requests (course_id, title, description, requested_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TrainingRequest>(&query)
            .bind(input.course_id)
            .bind(input.title.trim())
            .bind(&input.description)
            .bind(requested_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TrainingRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM training_requests WHERE id = $1");
        sqlx::query_as::<_, TrainingRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List requests, newest first, optionally narrowed to one status.
    pub async fn list(
        pool: &PgPool,
        status: Option<&str>,
    ) -> Result<Vec<TrainingRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM training_requests
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, TrainingRequest>(&query)
            .bind(status)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Transactional helpers
    // -----------------------------------------------------------------------

    /// Lock a request for the rest of the transaction.
    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<TrainingRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM training_requests WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, TrainingRequest>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Write the status and both attendee lists in one statement.
    pub async fn save_state(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        status: &str,
        pending_attendee_ids: &[DbId],
        completed_attendee_ids: &[DbId],
    ) -> Result<TrainingRequest, sqlx::Error> {
        let query = format!(
            "UPDATE training_requests SET
                status = $2,
                pending_attendee_ids = $3,
                completed_attendee_ids = $4,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TrainingRequest>(&query)
            .bind(id)
            .bind(status)
            .bind(pending_attendee_ids)
            .bind(completed_attendee_ids)
            .fetch_one(&mut **tx)
            .await
    }
}
