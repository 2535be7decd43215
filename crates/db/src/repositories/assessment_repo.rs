//! Repository for the `assessments` table.

use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use learnhub_core::assessment::DEFAULT_PASS_MARK;
use learnhub_core::types::DbId;

use crate::models::assessment::{Assessment, CreateAssessment, UpdateAssessment};

/// Column list for `assessments` queries.
const COLUMNS: &str = "id, title, description, questions, pass_mark, attendee_ids, preview_key, \
    is_active, created_by, created_at, updated_at";

/// Provides CRUD operations for assessments.
pub struct AssessmentRepo;

impl AssessmentRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateAssessment,
        created_by: DbId,
    ) -> Result<Assessment, sqlx::Error> {
        let query = format!(
            "INSERT INTO assessments (title, description, questions, pass_mark, created_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Assessment>(&query)
            .bind(input.title.trim())
            .bind(&input.description)
            .bind(Json(&input.questions))
            .bind(input.pass_mark.unwrap_or(DEFAULT_PASS_MARK))
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Assessment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM assessments WHERE id = $1");
        sqlx::query_as::<_, Assessment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_many(pool: &PgPool, ids: &[DbId]) -> Result<Vec<Assessment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM assessments WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, Assessment>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    pub async fn list(pool: &PgPool, include_inactive: bool) -> Result<Vec<Assessment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assessments
             WHERE ($1 OR is_active = true)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Assessment>(&query)
            .bind(include_inactive)
            .fetch_all(pool)
            .await
    }

    /// Update an assessment. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAssessment,
    ) -> Result<Option<Assessment>, sqlx::Error> {
        let query = format!(
            "UPDATE assessments SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                questions = COALESCE($4, questions),
                pass_mark = COALESCE($5, pass_mark),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Assessment>(&query)
            .bind(id)
            .bind(input.title.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(input.questions.as_ref().map(Json))
            .bind(input.pass_mark)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Lock a row for the rest of the transaction.
    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<Assessment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM assessments WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Assessment>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Replace the attendee list.
    pub async fn set_attendees<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        attendee_ids: &[DbId],
    ) -> Result<Option<Assessment>, sqlx::Error> {
        let query = format!(
            "UPDATE assessments SET attendee_ids = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Assessment>(&query)
            .bind(id)
            .bind(attendee_ids)
            .fetch_optional(executor)
            .await
    }

    pub async fn set_preview_key(pool: &PgPool, id: DbId, key: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE assessments SET preview_key = $2 WHERE id = $1")
            .bind(id)
            .bind(key)
            .execute(pool)
            .await?;
        Ok(())
    }
}
