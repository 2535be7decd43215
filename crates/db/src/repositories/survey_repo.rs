//! Repository for the `surveys` table.

use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use learnhub_core::types::DbId;

use crate::models::survey::{CreateSurvey, Survey, UpdateSurvey};

/// Column list for `surveys` queries.
const COLUMNS: &str = "id, title, description, questions, attendee_ids, preview_key, \
    is_active, created_by, created_at, updated_at";

/// Provides CRUD operations for surveys.
pub struct SurveyRepo;

impl SurveyRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateSurvey,
        created_by: DbId,
    ) -> Result<Survey, sqlx::Error> {
        let query = format!(
            "INSERT INTO surveys (title, description, questions, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Survey>(&query)
            .bind(input.title.trim())
            .bind(&input.description)
            .bind(Json(&input.questions))
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Survey>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM surveys WHERE id = $1");
        sqlx::query_as::<_, Survey>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_many(pool: &PgPool, ids: &[DbId]) -> Result<Vec<Survey>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM surveys WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, Survey>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    pub async fn list(pool: &PgPool, include_inactive: bool) -> Result<Vec<Survey>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM surveys
             WHERE ($1 OR is_active = true)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Survey>(&query)
            .bind(include_inactive)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSurvey,
    ) -> Result<Option<Survey>, sqlx::Error> {
        let query = format!(
            "UPDATE surveys SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                questions = COALESCE($4, questions),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Survey>(&query)
            .bind(id)
            .bind(input.title.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(input.questions.as_ref().map(Json))
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Lock a row for the rest of the transaction.
    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<Survey>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM surveys WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Survey>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Replace the attendee list.
    pub async fn set_attendees<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        attendee_ids: &[DbId],
    ) -> Result<Option<Survey>, sqlx::Error> {
        let query = format!(
            "UPDATE surveys SET attendee_ids = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Survey>(&query)
            .bind(id)
            .bind(attendee_ids)
            .fetch_optional(executor)
            .await
    }

    pub async fn set_preview_key(pool: &PgPool, id: DbId, key: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE surveys SET preview_key = $2 WHERE id = $1")
            .bind(id)
            .bind(key)
            .execute(pool)
            .await?;
        Ok(())
    }
}
