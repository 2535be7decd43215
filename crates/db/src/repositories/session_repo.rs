//! Repository for the `sessions` table.

use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use learnhub_core::course::SessionItem;
use learnhub_core::rating::RatingEntry;
use learnhub_core::types::DbId;

use crate::models::session::{CreateSession, Session, UpdateSession};

/// Column list for `sessions` queries.
const COLUMNS: &str = "id, course_id, title, starts_at, ends_at, location, trainer_ids, \
    attendee_ids, items, user_rating, trainer_rating, created_at, updated_at";

/// Provides CRUD and sub-document writes for sessions.
pub struct SessionRepo;

impl SessionRepo {
    pub async fn create(
        pool: &PgPool,
        course_id: DbId,
        input: &CreateSession,
    ) -> Result<Session, sqlx::Error> {
        let query = format!(
            "INSERT INTO sessions
                (course_id, title, starts_at, ends_at, location, trainer_ids, attendee_ids)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(course_id)
            .bind(input.title.trim())
            .bind(input.starts_at)
            .bind(input.ends_at)
            .bind(&input.location)
            .bind(&input.trainer_ids)
            .bind(&input.attendee_ids)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1");
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Sessions of a course in schedule order.
    pub async fn list_for_course(
        pool: &PgPool,
        course_id: DbId,
    ) -> Result<Vec<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions WHERE course_id = $1 ORDER BY starts_at, id"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(course_id)
            .fetch_all(pool)
            .await
    }

    /// Update a session. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSession,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET
                title = COALESCE($2, title),
                starts_at = COALESCE($3, starts_at),
                ends_at = COALESCE($4, ends_at),
                location = COALESCE($5, location),
                trainer_ids = COALESCE($6, trainer_ids),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .bind(input.title.as_deref().map(str::trim))
            .bind(input.starts_at)
            .bind(input.ends_at)
            .bind(&input.location)
            .bind(&input.trainer_ids)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lock a session for the rest of the transaction.
    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Replace the attendee list.
    pub async fn set_attendees<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        attendee_ids: &[DbId],
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET attendee_ids = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .bind(attendee_ids)
            .fetch_optional(executor)
            .await
    }

    /// Replace the item list.
    pub async fn set_items<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        items: &[SessionItem],
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET items = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .bind(Json(items))
            .fetch_optional(executor)
            .await
    }

    /// Whole-column replace of both rating lists.
    pub async fn set_ratings<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        user_rating: &[RatingEntry],
        trainer_rating: &[RatingEntry],
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET user_rating = $2, trainer_rating = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(Json(user_rating))
        .bind(Json(trainer_rating))
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
