//! Repository for the `courses` table.

use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use learnhub_core::course::SessionItem;
use learnhub_core::rating::RatingEntry;
use learnhub_core::types::DbId;

use crate::models::course::{Course, CreateCourse, UpdateCourse};

/// Column list for `courses` queries.
const COLUMNS: &str = "id, title, description, org_unit_id, trainer_ids, attendee_ids, items, \
    user_rating, trainer_rating, is_active, created_by, created_at, updated_at";

/// Provides CRUD and sub-document writes for courses.
pub struct CourseRepo;

impl CourseRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateCourse,
        created_by: DbId,
    ) -> Result<Course, sqlx::Error> {
        let query = format!(
            "INSERT INTO courses (title, description, org_unit_id, trainer_ids, attendee_ids, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(input.title.trim())
            .bind(&input.description)
            .bind(input.org_unit_id)
            .bind(&input.trainer_ids)
            .bind(&input.attendee_ids)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Course>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM courses WHERE id = $1");
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List courses, newest first.
    pub async fn list(pool: &PgPool, include_inactive: bool) -> Result<Vec<Course>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM courses
             WHERE ($1 OR is_active = true)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(include_inactive)
            .fetch_all(pool)
            .await
    }

    /// Update a course. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCourse,
    ) -> Result<Option<Course>, sqlx::Error> {
        let query = format!(
            "UPDATE courses SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                org_unit_id = COALESCE($4, org_unit_id),
                trainer_ids = COALESCE($5, trainer_ids),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .bind(input.title.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(input.org_unit_id)
            .bind(&input.trainer_ids)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a course and, by cascade, its sessions.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the attendee list.
    pub async fn set_attendees<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        attendee_ids: &[DbId],
    ) -> Result<Option<Course>, sqlx::Error> {
        let query = format!(
            "UPDATE courses SET attendee_ids = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&query)
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
    ) -> Result<Option<Course>, sqlx::Error> {
        let query = format!(
            "UPDATE courses SET items = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .bind(Json(items))
            .fetch_optional(executor)
            .await
    }

    /// Whole-column replace of both rating lists.
    ///
    /// Callers hold the row lock from [`CourseRepo::find_for_update`] so
    /// concurrent submissions do not overwrite each other.
    pub async fn set_ratings<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        user_rating: &[RatingEntry],
        trainer_rating: &[RatingEntry],
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE courses SET user_rating = $2, trainer_rating = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(Json(user_rating))
        .bind(Json(trainer_rating))
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Row locking
    // -----------------------------------------------------------------------

    /// Lock a course for the rest of the transaction.
    ///
    /// Every read-modify-write of the array and JSONB columns goes through
    /// this lock.
    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<Course>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM courses WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }
}
