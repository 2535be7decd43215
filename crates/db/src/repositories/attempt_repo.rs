//! Repository for the `attempts` table.

use sqlx::types::Json;
use sqlx::PgPool;
use learnhub_core::types::DbId;

use crate::models::attempt::{Attempt, CreateAttempt};

/// Column list for `attempts` queries.
const COLUMNS: &str = "id, resource_kind, resource_id, course_id, session_id, user_id, \
    trainer_id, answers, score, passed, submitted_at";

/// Provides persistence for survey and assessment submissions.
pub struct AttemptRepo;

impl AttemptRepo {
    pub async fn create(pool: &PgPool, input: &CreateAttempt) -> Result<Attempt, sqlx::Error> {
        let query = format!(
            "INSERT INTO attempts
                (resource_kind, resource_id, course_id, session_id, user_id, trainer_id,
                 answers, score, passed)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Attempt>(&query)
            .bind(&input.resource_kind)
            .bind(input.resource_id)
            .bind(input.course_id)
            .bind(input.session_id)
            .bind(input.user_id)
            .bind(input.trainer_id)
            .bind(Json(&input.answers))
            .bind(input.score)
            .bind(input.passed)
            .fetch_one(pool)
            .await
    }

    /// Every attempt submitted within a course, oldest first.
    pub async fn list_for_course(
        pool: &PgPool,
        course_id: DbId,
    ) -> Result<Vec<Attempt>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attempts WHERE course_id = $1 ORDER BY submitted_at, id"
        );
        sqlx::query_as::<_, Attempt>(&query)
            .bind(course_id)
            .fetch_all(pool)
            .await
    }

    /// A user's attempts at one survey or assessment, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        resource_kind: &str,
        resource_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<Attempt>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attempts
             WHERE resource_kind = $1 AND resource_id = $2 AND user_id = $3
             ORDER BY submitted_at DESC, id DESC"
        );
        sqlx::query_as::<_, Attempt>(&query)
            .bind(resource_kind)
            .bind(resource_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
