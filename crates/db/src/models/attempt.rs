//! Survey / assessment submission models.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use learnhub_core::assessment::Answer;
use learnhub_core::types::{DbId, Timestamp};

/// A row from the `attempts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Attempt {
    pub id: DbId,
    pub resource_kind: String,
    pub resource_id: DbId,
    pub course_id: Option<DbId>,
    pub session_id: Option<DbId>,
    pub user_id: DbId,
    pub trainer_id: Option<DbId>,
    pub answers: Json<Vec<Answer>>,
    pub score: Option<f64>,
    pub passed: Option<bool>,
    pub submitted_at: Timestamp,
}

/// Request body for submitting answers.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAttempt {
    pub course_id: Option<DbId>,
    pub session_id: Option<DbId>,
    pub trainer_id: Option<DbId>,
    pub answers: Vec<Answer>,
}

/// DTO for inserting a graded attempt.
#[derive(Debug, Clone)]
pub struct CreateAttempt {
    pub resource_kind: String,
    pub resource_id: DbId,
    pub course_id: Option<DbId>,
    pub session_id: Option<DbId>,
    pub user_id: DbId,
    pub trainer_id: Option<DbId>,
    pub answers: Vec<Answer>,
    pub score: Option<f64>,
    pub passed: Option<bool>,
}
