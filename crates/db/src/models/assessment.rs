//! Assessment models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use learnhub_core::assessment::Question;
use learnhub_core::types::{DbId, Timestamp};

/// A row from the `assessments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Assessment {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub questions: Json<Vec<Question>>,
    pub pass_mark: i32,
    pub attendee_ids: Vec<DbId>,
    pub preview_key: Option<String>,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an assessment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAssessment {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
    pub pass_mark: Option<i32>,
}

/// DTO for updating an assessment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAssessment {
    pub title: Option<String>,
    pub description: Option<String>,
    pub questions: Option<Vec<Question>>,
    pub pass_mark: Option<i32>,
    pub is_active: Option<bool>,
}
