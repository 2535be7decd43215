//! Training request models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use learnhub_core::types::{DbId, Timestamp};

/// A row from the `training_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TrainingRequest {
    pub id: DbId,
    pub course_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub pending_attendee_ids: Vec<DbId>,
    pub completed_attendee_ids: Vec<DbId>,
    pub requested_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a training request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTrainingRequest {
    pub course_id: DbId,
    pub title: String,
    pub description: Option<String>,
}
