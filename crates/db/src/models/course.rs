//! Course models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use learnhub_core::course::SessionItem;
use learnhub_core::rating::RatingEntry;
use learnhub_core::types::{DbId, Timestamp};

/// A row from the `courses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Course {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub org_unit_id: Option<DbId>,
    pub trainer_ids: Vec<DbId>,
    pub attendee_ids: Vec<DbId>,
    pub items: Json<Vec<SessionItem>>,
    pub user_rating: Json<Vec<RatingEntry>>,
    pub trainer_rating: Json<Vec<RatingEntry>>,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a course.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCourse {
    pub title: String,
    pub description: Option<String>,
    pub org_unit_id: Option<DbId>,
    #[serde(default)]
    pub trainer_ids: Vec<DbId>,
    #[serde(default)]
    pub attendee_ids: Vec<DbId>,
}

/// DTO for updating a course.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCourse {
    pub title: Option<String>,
    pub description: Option<String>,
    pub org_unit_id: Option<DbId>,
    pub trainer_ids: Option<Vec<DbId>>,
    pub is_active: Option<bool>,
}

/// Request body for enrolling or removing attendees.
#[derive(Debug, Clone, Deserialize)]
pub struct AttendeeChange {
    pub user_ids: Vec<DbId>,
}

/// Request body for submitting a rating.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRating {
    /// The user being rated; defaults to the caller for attendee ratings.
    pub user_id: Option<DbId>,
    pub score: i32,
    pub comment: Option<String>,
}

/// Both rating lists of a course or session, backfilled.
#[derive(Debug, Clone, Serialize)]
pub struct RatingView {
    pub user_rating: Vec<RatingEntry>,
    pub trainer_rating: Vec<RatingEntry>,
    pub user_summary: learnhub_core::rating::RatingSummary,
    pub trainer_summary: learnhub_core::rating::RatingSummary,
}
