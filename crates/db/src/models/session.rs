//! Session models and DTOs. A session is one scheduled run of a course.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use learnhub_core::course::SessionItem;
use learnhub_core::rating::RatingEntry;
use learnhub_core::types::{DbId, Timestamp};

/// A row from the `sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Session {
    pub id: DbId,
    pub course_id: DbId,
    pub title: String,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub location: Option<String>,
    pub trainer_ids: Vec<DbId>,
    pub attendee_ids: Vec<DbId>,
    pub items: Json<Vec<SessionItem>>,
    pub user_rating: Json<Vec<RatingEntry>>,
    pub trainer_rating: Json<Vec<RatingEntry>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a session.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSession {
    pub title: String,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub location: Option<String>,
    #[serde(default)]
    pub trainer_ids: Vec<DbId>,
    #[serde(default)]
    pub attendee_ids: Vec<DbId>,
}

/// DTO for updating a session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSession {
    pub title: Option<String>,
    pub starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
    pub location: Option<String>,
    pub trainer_ids: Option<Vec<DbId>>,
}
