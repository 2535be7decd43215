//! Content update (approval log) models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use learnhub_core::content_update::{AdminChange, DataSnapshot, ReviewedField};
use learnhub_core::diff::FieldDiff;
use learnhub_core::types::{DbId, Timestamp};

/// A row from the `content_updates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContentUpdate {
    pub id: DbId,
    pub data_id: Option<DbId>,
    pub update_type: String,
    pub before: Option<Json<DataSnapshot>>,
    pub after: Json<DataSnapshot>,
    pub status: String,
    pub updated_by: Option<DbId>,
    pub approved_by: Option<DbId>,
    pub rejection_reason: Option<String>,
    pub admin_change: Json<Vec<AdminChange>>,
    pub is_undo_delete: bool,
    pub reviewed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A content update together with its field diff.
#[derive(Debug, Clone, Serialize)]
pub struct ContentUpdateDetail {
    #[serde(flatten)]
    pub update: ContentUpdate,
    pub diff: Vec<FieldDiff>,
}

/// Request body for proposing a change.
#[derive(Debug, Clone, Deserialize)]
pub struct ProposeContentUpdate {
    pub update_type: String,
    pub data_id: Option<DbId>,
    #[serde(default)]
    pub after: DataSnapshot,
}

/// DTO for inserting a content update.
#[derive(Debug, Clone)]
pub struct CreateContentUpdate {
    pub data_id: Option<DbId>,
    pub update_type: String,
    pub before: Option<DataSnapshot>,
    pub after: DataSnapshot,
    pub updated_by: DbId,
}

/// Request body for approving an update.
///
/// `fields` only matters for `EDIT`; when empty every requested field is
/// accepted as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproveContentUpdate {
    #[serde(default)]
    pub fields: Vec<ReviewedField>,
}

/// Request body for rejecting an update.
#[derive(Debug, Clone, Deserialize)]
pub struct RejectContentUpdate {
    pub reason: String,
}

/// Query parameters for listing updates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentUpdateFilter {
    pub status: Option<String>,
    pub data_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
