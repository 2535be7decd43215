//! Organizational unit models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use learnhub_core::org_unit::DataCounter;
use learnhub_core::types::{DbId, Timestamp};

/// A row from the `org_units` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrgUnit {
    pub id: DbId,
    pub name: String,
    pub parent_id: Option<DbId>,
    pub type_id: Option<DbId>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub is_active: bool,
    pub data_counter: Json<DataCounter>,
    pub theme: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A unit returned by a tree traversal, with its distance from the start
/// node (0 for the start node itself, negative for ancestors).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrgUnitWithDepth {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub unit: OrgUnit,
    pub depth: i32,
}

/// A row from the `org_unit_types` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrgUnitType {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
}

/// DTO for creating a unit.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrgUnit {
    pub name: String,
    pub parent_id: Option<DbId>,
    pub type_id: Option<DbId>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub theme: Option<serde_json::Value>,
}

/// DTO for updating a unit.
///
/// `parent_id` uses a double option: absent leaves the parent alone,
/// `null` makes the unit a root.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrgUnit {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<DbId>>,
    pub type_id: Option<DbId>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
    pub theme: Option<serde_json::Value>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<DbId>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<DbId>::deserialize(deserializer).map(Some)
}
