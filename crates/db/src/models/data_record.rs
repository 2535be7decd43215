//! `Data` records and their field definitions.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use learnhub_core::content_update::{DataSnapshot, FieldValue};
use learnhub_core::types::{DbId, Timestamp};

/// Admin sign-off sub-document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub is_signed: bool,
    #[serde(default)]
    pub signed_by: Option<DbId>,
    #[serde(default)]
    pub signed_at: Option<Timestamp>,
}

/// A row from the `data_records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DataRecord {
    pub id: DbId,
    pub org_unit_id: DbId,
    pub data_type: String,
    pub fields: Json<Vec<FieldValue>>,
    pub is_active: bool,
    pub temp_inactive: bool,
    pub signed: Json<Signature>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DataRecord {
    /// Snapshot stored as a content update's `before`.
    pub fn snapshot(&self) -> DataSnapshot {
        DataSnapshot {
            id: Some(self.id),
            org_unit_id: Some(self.org_unit_id),
            data_type: Some(self.data_type.clone()),
            fields: self.fields.0.clone(),
            is_active: Some(self.is_active),
        }
    }
}

/// A row from the `data_fields` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DataField {
    pub id: DbId,
    pub name: String,
    pub field_type: String,
    pub created_at: Timestamp,
}

/// DTO for creating a field definition.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDataField {
    pub name: String,
    pub field_type: String,
}

/// Request body for the admin bulk status write.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkStatusUpdate {
    pub ids: Vec<DbId>,
    pub is_active: Option<bool>,
    pub temp_inactive: Option<bool>,
}

/// Query parameters for listing records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataRecordFilter {
    pub org_unit_id: Option<DbId>,
    pub data_type: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}
