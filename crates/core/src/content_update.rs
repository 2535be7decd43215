//! Content-update approval workflow.
//!
//! A content update proposes a change to a `Data` record. It starts
//! `PENDING` and is either approved, which writes to the record, or
//! rejected. This module holds the state machine and the pure parts of each
//! approval branch; the repository layer applies the result.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Message used when an update carries a type the workflow does not know.
pub const INVALID_LOG: &str = "Invalid Log";

/// Maximum length of a rejection reason.
pub const MAX_REASON_LENGTH: usize = 2000;

// ---------------------------------------------------------------------------
// Update type / status
// ---------------------------------------------------------------------------

/// Kind of change a content update proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateType {
    #[serde(rename = "EDIT")]
    Edit,
    #[serde(rename = "ADD SERVICE")]
    AddService,
    #[serde(rename = "DELETE")]
    Delete,
    #[serde(rename = "OU CHANGE")]
    OuChange,
}

impl UpdateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edit => "EDIT",
            Self::AddService => "ADD SERVICE",
            Self::Delete => "DELETE",
            Self::OuChange => "OU CHANGE",
        }
    }

    /// Parse the stored `update_type` column.
    ///
    /// Anything outside the four known values fails with [`INVALID_LOG`].
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "EDIT" => Ok(Self::Edit),
            "ADD SERVICE" => Ok(Self::AddService),
            "DELETE" => Ok(Self::Delete),
            "OU CHANGE" => Ok(Self::OuChange),
            _ => Err(CoreError::Validation(INVALID_LOG.to_string())),
        }
    }

    /// Whether approving this type changes which records a unit holds, and so
    /// requires a counter recount.
    pub fn affects_counters(&self) -> bool {
        !matches!(self, Self::Edit)
    }
}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a content update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateStatus {
    Pending,
    Approved,
    Rejected,
}

impl UpdateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(CoreError::Validation(format!(
                "Unknown content update status '{other}'"
            ))),
        }
    }
}

/// Only pending updates may be approved or rejected.
pub fn ensure_pending(status: &str) -> Result<(), CoreError> {
    match UpdateStatus::parse(status)? {
        UpdateStatus::Pending => Ok(()),
        other => Err(CoreError::Conflict(format!(
            "Content update is already {}",
            other.as_str()
        ))),
    }
}

/// Undo-delete applies to approved `DELETE` updates only.
pub fn ensure_undo_allowed(update_type: &str, status: &str) -> Result<(), CoreError> {
    if UpdateType::parse(update_type)? != UpdateType::Delete {
        return Err(CoreError::Validation(
            "Only DELETE updates can be undone".to_string(),
        ));
    }
    if UpdateStatus::parse(status)? != UpdateStatus::Approved {
        return Err(CoreError::Conflict(
            "Only approved deletions can be undone".to_string(),
        ));
    }
    Ok(())
}

/// Validate a rejection reason.
pub fn validate_reason(reason: &str) -> Result<(), CoreError> {
    if reason.trim().is_empty() {
        return Err(CoreError::Validation(
            "A rejection reason is required".to_string(),
        ));
    }
    if reason.len() > MAX_REASON_LENGTH {
        return Err(CoreError::Validation(format!(
            "Rejection reason must be at most {MAX_REASON_LENGTH} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// One entry of a `Data` record's `fields` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub field_id: DbId,
    pub value: serde_json::Value,
    #[serde(default)]
    pub was_edited: bool,
}

/// The `before` / `after` payload of a content update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSnapshot {
    #[serde(default)]
    pub id: Option<DbId>,
    #[serde(default)]
    pub org_unit_id: Option<DbId>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldValue>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Check that a proposal carries what its type needs.
pub fn validate_proposal(
    update_type: UpdateType,
    data_id: Option<DbId>,
    after: &DataSnapshot,
) -> Result<(), CoreError> {
    match update_type {
        UpdateType::Edit => {
            require_data_id(data_id)?;
            if after.fields.is_empty() {
                return Err(CoreError::Validation(
                    "An EDIT update must change at least one field".to_string(),
                ));
            }
        }
        UpdateType::AddService => {
            if after.org_unit_id.is_none() {
                return Err(CoreError::Validation(
                    "An ADD SERVICE update requires after.org_unit_id".to_string(),
                ));
            }
            match after.data_type.as_deref().map(str::trim) {
                Some(t) if !t.is_empty() => {}
                _ => {
                    return Err(CoreError::Validation(
                        "An ADD SERVICE update requires after.data_type".to_string(),
                    ))
                }
            }
        }
        UpdateType::Delete => require_data_id(data_id)?,
        UpdateType::OuChange => {
            require_data_id(data_id)?;
            if after.org_unit_id.is_none() {
                return Err(CoreError::Validation(
                    "An OU CHANGE update requires after.org_unit_id".to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn require_data_id(data_id: Option<DbId>) -> Result<(), CoreError> {
    match data_id {
        Some(_) => Ok(()),
        None => Err(CoreError::Validation(
            "data_id is required for this update type".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// ADD SERVICE
// ---------------------------------------------------------------------------

/// Next sequential `Data` id: the current maximum plus one, or 1 when the
/// collection is empty.
pub fn next_data_id(max_existing: Option<DbId>) -> DbId {
    max_existing.unwrap_or(0) + 1
}

/// Id to insert an ADD SERVICE record under: the requested id if the
/// snapshot carries one, the next sequential id otherwise.
pub fn resolve_new_id(after: &DataSnapshot, max_existing: Option<DbId>) -> DbId {
    after.id.unwrap_or_else(|| next_data_id(max_existing))
}

// ---------------------------------------------------------------------------
// EDIT
// ---------------------------------------------------------------------------

/// A field as submitted by the approver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewedField {
    pub field_id: DbId,
    pub value: serde_json::Value,
    pub checked: bool,
}

/// A difference between what was requested and what the approver applied.
///
/// `approved` is `None` when the approver left the field unchecked;
/// `requested` is `None` when the approver added a field the request did not
/// contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminChange {
    pub field_id: DbId,
    pub requested: Option<serde_json::Value>,
    pub approved: Option<serde_json::Value>,
}

/// Result of applying an approved EDIT to a record's fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    /// The record's new `fields` array.
    pub fields: Vec<FieldValue>,
    /// Ids of the fields that were written, in review order.
    pub written: Vec<DbId>,
    /// Fields where the approver deviated from the request.
    pub admin_change: Vec<AdminChange>,
}

/// Approver review that accepts every requested field as-is.
pub fn accept_all(requested: &[FieldValue]) -> Vec<ReviewedField> {
    requested
        .iter()
        .map(|f| ReviewedField {
            field_id: f.field_id,
            value: f.value.clone(),
            checked: true,
        })
        .collect()
}

/// Apply the checked fields of a review to the record's current fields.
///
/// Checked fields overwrite an existing entry or are appended as a new one,
/// and are marked `was_edited`. Unchecked fields leave the record untouched.
pub fn apply_edit(
    current: &[FieldValue],
    requested: &[FieldValue],
    reviewed: &[ReviewedField],
) -> EditOutcome {
    let mut fields = current.to_vec();
    let mut written = Vec::new();

    for review in reviewed.iter().filter(|r| r.checked) {
        match fields.iter_mut().find(|f| f.field_id == review.field_id) {
            Some(existing) => {
                existing.value = review.value.clone();
                existing.was_edited = true;
            }
            None => fields.push(FieldValue {
                field_id: review.field_id,
                value: review.value.clone(),
                was_edited: true,
            }),
        }
        written.push(review.field_id);
    }

    EditOutcome {
        fields,
        written,
        admin_change: admin_changes(requested, reviewed),
    }
}

/// Fields where the approver's review differs from the original request.
pub fn admin_changes(requested: &[FieldValue], reviewed: &[ReviewedField]) -> Vec<AdminChange> {
    let mut changes = Vec::new();

    for req in requested {
        match reviewed.iter().find(|r| r.field_id == req.field_id) {
            Some(r) if r.checked && r.value == req.value => {}
            Some(r) if r.checked => changes.push(AdminChange {
                field_id: req.field_id,
                requested: Some(req.value.clone()),
                approved: Some(r.value.clone()),
            }),
            _ => changes.push(AdminChange {
                field_id: req.field_id,
                requested: Some(req.value.clone()),
                approved: None,
            }),
        }
    }

    for r in reviewed.iter().filter(|r| r.checked) {
        if !requested.iter().any(|req| req.field_id == r.field_id) {
            changes.push(AdminChange {
                field_id: r.field_id,
                requested: None,
                approved: Some(r.value.clone()),
            });
        }
    }

    changes
}
