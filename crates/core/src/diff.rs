//! Field-level diff between two `Data` snapshots.
//!
//! Used to render the before/after view of a pending content update.

use serde::{Deserialize, Serialize};

use crate::content_update::FieldValue;
use crate::types::DbId;

/// The status of a field in a diff comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Added,
    Removed,
    Changed,
    Unchanged,
}

impl DiffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a field diff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDiff {
    pub field_id: DbId,
    pub status: DiffStatus,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
}

/// Compare two field lists by `field_id`.
///
/// Output is ordered by `field_id`.
pub fn diff_fields(before: &[FieldValue], after: &[FieldValue]) -> Vec<FieldDiff> {
    let mut ids: Vec<DbId> = before
        .iter()
        .chain(after.iter())
        .map(|f| f.field_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();

    ids.into_iter()
        .map(|field_id| {
            let old = before.iter().find(|f| f.field_id == field_id);
            let new = after.iter().find(|f| f.field_id == field_id);
            let status = match (old, new) {
                (None, Some(_)) => DiffStatus::Added,
                (Some(_), None) => DiffStatus::Removed,
                (Some(o), Some(n)) if o.value != n.value => DiffStatus::Changed,
                _ => DiffStatus::Unchanged,
            };
            FieldDiff {
                field_id,
                status,
                before: old.map(|f| f.value.clone()),
                after: new.map(|f| f.value.clone()),
            }
        })
        .collect()
}
