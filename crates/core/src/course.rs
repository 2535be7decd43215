//! Courses and sessions: titles, schedules, attendee lists and item lists.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Maximum length of a course, session, survey or assessment title.
pub const MAX_TITLE_LENGTH: usize = 300;

/// Kind of sub-resource a course or session item references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Survey,
    Assessment,
    Program,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Survey => "survey",
            Self::Assessment => "assessment",
            Self::Program => "program",
        }
    }
}

/// One entry of an `items` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionItem {
    pub kind: ItemKind,
    pub ref_id: DbId,
}

/// Validate a title.
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Title must not be empty".to_string()));
    }
    if trimmed.len() > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// A session must end after it starts.
pub fn validate_schedule(starts_at: Timestamp, ends_at: Timestamp) -> Result<(), CoreError> {
    if ends_at <= starts_at {
        return Err(CoreError::Validation(
            "Session must end after it starts".to_string(),
        ));
    }
    Ok(())
}

/// Append an item, rejecting a reference that is already listed.
pub fn add_item(items: &[SessionItem], item: SessionItem) -> Result<Vec<SessionItem>, CoreError> {
    if items.contains(&item) {
        return Err(CoreError::Conflict(format!(
            "{} {} is already part of this list",
            item.kind.as_str(),
            item.ref_id
        )));
    }
    let mut next = items.to_vec();
    next.push(item);
    Ok(next)
}

/// Remove an item; `NotFound` when it is not listed.
pub fn remove_item(items: &[SessionItem], item: SessionItem) -> Result<Vec<SessionItem>, CoreError> {
    if !items.contains(&item) {
        return Err(CoreError::NotFound {
            entity: item.kind.as_str(),
            id: item.ref_id,
        });
    }
    Ok(items.iter().copied().filter(|i| *i != item).collect())
}

/// Union of two id lists, keeping first-seen order and dropping duplicates.
pub fn merge_attendees(current: &[DbId], added: &[DbId]) -> Vec<DbId> {
    let mut seen = HashSet::new();
    current
        .iter()
        .chain(added.iter())
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

/// `current` without any of `removed`.
pub fn remove_attendees(current: &[DbId], removed: &[DbId]) -> Vec<DbId> {
    current
        .iter()
        .copied()
        .filter(|id| !removed.contains(id))
        .collect()
}
