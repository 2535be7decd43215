//! Attendee and trainer ratings stored on courses and sessions.
//!
//! Ratings live in a JSONB array keyed by user id. Reading a rating list
//! backfills a zero-score entry for every participant that has none. Entries
//! of users who stopped being participants stay stored, so a re-enrolled
//! attendee gets their score back; views only show current participants.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Lowest accepted score. Zero also marks "not rated yet".
pub const MIN_SCORE: i32 = 0;

/// Highest accepted score (five stars).
pub const MAX_SCORE: i32 = 5;

/// Maximum length of a rating comment.
pub const MAX_COMMENT_LENGTH: usize = 1000;

/// One entry of a `user_rating` / `trainer_rating` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingEntry {
    pub user_id: DbId,
    pub score: i32,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub rated_at: Option<Timestamp>,
}

impl RatingEntry {
    /// Placeholder entry for a participant who has not rated yet.
    pub fn unrated(user_id: DbId) -> Self {
        Self {
            user_id,
            score: 0,
            comment: None,
            rated_at: None,
        }
    }

    pub fn is_rated(&self) -> bool {
        self.score > 0
    }
}

/// Aggregate of a rating list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary {
    pub sum: f64,
    pub count: i64,
    pub average: Option<f64>,
}

/// Average of `count` values summing to `sum`; `None` when there are none.
pub fn average(sum: f64, count: i64) -> Option<f64> {
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Mean of a slice of scores.
pub fn mean(scores: &[f64]) -> Option<f64> {
    average(scores.iter().sum(), scores.len() as i64)
}

/// Append an unrated entry for every participant without one.
///
/// Stored entries are kept as they are, including those of former
/// participants. The boolean is `true` when anything was appended and the
/// list therefore needs to be written back.
pub fn backfill(participants: &[DbId], existing: &[RatingEntry]) -> (Vec<RatingEntry>, bool) {
    let mut seen: HashSet<DbId> = existing.iter().map(|e| e.user_id).collect();
    let mut entries = existing.to_vec();
    for &user_id in participants {
        if seen.insert(user_id) {
            entries.push(RatingEntry::unrated(user_id));
        }
    }

    let changed = entries.len() != existing.len();
    (entries, changed)
}

/// The entries of current participants, in participant order.
///
/// Duplicate participant ids collapse to the first; a participant without a
/// stored entry shows as unrated.
pub fn for_participants(participants: &[DbId], entries: &[RatingEntry]) -> Vec<RatingEntry> {
    let mut seen = HashSet::new();
    participants
        .iter()
        .filter(|id| seen.insert(**id))
        .map(|&user_id| {
            entries
                .iter()
                .find(|e| e.user_id == user_id)
                .cloned()
                .unwrap_or_else(|| RatingEntry::unrated(user_id))
        })
        .collect()
}

/// Validate a submitted score and comment.
pub fn validate_score(score: i32, comment: Option<&str>) -> Result<(), CoreError> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(CoreError::Validation(format!(
            "Score must be between {MIN_SCORE} and {MAX_SCORE}, got {score}"
        )));
    }
    if comment.is_some_and(|c| c.len() > MAX_COMMENT_LENGTH) {
        return Err(CoreError::Validation(format!(
            "Comment must be at most {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Record `user_id`'s rating in the stored list.
///
/// The user must be one of `participants`; their entry is replaced in place
/// and every other stored entry is kept.
pub fn upsert(
    participants: &[DbId],
    existing: &[RatingEntry],
    user_id: DbId,
    score: i32,
    comment: Option<String>,
    now: Timestamp,
) -> Result<Vec<RatingEntry>, CoreError> {
    validate_score(score, comment.as_deref())?;
    if !participants.contains(&user_id) {
        return Err(CoreError::Forbidden(format!(
            "User {user_id} is not a participant and cannot be rated"
        )));
    }

    let (mut entries, _) = backfill(participants, existing);
    if let Some(entry) = entries.iter_mut().find(|e| e.user_id == user_id) {
        entry.score = score;
        entry.comment = comment;
        entry.rated_at = Some(now);
    }
    Ok(entries)
}

/// Summarize the rated entries of a list; unrated placeholders are skipped.
pub fn summarize(entries: &[RatingEntry]) -> RatingSummary {
    let rated: Vec<f64> = entries
        .iter()
        .filter(|e| e.is_rated())
        .map(|e| f64::from(e.score))
        .collect();
    let sum: f64 = rated.iter().sum();
    let count = rated.len() as i64;
    RatingSummary {
        sum,
        count,
        average: average(sum, count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn rated(user_id: DbId, score: i32) -> RatingEntry {
        RatingEntry {
            user_id,
            score,
            comment: None,
            rated_at: None,
        }
    }

    #[test]
    fn average_of_nothing_is_none() {
        assert_eq!(average(0.0, 0), None);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn average_of_three_and_five_is_four() {
        assert_eq!(mean(&[3.0, 5.0]), Some(4.0));
        assert_eq!(average(8.0, 2), Some(4.0));
    }

    #[test]
    fn backfill_adds_missing_attendees_with_zero() {
        let existing = vec![rated(2, 4)];
        let (entries, changed) = backfill(&[1, 2, 3], &existing);

        assert!(changed);
        assert_eq!(entries, vec![rated(2, 4), rated(1, 0), rated(3, 0)]);
        assert_eq!(
            for_participants(&[1, 2, 3], &entries),
            vec![rated(1, 0), rated(2, 4), rated(3, 0)]
        );
    }

    #[test]
    fn backfill_is_idempotent() {
        let (first, _) = backfill(&[1, 2], &[rated(2, 5)]);
        let (second, changed) = backfill(&[1, 2], &first);

        assert!(!changed);
        assert_eq!(first, second);
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn re_enrolled_attendee_keeps_their_score() {
        // User 1 rated 5, then left the course.
        let (stored, changed) = backfill(&[2], &[rated(1, 5)]);
        assert!(changed);
        assert_eq!(stored, vec![rated(1, 5), rated(2, 0)]);
        assert_eq!(for_participants(&[2], &stored), vec![rated(2, 0)]);

        // Re-enrolled: the stored score comes back.
        let (stored, changed) = backfill(&[1, 2], &stored);
        assert!(!changed);
        assert_eq!(for_participants(&[1, 2], &stored), vec![rated(1, 5), rated(2, 0)]);
    }

    #[test]
    fn view_collapses_duplicate_participants() {
        let (stored, _) = backfill(&[1, 1, 3], &[rated(1, 2), rated(9, 5)]);
        assert_eq!(stored.len(), 3);
        assert_eq!(for_participants(&[1, 1, 3], &stored), vec![rated(1, 2), rated(3, 0)]);
    }

    #[test]
    fn upsert_replaces_existing_entry() {
        let now = chrono::Utc::now();
        let entries =
            upsert(&[1, 2], &[rated(1, 2), rated(8, 3)], 1, 5, Some("great".into()), now).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].score, 5);
        assert_eq!(entries[0].comment.as_deref(), Some("great"));
        assert_eq!(entries[0].rated_at, Some(now));
        assert_eq!(entries[1], rated(8, 3));
        assert_eq!(entries[2], rated(2, 0));
    }

    #[test]
    fn upsert_rejects_outsiders_and_bad_scores() {
        let now = chrono::Utc::now();
        assert_matches!(
            upsert(&[1], &[], 2, 3, None, now),
            Err(CoreError::Forbidden(_))
        );
        assert_matches!(
            upsert(&[1], &[], 1, 6, None, now),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            upsert(&[1], &[], 1, -1, None, now),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn summary_skips_unrated() {
        let summary = summarize(&[rated(1, 3), rated(2, 0), rated(3, 5)]);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.average, Some(4.0));

        let empty = summarize(&[rated(1, 0)]);
        assert_eq!(empty.count, 0);
        assert_eq!(empty.average, None);
    }
}
