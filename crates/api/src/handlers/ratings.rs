//! Rating reads and writes shared by courses and sessions.

use learnhub_core::error::CoreError;
use learnhub_core::rating::{backfill, for_participants, summarize, upsert, RatingEntry};
use learnhub_core::types::DbId;
use learnhub_db::models::course::{RatingView, SubmitRating};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

/// Which list a submission writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RatingTarget {
    /// An attendee's rating of the course or session.
    User,
    /// A rating given to one of the trainers.
    Trainer,
}

/// Participants and their stored rating lists.
pub(crate) struct RatingLists<'a> {
    pub attendees: &'a [DbId],
    pub trainers: &'a [DbId],
    pub user_rating: &'a [RatingEntry],
    pub trainer_rating: &'a [RatingEntry],
}

/// Backfilled lists as they are stored, plus whether they differ from what
/// is stored now.
#[derive(Debug)]
pub(crate) struct Backfilled {
    attendees: Vec<DbId>,
    trainers: Vec<DbId>,
    pub user_rating: Vec<RatingEntry>,
    pub trainer_rating: Vec<RatingEntry>,
    pub changed: bool,
}

impl Backfilled {
    /// The response view: current participants only, summaries over them.
    pub fn view(self) -> RatingView {
        let user_rating = for_participants(&self.attendees, &self.user_rating);
        let trainer_rating = for_participants(&self.trainers, &self.trainer_rating);
        RatingView {
            user_summary: summarize(&user_rating),
            trainer_summary: summarize(&trainer_rating),
            user_rating,
            trainer_rating,
        }
    }
}

/// Add a zero entry for every attendee and trainer without one.
pub(crate) fn backfill_lists(lists: &RatingLists<'_>) -> Backfilled {
    let (user_rating, users_changed) = backfill(lists.attendees, lists.user_rating);
    let (trainer_rating, trainers_changed) = backfill(lists.trainers, lists.trainer_rating);
    Backfilled {
        attendees: lists.attendees.to_vec(),
        trainers: lists.trainers.to_vec(),
        user_rating,
        trainer_rating,
        changed: users_changed || trainers_changed,
    }
}

/// Apply a submission to the backfilled lists.
///
/// Attendees rate as themselves; naming another attendee requires trainer
/// or admin rights. A trainer rating must name the trainer and may only be
/// given by a participant or an admin.
pub(crate) fn apply_submission(
    auth: &AuthUser,
    target: RatingTarget,
    lists: &RatingLists<'_>,
    input: SubmitRating,
) -> AppResult<Backfilled> {
    let mut filled = backfill_lists(lists);
    let now = chrono::Utc::now();
    let privileged = auth.is_admin() || lists.trainers.contains(&auth.user_id);

    match target {
        RatingTarget::User => {
            let user_id = input.user_id.unwrap_or(auth.user_id);
            if user_id != auth.user_id && !privileged {
                return Err(AppError::Core(CoreError::Forbidden(
                    "Cannot submit a rating on behalf of another user".into(),
                )));
            }
            filled.user_rating = upsert(
                lists.attendees,
                &filled.user_rating,
                user_id,
                input.score,
                input.comment,
                now,
            )?;
        }
        RatingTarget::Trainer => {
            let trainer_id = input.user_id.ok_or_else(|| {
                AppError::Core(CoreError::Validation("user_id of the trainer is required".into()))
            })?;
            if !privileged && !lists.attendees.contains(&auth.user_id) {
                return Err(AppError::Core(CoreError::Forbidden(
                    "Only participants can rate trainers".into(),
                )));
            }
            filled.trainer_rating = upsert(
                lists.trainers,
                &filled.trainer_rating,
                trainer_id,
                input.score,
                input.comment,
                now,
            )?;
        }
    }
    filled.changed = true;
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn learner(id: DbId) -> AuthUser {
        AuthUser {
            user_id: id,
            role: "learner".into(),
        }
    }

    fn lists<'a>(attendees: &'a [DbId], trainers: &'a [DbId]) -> RatingLists<'a> {
        RatingLists {
            attendees,
            trainers,
            user_rating: &[],
            trainer_rating: &[],
        }
    }

    #[test]
    fn backfill_marks_missing_entries_as_changed() {
        let filled = backfill_lists(&lists(&[1, 2], &[9]));
        assert!(filled.changed);
        assert_eq!(filled.user_rating.len(), 2);
        assert_eq!(filled.trainer_rating.len(), 1);
        assert!(filled.user_rating.iter().all(|e| e.score == 0));
    }

    #[test]
    fn view_hides_former_attendees_but_keeps_their_entries() {
        let stored = [
            RatingEntry {
                user_id: 7,
                score: 5,
                comment: None,
                rated_at: None,
            },
        ];
        let lists = RatingLists {
            attendees: &[1],
            trainers: &[],
            user_rating: &stored,
            trainer_rating: &[],
        };
        let filled = backfill_lists(&lists);
        assert_eq!(filled.user_rating.len(), 2);

        let view = filled.view();
        assert_eq!(view.user_rating.len(), 1);
        assert_eq!(view.user_rating[0].user_id, 1);
        assert_eq!(view.user_summary.average, None);
    }

    #[test]
    fn attendee_rates_as_themselves() {
        let input = SubmitRating {
            user_id: None,
            score: 4,
            comment: None,
        };
        let filled =
            apply_submission(&learner(2), RatingTarget::User, &lists(&[1, 2], &[9]), input)
                .unwrap();
        let view = filled.view();
        assert_eq!(view.user_rating[1].score, 4);
        assert_eq!(view.user_summary.average, Some(4.0));
    }

    #[test]
    fn learner_cannot_rate_for_someone_else() {
        let input = SubmitRating {
            user_id: Some(1),
            score: 4,
            comment: None,
        };
        let result =
            apply_submission(&learner(2), RatingTarget::User, &lists(&[1, 2], &[9]), input);
        assert_matches!(result, Err(AppError::Core(CoreError::Forbidden(_))));
    }

    #[test]
    fn outsiders_cannot_rate_trainers() {
        let input = SubmitRating {
            user_id: Some(9),
            score: 5,
            comment: None,
        };
        let result =
            apply_submission(&learner(7), RatingTarget::Trainer, &lists(&[1, 2], &[9]), input);
        assert_matches!(result, Err(AppError::Core(CoreError::Forbidden(_))));
    }
}
