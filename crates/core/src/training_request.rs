//! Training-request state machine.
//!
//! ```text
//! PENDING --publish--> PUBLISHED --create_training--> TRAINING_CREATED
//!    |                     |
//!    +------cancel---------+-----> CANCELED
//! ```

use serde::{Deserialize, Serialize};

use crate::course::merge_attendees;
use crate::error::CoreError;
use crate::notification::{
    EVENT_TRAINING_CREATED, EVENT_TRAINING_REQUEST_CANCELED, EVENT_TRAINING_REQUEST_PUBLISHED,
};
use crate::types::DbId;

/// Lifecycle state of a training request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Published,
    Canceled,
    TrainingCreated,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Published => "PUBLISHED",
            Self::Canceled => "CANCELED",
            Self::TrainingCreated => "TRAINING_CREATED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "PUBLISHED" => Ok(Self::Published),
            "CANCELED" => Ok(Self::Canceled),
            "TRAINING_CREATED" => Ok(Self::TrainingCreated),
            other => Err(CoreError::Validation(format!(
                "Unknown training request status '{other}'"
            ))),
        }
    }
}

/// A requested state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Publish,
    Cancel,
    CreateTraining,
}

impl Transition {
    fn name(&self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Cancel => "cancel",
            Self::CreateTraining => "create training for",
        }
    }

    /// Event type published after the transition succeeds.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Publish => EVENT_TRAINING_REQUEST_PUBLISHED,
            Self::Cancel => EVENT_TRAINING_REQUEST_CANCELED,
            Self::CreateTraining => EVENT_TRAINING_CREATED,
        }
    }
}

/// Target state of `transition` from `from`, or `Conflict` when the machine
/// does not allow it.
pub fn apply_transition(from: RequestStatus, transition: Transition) -> Result<RequestStatus, CoreError> {
    use RequestStatus::*;
    match (from, transition) {
        (Pending, Transition::Publish) => Ok(Published),
        (Pending | Published, Transition::Cancel) => Ok(Canceled),
        (Published, Transition::CreateTraining) => Ok(TrainingCreated),
        (from, t) => Err(CoreError::Conflict(format!(
            "Cannot {} a {} training request",
            t.name(),
            from.as_str()
        ))),
    }
}

/// Add a learner to a published request's pending list.
///
/// Joining twice is a no-op; joining a request that is not published is a
/// conflict.
pub fn join(status: RequestStatus, pending: &[DbId], user_id: DbId) -> Result<Vec<DbId>, CoreError> {
    if status != RequestStatus::Published {
        return Err(CoreError::Conflict(format!(
            "Only PUBLISHED training requests can be joined, this one is {}",
            status.as_str()
        )));
    }
    Ok(merge_attendees(pending, &[user_id]))
}

/// Attendee lists after a training is created from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTraining {
    pub course_attendees: Vec<DbId>,
    pub completed: Vec<DbId>,
    pub pending: Vec<DbId>,
}

/// Move every pending attendee into the course and the completed list.
pub fn create_training(
    status: RequestStatus,
    pending: &[DbId],
    completed: &[DbId],
    course_attendees: &[DbId],
) -> Result<CreatedTraining, CoreError> {
    apply_transition(status, Transition::CreateTraining)?;
    Ok(CreatedTraining {
        course_attendees: merge_attendees(course_attendees, pending),
        completed: merge_attendees(completed, pending),
        pending: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn happy_path() {
        let published = apply_transition(RequestStatus::Pending, Transition::Publish).unwrap();
        assert_eq!(published, RequestStatus::Published);
        assert_eq!(
            apply_transition(published, Transition::CreateTraining).unwrap(),
            RequestStatus::TrainingCreated
        );
    }

    #[test]
    fn transitions_outside_the_machine_conflict() {
        assert_matches!(
            apply_transition(RequestStatus::Pending, Transition::CreateTraining),
            Err(CoreError::Conflict(_))
        );
        assert_matches!(
            apply_transition(RequestStatus::Canceled, Transition::Publish),
            Err(CoreError::Conflict(_))
        );
        assert_matches!(
            apply_transition(RequestStatus::TrainingCreated, Transition::Cancel),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn join_requires_published_and_dedupes() {
        assert_matches!(
            join(RequestStatus::Pending, &[], 1),
            Err(CoreError::Conflict(_))
        );
        let pending = join(RequestStatus::Published, &[1], 2).unwrap();
        assert_eq!(pending, vec![1, 2]);
        assert_eq!(join(RequestStatus::Published, &pending, 2).unwrap(), vec![1, 2]);
    }

    #[test]
    fn create_training_moves_pending_attendees() {
        let created = create_training(RequestStatus::Published, &[2, 3], &[1], &[1, 2]).unwrap();
        assert_eq!(created.course_attendees, vec![1, 2, 3]);
        assert_eq!(created.completed, vec![1, 2, 3]);
        assert!(created.pending.is_empty());
    }

    #[test]
    fn status_round_trips_through_text() {
        for s in [
            RequestStatus::Pending,
            RequestStatus::Published,
            RequestStatus::Canceled,
            RequestStatus::TrainingCreated,
        ] {
            assert_eq!(RequestStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(RequestStatus::parse("DONE").is_err());
    }
}
