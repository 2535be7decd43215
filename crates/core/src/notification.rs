//! Notification dispatch table.
//!
//! Maps a platform event type to a notification kind, and a kind plus the
//! event payload to the title, link, image and optional email template the
//! user receives. Recipients travel in the payload as `recipient_ids`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

pub const EVENT_COURSE_ENROLLED: &str = "course.enrolled";
pub const EVENT_SESSION_SCHEDULED: &str = "session.scheduled";
pub const EVENT_ASSESSMENT_ASSIGNED: &str = "assessment.assigned";
pub const EVENT_SURVEY_ASSIGNED: &str = "survey.assigned";
pub const EVENT_CONTENT_UPDATE_SUBMITTED: &str = "content_update.submitted";
pub const EVENT_CONTENT_UPDATE_APPROVED: &str = "content_update.approved";
pub const EVENT_CONTENT_UPDATE_REJECTED: &str = "content_update.rejected";
pub const EVENT_TRAINING_REQUEST_PUBLISHED: &str = "training_request.published";
pub const EVENT_TRAINING_REQUEST_CANCELED: &str = "training_request.canceled";
pub const EVENT_TRAINING_CREATED: &str = "training_request.training_created";

/// Published by the admin bulk status path. Not a user notification.
pub const EVENT_DATA_BULK_STATUS: &str = "data.bulk_status_changed";

/// Payload key holding the ids of the users to notify.
pub const RECIPIENTS_KEY: &str = "recipient_ids";

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// What a notification is about. Stored in `notifications.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    CourseEnrolled,
    SessionScheduled,
    AssessmentAssigned,
    SurveyAssigned,
    ContentUpdateSubmitted,
    ContentUpdateApproved,
    ContentUpdateRejected,
    TrainingRequestPublished,
    TrainingRequestCanceled,
    TrainingCreated,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CourseEnrolled => "course_enrolled",
            Self::SessionScheduled => "session_scheduled",
            Self::AssessmentAssigned => "assessment_assigned",
            Self::SurveyAssigned => "survey_assigned",
            Self::ContentUpdateSubmitted => "content_update_submitted",
            Self::ContentUpdateApproved => "content_update_approved",
            Self::ContentUpdateRejected => "content_update_rejected",
            Self::TrainingRequestPublished => "training_request_published",
            Self::TrainingRequestCanceled => "training_request_canceled",
            Self::TrainingCreated => "training_created",
        }
    }

    /// Kind raised by an event type, if the event notifies anybody.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        Some(match event_type {
            EVENT_COURSE_ENROLLED => Self::CourseEnrolled,
            EVENT_SESSION_SCHEDULED => Self::SessionScheduled,
            EVENT_ASSESSMENT_ASSIGNED => Self::AssessmentAssigned,
            EVENT_SURVEY_ASSIGNED => Self::SurveyAssigned,
            EVENT_CONTENT_UPDATE_SUBMITTED => Self::ContentUpdateSubmitted,
            EVENT_CONTENT_UPDATE_APPROVED => Self::ContentUpdateApproved,
            EVENT_CONTENT_UPDATE_REJECTED => Self::ContentUpdateRejected,
            EVENT_TRAINING_REQUEST_PUBLISHED => Self::TrainingRequestPublished,
            EVENT_TRAINING_REQUEST_CANCELED => Self::TrainingRequestCanceled,
            EVENT_TRAINING_CREATED => Self::TrainingCreated,
            _ => return None,
        })
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Site values needed to build links and fall back on images.
#[derive(Debug, Clone)]
pub struct LinkContext<'a> {
    pub base_url: &'a str,
    pub default_image: Option<&'a str>,
}

/// Email part of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailTemplate {
    pub subject: String,
    /// Template file name inside the mail template directory.
    pub template: &'static str,
}

/// Everything a recipient gets for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationContent {
    pub title: String,
    pub link: String,
    pub image: Option<String>,
    pub email: Option<EmailTemplate>,
}

fn text<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

fn id(payload: &Value, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_i64)
        .map(|v| v.to_string())
        .unwrap_or_default()
}

/// Render the notification for `kind` from an event payload.
///
/// Missing payload values render as empty strings rather than failing.
pub fn render(kind: NotificationKind, payload: &Value, ctx: &LinkContext<'_>) -> NotificationContent {
    let base = ctx.base_url.trim_end_matches('/');
    let title_of = text(payload, "title").unwrap_or("");

    let (title, link, email) = match kind {
        NotificationKind::CourseEnrolled => (
            format!("You have been enrolled in {title_of}"),
            format!("{base}/courses/{}", id(payload, "course_id")),
            Some(EmailTemplate {
                subject: format!("Enrolled: {title_of}"),
                template: "course_enrolled.html",
            }),
        ),
        NotificationKind::SessionScheduled => (
            format!("Session scheduled: {title_of}"),
            format!(
                "{base}/courses/{}/sessions/{}",
                id(payload, "course_id"),
                id(payload, "session_id")
            ),
            Some(EmailTemplate {
                subject: format!("Session scheduled: {title_of}"),
                template: "session_scheduled.html",
            }),
        ),
        NotificationKind::AssessmentAssigned => (
            format!("New assessment: {title_of}"),
            format!("{base}/assessments/{}", id(payload, "assessment_id")),
            None,
        ),
        NotificationKind::SurveyAssigned => (
            format!("New survey: {title_of}"),
            format!("{base}/surveys/{}", id(payload, "survey_id")),
            None,
        ),
        NotificationKind::ContentUpdateSubmitted => (
            format!(
                "{} update submitted for review",
                text(payload, "update_type").unwrap_or("Content")
            ),
            format!("{base}/content-updates/{}", id(payload, "content_update_id")),
            None,
        ),
        NotificationKind::ContentUpdateApproved => (
            format!(
                "Your {} update was approved",
                text(payload, "update_type").unwrap_or("content")
            ),
            format!("{base}/content-updates/{}", id(payload, "content_update_id")),
            None,
        ),
        NotificationKind::ContentUpdateRejected => (
            format!(
                "Your {} update was rejected",
                text(payload, "update_type").unwrap_or("content")
            ),
            format!("{base}/content-updates/{}", id(payload, "content_update_id")),
            Some(EmailTemplate {
                subject: "Your content update was rejected".to_string(),
                template: "content_update_rejected.html",
            }),
        ),
        NotificationKind::TrainingRequestPublished => (
            format!("Training available: {title_of}"),
            format!("{base}/training-requests/{}", id(payload, "training_request_id")),
            None,
        ),
        NotificationKind::TrainingRequestCanceled => (
            format!("Training canceled: {title_of}"),
            format!("{base}/training-requests/{}", id(payload, "training_request_id")),
            None,
        ),
        NotificationKind::TrainingCreated => (
            format!("Training created: {title_of}"),
            format!("{base}/courses/{}", id(payload, "course_id")),
            Some(EmailTemplate {
                subject: format!("Training created: {title_of}"),
                template: "training_created.html",
            }),
        ),
    };

    let image = text(payload, "image")
        .or(ctx.default_image)
        .map(str::to_string);

    NotificationContent {
        title,
        link,
        image,
        email,
    }
}

/// Users an event is addressed to, deduplicated in payload order.
pub fn recipients(payload: &Value) -> Vec<DbId> {
    let ids: Vec<DbId> = payload
        .get(RECIPIENTS_KEY)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();
    crate::course::merge_attendees(&ids, &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CTX: LinkContext<'static> = LinkContext {
        base_url: "https://learn.example.org/",
        default_image: Some("https://learn.example.org/logo.png"),
    };

    #[test]
    fn every_kind_round_trips_through_its_event_type() {
        let pairs = [
            (EVENT_COURSE_ENROLLED, NotificationKind::CourseEnrolled),
            (EVENT_SESSION_SCHEDULED, NotificationKind::SessionScheduled),
            (EVENT_ASSESSMENT_ASSIGNED, NotificationKind::AssessmentAssigned),
            (EVENT_SURVEY_ASSIGNED, NotificationKind::SurveyAssigned),
            (EVENT_CONTENT_UPDATE_SUBMITTED, NotificationKind::ContentUpdateSubmitted),
            (EVENT_CONTENT_UPDATE_APPROVED, NotificationKind::ContentUpdateApproved),
            (EVENT_CONTENT_UPDATE_REJECTED, NotificationKind::ContentUpdateRejected),
            (EVENT_TRAINING_REQUEST_PUBLISHED, NotificationKind::TrainingRequestPublished),
            (EVENT_TRAINING_REQUEST_CANCELED, NotificationKind::TrainingRequestCanceled),
            (EVENT_TRAINING_CREATED, NotificationKind::TrainingCreated),
        ];
        for (event_type, kind) in pairs {
            assert_eq!(NotificationKind::from_event_type(event_type), Some(kind));
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                json!(kind.as_str())
            );
        }
        assert_eq!(NotificationKind::from_event_type(EVENT_DATA_BULK_STATUS), None);
    }

    #[test]
    fn enrollment_renders_link_and_email() {
        let content = render(
            NotificationKind::CourseEnrolled,
            &json!({"title": "First aid", "course_id": 7}),
            &CTX,
        );
        assert_eq!(content.title, "You have been enrolled in First aid");
        assert_eq!(content.link, "https://learn.example.org/courses/7");
        assert_eq!(content.image.as_deref(), Some("https://learn.example.org/logo.png"));
        assert_eq!(content.email.unwrap().template, "course_enrolled.html");
    }

    #[test]
    fn payload_image_overrides_default() {
        let content = render(
            NotificationKind::SurveyAssigned,
            &json!({"title": "Feedback", "survey_id": 3, "image": "x.png"}),
            &CTX,
        );
        assert_eq!(content.image.as_deref(), Some("x.png"));
        assert!(content.email.is_none());
    }

    #[test]
    fn recipients_are_deduplicated() {
        assert_eq!(recipients(&json!({"recipient_ids": [3, 1, 3]})), vec![3, 1]);
        assert!(recipients(&json!({})).is_empty());
        assert!(recipients(&json!({"recipient_ids": "nope"})).is_empty());
    }
}
