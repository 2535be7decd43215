//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Methods that must share a
//! transaction with other repositories take `&mut Transaction<'_, Postgres>` instead.

pub mod assessment_repo;
pub mod attempt_repo;
pub mod content_update_repo;
pub mod course_repo;
pub mod data_field_repo;
pub mod data_record_repo;
pub mod mail_log_repo;
pub mod notification_repo;
pub mod org_unit_repo;
pub mod session_repo;
pub mod survey_repo;
pub mod training_request_repo;
pub mod user_repo;

pub use assessment_repo::AssessmentRepo;
pub use attempt_repo::AttemptRepo;
pub use content_update_repo::ContentUpdateRepo;
pub use course_repo::CourseRepo;
pub use data_field_repo::DataFieldRepo;
pub use data_record_repo::DataRecordRepo;
pub use mail_log_repo::MailLogRepo;
pub use notification_repo::NotificationRepo;
pub use org_unit_repo::{OrgUnitRepo, OrgUnitTypeRepo};
pub use session_repo::SessionRepo;
pub use survey_repo::SurveyRepo;
pub use training_request_repo::TrainingRequestRepo;
pub use user_repo::UserRepo;
