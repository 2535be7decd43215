pub mod assessments;
pub mod attempts;
pub mod auth;
pub mod content_updates;
pub mod courses;
pub mod data;
pub mod notifications;
pub mod org_units;
mod ratings;
pub mod sessions;
pub mod surveys;
pub mod training_requests;
pub mod users;
