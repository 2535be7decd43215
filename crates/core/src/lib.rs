//! LearnHub domain logic.
//!
//! Pure functions and types shared by the database, event and API layers.
//! Nothing in this crate performs I/O.

pub mod assessment;
pub mod channels;
pub mod content_update;
pub mod course;
pub mod diff;
pub mod error;
pub mod notification;
pub mod org_unit;
pub mod preview;
pub mod rating;
pub mod results;
pub mod roles;
pub mod training_request;
pub mod types;
pub mod users;
