//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod assessment;
pub mod attempt;
pub mod content_update;
pub mod course;
pub mod data_record;
pub mod mail_log;
pub mod notification;
pub mod org_unit;
pub mod session;
pub mod survey;
pub mod training_request;
pub mod user;
