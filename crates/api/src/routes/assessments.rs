//! Route definitions for `/assessments` and `/surveys`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{assessments, attempts, surveys};
use crate::state::AppState;

/// Routes mounted at `/assessments`.
///
/// ```text
/// GET, POST      /                  -> list, create
/// GET, PUT       /{id}              -> get, update
/// POST, DELETE   /{id}/attendees    -> assign, unassign
/// GET, POST      /{id}/attempts     -> my attempts, submit (graded)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(assessments::list_assessments).post(assessments::create_assessment),
        )
        .route(
            "/{id}",
            get(assessments::get_assessment).put(assessments::update_assessment),
        )
        .route(
            "/{id}/attendees",
            post(assessments::assign_assessment).delete(assessments::unassign_assessment),
        )
        .route(
            "/{id}/attempts",
            get(attempts::my_assessment_attempts).post(attempts::submit_assessment_attempt),
        )
}

/// Routes mounted at `/surveys`. Same shape as assessments; attempts are
/// stored ungraded.
pub fn surveys_router() -> Router<AppState> {
    Router::new()
        .route("/", get(surveys::list_surveys).post(surveys::create_survey))
        .route("/{id}", get(surveys::get_survey).put(surveys::update_survey))
        .route(
            "/{id}/attendees",
            post(surveys::assign_survey).delete(surveys::unassign_survey),
        )
        .route(
            "/{id}/attempts",
            get(attempts::my_survey_attempts).post(attempts::submit_survey_attempt),
        )
}
