//! Route definitions for `/courses`, including nested sessions.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{courses, sessions};
use crate::state::AppState;

/// Routes mounted at `/courses`.
///
/// ```text
/// GET, POST            /                                       -> list, create
/// GET, PUT, DELETE     /{id}                                   -> get, update, delete (admin)
/// POST, DELETE         /{id}/attendees                         -> enroll, remove
/// POST                 /{id}/items                             -> add item
/// DELETE               /{id}/items/{kind}/{ref_id}             -> remove item
/// GET                  /{id}/rating                            -> backfilled ratings
/// POST                 /{id}/rating/user                       -> rate the course
/// POST                 /{id}/rating/trainer                    -> rate a trainer
/// GET                  /{id}/results                           -> star-rating averages
/// GET, POST            /{id}/sessions                          -> list, schedule
/// GET, PUT, DELETE     /{id}/sessions/{session_id}             -> get, update, delete
/// POST, DELETE         /{id}/sessions/{session_id}/attendees   -> add, remove
/// POST                 /{id}/sessions/{session_id}/items       -> add item
/// DELETE               /{id}/sessions/{session_id}/items/{kind}/{ref_id}
/// GET                  /{id}/sessions/{session_id}/rating
/// POST                 /{id}/sessions/{session_id}/rating/user
/// POST                 /{id}/sessions/{session_id}/rating/trainer
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(courses::list_courses).post(courses::create_course))
        .route(
            "/{id}",
            get(courses::get_course)
                .put(courses::update_course)
                .delete(courses::delete_course),
        )
        .route(
            "/{id}/attendees",
            post(courses::add_attendees).delete(courses::remove_course_attendees),
        )
        .route("/{id}/items", post(courses::add_course_item))
        .route(
            "/{id}/items/{kind}/{ref_id}",
            delete(courses::remove_course_item),
        )
        .route("/{id}/rating", get(courses::get_course_rating))
        .route("/{id}/rating/user", post(courses::submit_user_rating))
        .route("/{id}/rating/trainer", post(courses::submit_trainer_rating))
        .route("/{id}/results", get(courses::get_course_results))
        .merge(session_routes())
}

fn session_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route(
            "/{id}/sessions/{session_id}",
            get(sessions::get_session)
                .put(sessions::update_session)
                .delete(sessions::delete_session),
        )
        .route(
            "/{id}/sessions/{session_id}/attendees",
            post(sessions::add_session_attendees).delete(sessions::remove_session_attendees),
        )
        .route(
            "/{id}/sessions/{session_id}/items",
            post(sessions::add_session_item),
        )
        .route(
            "/{id}/sessions/{session_id}/items/{kind}/{ref_id}",
            delete(sessions::remove_session_item),
        )
        .route(
            "/{id}/sessions/{session_id}/rating",
            get(sessions::get_session_rating),
        )
        .route(
            "/{id}/sessions/{session_id}/rating/user",
            post(sessions::submit_session_user_rating),
        )
        .route(
            "/{id}/sessions/{session_id}/rating/trainer",
            post(sessions::submit_session_trainer_rating),
        )
}
