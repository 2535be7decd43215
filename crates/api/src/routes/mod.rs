pub mod assessments;
pub mod auth;
pub mod content_updates;
pub mod courses;
pub mod data;
pub mod health;
pub mod notifications;
pub mod org_units;
pub mod training_requests;
pub mod users;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws?token=                  WebSocket push channel
/// /auth                       login, me
/// /users                      user management
/// /org-units                  hierarchy, traversal, counters, unit types
/// /data                       records, sign-off, bulk status
/// /data-fields                field definitions
/// /content-updates            propose, review, undo
/// /courses                    courses, sessions, ratings, results
/// /assessments                assessments and their attempts
/// /surveys                    surveys and their attempts
/// /training-requests          request lifecycle
/// /notifications              the caller's notifications
/// /mail-logs                  mail delivery failures (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/org-units", org_units::router())
        .nest("/data", data::router())
        .nest("/data-fields", data::fields_router())
        .nest("/content-updates", content_updates::router())
        .nest("/courses", courses::router())
        .nest("/assessments", assessments::router())
        .nest("/surveys", assessments::surveys_router())
        .nest("/training-requests", training_requests::router())
        .nest("/notifications", notifications::router())
        .nest("/mail-logs", notifications::mail_logs_router())
}
