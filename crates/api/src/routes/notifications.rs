//! Route definitions for `/notifications` and `/mail-logs`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notifications;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET   /               -> list (?unread_only=&limit=&offset=)
/// GET   /unread-count   -> unread count
/// POST  /read-all       -> mark all read
/// POST  /{id}/read      -> mark one read
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/unread-count", get(notifications::unread_count))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/{id}/read", post(notifications::mark_read))
}

/// Routes mounted at `/mail-logs` (admin).
pub fn mail_logs_router() -> Router<AppState> {
    Router::new().route("/", get(notifications::list_mail_logs))
}
