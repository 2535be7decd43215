//! Handlers for `/notifications`, which act on the caller's own rows, and
//! the admin view of `/mail-logs`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use learnhub_core::error::CoreError;
use learnhub_core::types::DbId;
use learnhub_db::models::mail_log::MailLog;
use learnhub_db::models::notification::{Notification, NotificationFilter};
use learnhub_db::repositories::{MailLogRepo, NotificationRepo};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::{PaginationParams, MAX_LIMIT};
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/notifications
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(mut filter): Query<NotificationFilter>,
) -> AppResult<Json<ApiResponse<Vec<Notification>>>> {
    filter.limit = filter.limit.map(|l| l.clamp(1, MAX_LIMIT));
    let notifications = NotificationRepo::list_for_user(&state.pool, auth.user_id, &filter).await?;
    Ok(Json(ApiResponse::ok(notifications)))
}

/// POST /api/v1/notifications/{id}/read
///
/// 204 on success, 404 when the notification is not the caller's.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let found = NotificationRepo::mark_read(&state.pool, notification_id, auth.user_id).await?;
    if !found {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id: notification_id,
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let count = NotificationRepo::mark_all_read(&state.pool, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(json!({ "marked_read": count }))))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let count = NotificationRepo::unread_count(&state.pool, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(json!({ "count": count }))))
}

/// GET /api/v1/mail-logs
///
/// Most recent mail delivery failures.
pub async fn list_mail_logs(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Vec<MailLog>>>> {
    let limit = params.clamped_limit().unwrap_or(MAX_LIMIT);
    let logs = MailLogRepo::list(&state.pool, limit).await?;
    Ok(Json(ApiResponse::ok(logs)))
}
