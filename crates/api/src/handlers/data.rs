//! Handlers for `/data` records and `/data-fields` definitions.
//!
//! Record contents change through approved content updates; only sign-off and
//! the admin bulk status write touch records directly.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use learnhub_core::error::CoreError;
use learnhub_core::notification::EVENT_DATA_BULK_STATUS;
use learnhub_core::types::DbId;
use learnhub_db::models::data_record::{
    BulkStatusUpdate, CreateDataField, DataField, DataRecord, DataRecordFilter,
};
use learnhub_db::repositories::data_field_repo::FIELD_TYPES;
use learnhub_db::repositories::{DataFieldRepo, DataRecordRepo};
use learnhub_events::PlatformEvent;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/data
pub async fn list_records(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<DataRecordFilter>,
) -> AppResult<Json<ApiResponse<Vec<DataRecord>>>> {
    let records = DataRecordRepo::list(&state.pool, &filter).await?;
    Ok(Json(ApiResponse::ok(records)))
}

/// GET /api/v1/data/{id}
pub async fn get_record(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<DataRecord>>> {
    let record = DataRecordRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Data", id }))?;
    Ok(Json(ApiResponse::ok(record)))
}

/// POST /api/v1/data/{id}/sign
pub async fn sign_record(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<DataRecord>>> {
    let record = DataRecordRepo::sign(&state.pool, id, admin.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Data", id }))?;

    tracing::info!(data_id = id, user_id = admin.user_id, "Data record signed");
    // Signed and unsigned records are counted separately.
    state.recount.enqueue(format!("data {id} signed"));
    Ok(Json(ApiResponse::ok(record)))
}

/// POST /api/v1/data/bulk-status
///
/// Writes `is_active` / `temp_inactive` directly, bypassing the approval log.
pub async fn update_bulk_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<BulkStatusUpdate>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    if input.ids.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "ids must not be empty".into(),
        )));
    }
    if input.is_active.is_none() && input.temp_inactive.is_none() {
        return Err(AppError::Core(CoreError::Validation(
            "Provide is_active or temp_inactive".into(),
        )));
    }

    let updated = DataRecordRepo::update_bulk_status(&state.pool, &input).await?;
    tracing::warn!(
        user_id = admin.user_id,
        requested = input.ids.len(),
        updated,
        is_active = ?input.is_active,
        temp_inactive = ?input.temp_inactive,
        "Bulk status write outside the approval log"
    );

    state.publish(
        PlatformEvent::new(EVENT_DATA_BULK_STATUS)
            .with_actor(admin.user_id)
            .with_payload(json!({
                "data_ids": input.ids,
                "is_active": input.is_active,
                "temp_inactive": input.temp_inactive,
                "updated": updated,
            })),
    );
    state.recount.enqueue("bulk status write");

    Ok(Json(ApiResponse::ok(json!({ "updated": updated }))))
}

// ---------------------------------------------------------------------------
// Field definitions
// ---------------------------------------------------------------------------

/// GET /api/v1/data-fields
pub async fn list_fields(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<DataField>>>> {
    Ok(Json(ApiResponse::ok(DataFieldRepo::list(&state.pool).await?)))
}

/// POST /api/v1/data-fields
pub async fn create_field(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateDataField>,
) -> AppResult<(StatusCode, Json<ApiResponse<DataField>>)> {
    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Field name must not be empty".into(),
        )));
    }
    if !FIELD_TYPES.contains(&input.field_type.as_str()) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Invalid field type '{}'. Must be one of: {}",
            input.field_type,
            FIELD_TYPES.join(", ")
        ))));
    }
    let field = DataFieldRepo::create(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(field))))
}
