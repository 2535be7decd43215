//! Handlers for `/org-units`: the organizational hierarchy and its counters.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use learnhub_core::error::CoreError;
use learnhub_core::org_unit::{validate_name, validate_parent};
use learnhub_core::types::DbId;
use learnhub_db::models::org_unit::{
    CreateOrgUnit, OrgUnit, OrgUnitType, OrgUnitWithDepth, UpdateOrgUnit,
};
use learnhub_db::repositories::{OrgUnitRepo, OrgUnitTypeRepo};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::{IdsParams, IncludeInactiveParams};
use crate::response::ApiResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "OrgUnit",
        id,
    })
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// POST /api/v1/org-units
pub async fn create_org_unit(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateOrgUnit>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrgUnit>>)> {
    validate_name(&input.name)?;
    let mut tx = state.pool.begin().await?;
    if input.parent_id.is_some() {
        let forest = OrgUnitRepo::lock_forest(&mut tx).await?;
        validate_parent(&forest, None, input.parent_id)?;
    }
    let unit = OrgUnitRepo::create(&mut *tx, &input).await?;
    tx.commit().await?;
    tracing::info!(org_unit_id = unit.id, parent_id = ?unit.parent_id, "Org unit created");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(unit))))
}

/// GET /api/v1/org-units
pub async fn list_org_units(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<ApiResponse<Vec<OrgUnit>>>> {
    let units = OrgUnitRepo::list(&state.pool, params.include_inactive).await?;
    Ok(Json(ApiResponse::ok(units)))
}

/// GET /api/v1/org-units/{id}
pub async fn get_org_unit(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<OrgUnit>>> {
    let unit = OrgUnitRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(ApiResponse::ok(unit)))
}

/// PUT /api/v1/org-units/{id}
///
/// Re-parenting is checked against the tree under the tree lock, in the same
/// transaction as the write, so a unit can never end up below itself.
pub async fn update_org_unit(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateOrgUnit>,
) -> AppResult<Json<ApiResponse<OrgUnit>>> {
    if let Some(name) = &input.name {
        validate_name(name)?;
    }
    let mut tx = state.pool.begin().await?;
    if input.parent_id.is_some() || input.is_active.is_some() {
        let forest = OrgUnitRepo::lock_forest(&mut tx).await?;
        if !forest.contains(id) {
            return Err(not_found(id));
        }
        if let Some(new_parent) = input.parent_id {
            validate_parent(&forest, Some(id), new_parent)?;
        }
    }

    let unit = OrgUnitRepo::update(&mut *tx, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    tx.commit().await?;

    if input.parent_id.is_some() || input.is_active.is_some() {
        state.recount.enqueue(format!("org unit {id} moved or toggled"));
    }
    Ok(Json(ApiResponse::ok(unit)))
}

/// DELETE /api/v1/org-units/{id}
///
/// Soft delete: the unit is deactivated and drops out of counter roll-ups.
pub async fn deactivate_org_unit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let mut tx = state.pool.begin().await?;
    OrgUnitRepo::lock_forest(&mut tx).await?;
    if !OrgUnitRepo::deactivate(&mut *tx, id).await? {
        return Err(not_found(id));
    }
    tx.commit().await?;
    tracing::info!(org_unit_id = id, user_id = admin.user_id, "Org unit deactivated");
    state.recount.enqueue(format!("org unit {id} deactivated"));
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// GET /api/v1/org-units/children?ids=1,2
pub async fn get_with_children(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<IdsParams>,
) -> AppResult<Json<ApiResponse<Vec<OrgUnitWithDepth>>>> {
    let ids = params.parse()?;
    let units = OrgUnitRepo::get_with_children(&state.pool, &ids).await?;
    Ok(Json(ApiResponse::ok(units)))
}

/// GET /api/v1/org-units/graph?ids=1,2
pub async fn get_with_graph(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<IdsParams>,
) -> AppResult<Json<ApiResponse<Vec<OrgUnitWithDepth>>>> {
    let ids = params.parse()?;
    let units = OrgUnitRepo::get_with_graph(&state.pool, &ids).await?;
    Ok(Json(ApiResponse::ok(units)))
}

/// GET /api/v1/org-units/reachable
pub async fn list_reachable(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<OrgUnit>>>> {
    let units = OrgUnitRepo::list_reachable(&state.pool).await?;
    Ok(Json(ApiResponse::ok(units)))
}

/// POST /api/v1/org-units/recount
///
/// Synchronous full recount, for operators who need fresh counters now.
pub async fn recount(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let units = OrgUnitRepo::recount(&state.pool).await?;
    tracing::info!(units, user_id = admin.user_id, "Manual org unit recount");
    Ok(Json(ApiResponse::ok(json!({ "units": units }))))
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateOrgUnitType {
    pub name: String,
}

/// GET /api/v1/org-units/types
pub async fn list_types(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<OrgUnitType>>>> {
    Ok(Json(ApiResponse::ok(OrgUnitTypeRepo::list(&state.pool).await?)))
}

/// POST /api/v1/org-units/types
pub async fn create_type(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateOrgUnitType>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrgUnitType>>)> {
    validate_name(&input.name)?;
    let unit_type = OrgUnitTypeRepo::create(&state.pool, &input.name).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(unit_type))))
}
