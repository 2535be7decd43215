//! Handlers for `/content-updates`: proposing, reviewing and undoing changes
//! to `Data` records.
//!
//! Approval runs in one transaction. The update row is locked first, the
//! branch for its type writes the record, and the update is marked approved
//! before commit, so a failure in any step leaves both rows untouched.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use learnhub_core::content_update::{
    accept_all, apply_edit, ensure_pending, ensure_undo_allowed, resolve_new_id,
    validate_proposal, validate_reason, AdminChange, DataSnapshot, UpdateType,
};
use learnhub_core::diff::diff_fields;
use learnhub_core::error::CoreError;
use learnhub_core::org_unit::validate_record_unit;
use learnhub_core::notification::{
    EVENT_CONTENT_UPDATE_APPROVED, EVENT_CONTENT_UPDATE_REJECTED, EVENT_CONTENT_UPDATE_SUBMITTED,
};
use learnhub_core::types::DbId;
use learnhub_db::models::content_update::{
    ApproveContentUpdate, ContentUpdate, ContentUpdateDetail, ContentUpdateFilter,
    CreateContentUpdate, ProposeContentUpdate, RejectContentUpdate,
};
use learnhub_db::repositories::{ContentUpdateRepo, DataFieldRepo, DataRecordRepo, OrgUnitRepo};
use learnhub_events::PlatformEvent;
use serde_json::json;
use sqlx::{Postgres, Transaction};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::MAX_LIMIT;
use crate::response::ApiResponse;
use crate::state::AppState;

fn update_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "ContentUpdate",
        id,
    })
}

fn data_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Data", id })
}

fn require_data_id(update: &ContentUpdate) -> Result<DbId, AppError> {
    update.data_id.ok_or_else(|| {
        AppError::Core(CoreError::Validation(
            "data_id is required for this update type".into(),
        ))
    })
}

/// Reject target units that are missing, inactive or cut off from an active
/// root. Approval re-checks under the tree lock.
async fn ensure_record_unit(state: &AppState, id: DbId) -> AppResult<()> {
    let forest = OrgUnitRepo::load_forest(&state.pool).await?;
    validate_record_unit(&forest, id)?;
    Ok(())
}

async fn ensure_fields_defined(state: &AppState, snapshot: &DataSnapshot) -> AppResult<()> {
    let ids: Vec<DbId> = snapshot.fields.iter().map(|f| f.field_id).collect();
    if ids.is_empty() {
        return Ok(());
    }
    let missing = DataFieldRepo::missing_ids(&state.pool, &ids).await?;
    if !missing.is_empty() {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown field ids: {missing:?}"
        ))));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Propose / read
// ---------------------------------------------------------------------------

/// POST /api/v1/content-updates
///
/// Creates a `PENDING` update. For types that target an existing record its
/// current state is captured as `before`.
pub async fn propose(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ProposeContentUpdate>,
) -> AppResult<(StatusCode, Json<ApiResponse<ContentUpdate>>)> {
    let update_type = UpdateType::parse(&input.update_type)?;
    validate_proposal(update_type, input.data_id, &input.after)?;
    ensure_fields_defined(&state, &input.after).await?;

    let before = match input.data_id {
        Some(data_id) if update_type != UpdateType::AddService => {
            let record = DataRecordRepo::find_by_id(&state.pool, data_id)
                .await?
                .ok_or_else(|| data_not_found(data_id))?;
            Some(record.snapshot())
        }
        _ => None,
    };

    if matches!(update_type, UpdateType::AddService | UpdateType::OuChange) {
        if let Some(org_unit_id) = input.after.org_unit_id {
            ensure_record_unit(&state, org_unit_id).await?;
        }
    }

    let data_id = match update_type {
        UpdateType::AddService => None,
        _ => input.data_id,
    };
    let update = ContentUpdateRepo::create(
        &state.pool,
        &CreateContentUpdate {
            data_id,
            update_type: update_type.as_str().to_string(),
            before,
            after: input.after,
            updated_by: auth.user_id,
        },
    )
    .await?;

    tracing::info!(
        content_update_id = update.id,
        update_type = %update_type,
        data_id = ?update.data_id,
        user_id = auth.user_id,
        "Content update proposed"
    );
    state.publish(
        PlatformEvent::new(EVENT_CONTENT_UPDATE_SUBMITTED)
            .with_source("content_update", update.id)
            .with_actor(auth.user_id)
            .with_payload(json!({
                "content_update_id": update.id,
                "update_type": update.update_type,
                "data_id": update.data_id,
            })),
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(update))))
}

/// GET /api/v1/content-updates
pub async fn list(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(mut filter): Query<ContentUpdateFilter>,
) -> AppResult<Json<ApiResponse<Vec<ContentUpdate>>>> {
    filter.limit = filter.limit.map(|l| l.clamp(1, MAX_LIMIT));
    let updates = ContentUpdateRepo::list(&state.pool, &filter).await?;
    Ok(Json(ApiResponse::ok(updates)))
}

/// GET /api/v1/content-updates/{id}
///
/// The update plus a per-field diff of `before` against `after`.
pub async fn get(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<ContentUpdateDetail>>> {
    let update = ContentUpdateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| update_not_found(id))?;
    let before = update
        .before
        .as_ref()
        .map(|b| b.0.fields.as_slice())
        .unwrap_or_default();
    let diff = diff_fields(before, &update.after.0.fields);
    Ok(Json(ApiResponse::ok(ContentUpdateDetail { update, diff })))
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

/// Apply one approval branch inside `tx`. Returns the record id touched and
/// the approver's deviations from the request.
async fn apply_approval(
    tx: &mut Transaction<'_, Postgres>,
    update: &ContentUpdate,
    update_type: UpdateType,
    review: ApproveContentUpdate,
) -> AppResult<(DbId, Vec<AdminChange>)> {
    let after = &update.after.0;

    match update_type {
        UpdateType::Edit => {
            let data_id = require_data_id(update)?;
            let record = DataRecordRepo::find_for_update(tx, data_id)
                .await?
                .ok_or_else(|| data_not_found(data_id))?;
            let reviewed = if review.fields.is_empty() {
                accept_all(&after.fields)
            } else {
                review.fields
            };
            let outcome = apply_edit(&record.fields.0, &after.fields, &reviewed);
            DataRecordRepo::set_fields(tx, data_id, &outcome.fields).await?;
            tracing::debug!(data_id, written = ?outcome.written, "EDIT applied");
            Ok((data_id, outcome.admin_change))
        }
        UpdateType::AddService => {
            let max_existing = DataRecordRepo::lock_max_id(tx).await?;
            let new_id = resolve_new_id(after, max_existing);
            if after.id.is_some() && DataRecordRepo::exists(tx, new_id).await? {
                return Err(AppError::Core(CoreError::Conflict(format!(
                    "Data with id {new_id} already exists"
                ))));
            }
            let (Some(org_unit_id), Some(data_type)) =
                (after.org_unit_id, after.data_type.as_deref())
            else {
                return Err(AppError::Core(CoreError::Validation(
                    "An ADD SERVICE update requires after.org_unit_id and after.data_type".into(),
                )));
            };
            let forest = OrgUnitRepo::lock_forest(tx).await?;
            validate_record_unit(&forest, org_unit_id)?;
            DataRecordRepo::insert(tx, new_id, org_unit_id, data_type.trim(), &after.fields)
                .await?;
            Ok((new_id, Vec::new()))
        }
        UpdateType::Delete => {
            let data_id = require_data_id(update)?;
            if !DataRecordRepo::set_active(tx, data_id, false).await? {
                return Err(data_not_found(data_id));
            }
            Ok((data_id, Vec::new()))
        }
        UpdateType::OuChange => {
            let data_id = require_data_id(update)?;
            let org_unit_id = after.org_unit_id.ok_or_else(|| {
                AppError::Core(CoreError::Validation(
                    "An OU CHANGE update requires after.org_unit_id".into(),
                ))
            })?;
            let forest = OrgUnitRepo::lock_forest(tx).await?;
            validate_record_unit(&forest, org_unit_id)?;
            if !DataRecordRepo::set_org_unit(tx, data_id, org_unit_id).await? {
                return Err(data_not_found(data_id));
            }
            Ok((data_id, Vec::new()))
        }
    }
}

/// POST /api/v1/content-updates/{id}/approve
///
/// An update whose stored type is unknown fails with "Invalid Log" and
/// changes nothing.
pub async fn approve(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(review): Json<ApproveContentUpdate>,
) -> AppResult<Json<ApiResponse<ContentUpdate>>> {
    let mut tx = state.pool.begin().await?;

    let update = ContentUpdateRepo::find_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| update_not_found(id))?;
    ensure_pending(&update.status)?;
    let update_type = UpdateType::parse(&update.update_type).inspect_err(|_| {
        tracing::warn!(
            content_update_id = id,
            update_type = %update.update_type,
            "Refusing to approve update with unknown type"
        );
    })?;

    let (data_id, admin_change) = apply_approval(&mut tx, &update, update_type, review).await?;
    let approved =
        ContentUpdateRepo::mark_approved(&mut tx, id, admin.user_id, Some(data_id), &admin_change)
            .await?;
    tx.commit().await?;

    tracing::info!(
        content_update_id = id,
        update_type = %update_type,
        data_id,
        user_id = admin.user_id,
        admin_changes = admin_change.len(),
        "Content update approved"
    );

    if update_type.affects_counters() {
        state.recount.enqueue(format!("content update {id} approved"));
    }

    let mut event = PlatformEvent::new(EVENT_CONTENT_UPDATE_APPROVED)
        .with_source("content_update", id)
        .with_actor(admin.user_id)
        .with_payload(json!({
            "content_update_id": id,
            "update_type": approved.update_type,
            "data_id": data_id,
        }));
    if let Some(submitter) = approved.updated_by {
        event = event.with_recipients(&[submitter]);
    }
    state.publish(event);

    Ok(Json(ApiResponse::ok(approved)))
}

/// POST /api/v1/content-updates/{id}/reject
pub async fn reject(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RejectContentUpdate>,
) -> AppResult<Json<ApiResponse<ContentUpdate>>> {
    validate_reason(&input.reason)?;

    let Some(rejected) = ContentUpdateRepo::reject(&state.pool, id, admin.user_id, &input.reason).await?
    else {
        // Either missing or no longer pending; report which.
        let existing = ContentUpdateRepo::find_by_id(&state.pool, id)
            .await?
            .ok_or_else(|| update_not_found(id))?;
        ensure_pending(&existing.status)?;
        return Err(AppError::InternalError(format!(
            "Content update {id} could not be rejected"
        )));
    };

    tracing::info!(content_update_id = id, user_id = admin.user_id, "Content update rejected");

    let mut event = PlatformEvent::new(EVENT_CONTENT_UPDATE_REJECTED)
        .with_source("content_update", id)
        .with_actor(admin.user_id)
        .with_payload(json!({
            "content_update_id": id,
            "update_type": rejected.update_type,
            "reason": rejected.rejection_reason,
        }));
    if let Some(submitter) = rejected.updated_by {
        event = event.with_recipients(&[submitter]);
    }
    state.publish(event);

    Ok(Json(ApiResponse::ok(rejected)))
}

/// POST /api/v1/content-updates/{id}/undo-delete
///
/// Reactivates the record an approved `DELETE` soft-deleted. Repeating the
/// call returns the update unchanged.
pub async fn undo_delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<ContentUpdate>>> {
    let mut tx = state.pool.begin().await?;

    let update = ContentUpdateRepo::find_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| update_not_found(id))?;
    ensure_undo_allowed(&update.update_type, &update.status)?;
    if update.is_undo_delete {
        return Ok(Json(ApiResponse::ok(update)));
    }

    let data_id = require_data_id(&update)?;
    if !DataRecordRepo::set_active(&mut tx, data_id, true).await? {
        return Err(data_not_found(data_id));
    }
    let undone = ContentUpdateRepo::mark_undo_delete(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!(content_update_id = id, data_id, user_id = admin.user_id, "Deletion undone");
    state.recount.enqueue(format!("content update {id} undone"));

    Ok(Json(ApiResponse::ok(undone)))
}
