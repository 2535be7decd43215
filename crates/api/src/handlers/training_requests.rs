//! Handlers for `/training-requests`.
//!
//! A request moves `PENDING -> PUBLISHED -> TRAINING_CREATED`, or to
//! `CANCELED` from either of the first two. Every state change locks the
//! request row, so concurrent transitions serialize and the loser sees a
//! conflict.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use learnhub_core::course::validate_title;
use learnhub_core::error::CoreError;
use learnhub_core::roles::ROLE_LEARNER;
use learnhub_core::training_request::{
    apply_transition, create_training, join, RequestStatus, Transition,
};
use learnhub_core::types::DbId;
use learnhub_db::models::training_request::{CreateTrainingRequest, TrainingRequest};
use learnhub_db::repositories::{CourseRepo, TrainingRequestRepo, UserRepo};
use learnhub_events::PlatformEvent;
use serde::Deserialize;
use serde_json::json;

use super::courses::{course_not_found, load_course};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireTrainer;
use crate::response::ApiResponse;
use crate::state::AppState;

fn request_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "TrainingRequest",
        id,
    })
}

fn publish_transition(
    state: &AppState,
    transition: Transition,
    request: &TrainingRequest,
    actor: DbId,
    recipients: &[DbId],
) {
    if recipients.is_empty() {
        return;
    }
    state.publish(
        PlatformEvent::new(transition.event_type())
            .with_source("training_request", request.id)
            .with_actor(actor)
            .with_payload(json!({
                "training_request_id": request.id,
                "course_id": request.course_id,
                "title": request.title,
            }))
            .with_recipients(recipients),
    );
}

#[derive(Debug, Deserialize)]
pub struct StatusParams {
    pub status: Option<String>,
}

/// POST /api/v1/training-requests
pub async fn create_request(
    RequireTrainer(auth): RequireTrainer,
    State(state): State<AppState>,
    Json(input): Json<CreateTrainingRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<TrainingRequest>>)> {
    validate_title(&input.title)?;
    load_course(&state, input.course_id).await?;
    let request = TrainingRequestRepo::create(&state.pool, &input, auth.user_id).await?;
    tracing::info!(
        training_request_id = request.id,
        course_id = request.course_id,
        "Training request created"
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(request))))
}

/// GET /api/v1/training-requests?status=PUBLISHED
pub async fn list_requests(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<StatusParams>,
) -> AppResult<Json<ApiResponse<Vec<TrainingRequest>>>> {
    let status = params
        .status
        .as_deref()
        .map(RequestStatus::parse)
        .transpose()?;
    let requests = TrainingRequestRepo::list(&state.pool, status.map(|s| s.as_str())).await?;
    Ok(Json(ApiResponse::ok(requests)))
}

/// GET /api/v1/training-requests/{id}
pub async fn get_request(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<TrainingRequest>>> {
    let request = TrainingRequestRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| request_not_found(id))?;
    Ok(Json(ApiResponse::ok(request)))
}

/// Apply a status-only transition under a row lock.
async fn transition_request(
    state: &AppState,
    id: DbId,
    transition: Transition,
) -> AppResult<(TrainingRequest, TrainingRequest)> {
    let mut tx = state.pool.begin().await?;
    let current = TrainingRequestRepo::find_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| request_not_found(id))?;
    let next = apply_transition(RequestStatus::parse(&current.status)?, transition)?;
    let updated = TrainingRequestRepo::save_state(
        &mut tx,
        id,
        next.as_str(),
        &current.pending_attendee_ids,
        &current.completed_attendee_ids,
    )
    .await?;
    tx.commit().await?;
    Ok((current, updated))
}

/// POST /api/v1/training-requests/{id}/publish
///
/// Active learners are told the training is open for joining.
pub async fn publish_request(
    RequireTrainer(auth): RequireTrainer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<TrainingRequest>>> {
    let (_, request) = transition_request(&state, id, Transition::Publish).await?;
    tracing::info!(training_request_id = id, user_id = auth.user_id, "Training request published");

    let learners = UserRepo::ids_with_role(&state.pool, ROLE_LEARNER).await?;
    publish_transition(&state, Transition::Publish, &request, auth.user_id, &learners);
    Ok(Json(ApiResponse::ok(request)))
}

/// POST /api/v1/training-requests/{id}/cancel
pub async fn cancel_request(
    RequireTrainer(auth): RequireTrainer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<TrainingRequest>>> {
    let (before, request) = transition_request(&state, id, Transition::Cancel).await?;
    tracing::info!(training_request_id = id, user_id = auth.user_id, "Training request canceled");
    publish_transition(
        &state,
        Transition::Cancel,
        &request,
        auth.user_id,
        &before.pending_attendee_ids,
    );
    Ok(Json(ApiResponse::ok(request)))
}

/// POST /api/v1/training-requests/{id}/join
///
/// Adds the caller to the pending list; joining twice is a no-op.
pub async fn join_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<TrainingRequest>>> {
    let mut tx = state.pool.begin().await?;
    let current = TrainingRequestRepo::find_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| request_not_found(id))?;
    let pending = join(
        RequestStatus::parse(&current.status)?,
        &current.pending_attendee_ids,
        auth.user_id,
    )?;
    let request = TrainingRequestRepo::save_state(
        &mut tx,
        id,
        &current.status,
        &pending,
        &current.completed_attendee_ids,
    )
    .await?;
    tx.commit().await?;
    Ok(Json(ApiResponse::ok(request)))
}

/// POST /api/v1/training-requests/{id}/create-training
///
/// Moves every pending attendee into the course and the completed list. The
/// request and the course are locked in that order and written in one
/// transaction.
pub async fn create_training_from_request(
    RequireTrainer(auth): RequireTrainer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<TrainingRequest>>> {
    let mut tx = state.pool.begin().await?;
    let current = TrainingRequestRepo::find_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| request_not_found(id))?;
    let course = CourseRepo::find_for_update(&mut tx, current.course_id)
        .await?
        .ok_or_else(|| course_not_found(current.course_id))?;

    let created = create_training(
        RequestStatus::parse(&current.status)?,
        &current.pending_attendee_ids,
        &current.completed_attendee_ids,
        &course.attendee_ids,
    )?;

    CourseRepo::set_attendees(&mut *tx, course.id, &created.course_attendees).await?;
    let request = TrainingRequestRepo::save_state(
        &mut tx,
        id,
        RequestStatus::TrainingCreated.as_str(),
        &created.pending,
        &created.completed,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        training_request_id = id,
        course_id = course.id,
        moved = current.pending_attendee_ids.len(),
        "Training created from request"
    );
    publish_transition(
        &state,
        Transition::CreateTraining,
        &request,
        auth.user_id,
        &current.pending_attendee_ids,
    );
    Ok(Json(ApiResponse::ok(request)))
}
