//! Handlers for `/courses/{id}/sessions`.
//!
//! Sessions mirror the course sub-documents: attendees, items and both
//! rating lists.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use learnhub_core::course::{
    add_item, merge_attendees, remove_attendees, remove_item, validate_schedule, validate_title,
    ItemKind, SessionItem,
};
use learnhub_core::error::CoreError;
use learnhub_core::notification::EVENT_SESSION_SCHEDULED;
use learnhub_core::types::DbId;
use learnhub_db::models::course::{AttendeeChange, RatingView, SubmitRating};
use learnhub_db::models::session::{CreateSession, Session, UpdateSession};
use learnhub_db::repositories::SessionRepo;
use learnhub_events::PlatformEvent;
use serde_json::json;
use sqlx::{Postgres, Transaction};

use super::courses::{ensure_item_exists, load_course};
use super::ratings::{apply_submission, backfill_lists, RatingLists, RatingTarget};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireTrainer;
use crate::response::ApiResponse;
use crate::state::AppState;

fn session_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Session",
        id,
    })
}

/// Load a session, treating one that belongs to another course as missing.
async fn load_session(state: &AppState, course_id: DbId, id: DbId) -> AppResult<Session> {
    SessionRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|s| s.course_id == course_id)
        .ok_or_else(|| session_not_found(id))
}

/// Load and lock a session of `course_id` for a read-modify-write.
async fn lock_session(
    tx: &mut Transaction<'_, Postgres>,
    course_id: DbId,
    id: DbId,
) -> AppResult<Session> {
    SessionRepo::find_for_update(tx, id)
        .await?
        .filter(|s| s.course_id == course_id)
        .ok_or_else(|| session_not_found(id))
}

fn publish_scheduled(state: &AppState, session: &Session, actor: DbId, user_ids: &[DbId]) {
    if user_ids.is_empty() {
        return;
    }
    state.publish(
        PlatformEvent::new(EVENT_SESSION_SCHEDULED)
            .with_source("session", session.id)
            .with_actor(actor)
            .with_payload(json!({
                "course_id": session.course_id,
                "session_id": session.id,
                "title": session.title,
                "starts_at": session.starts_at,
                "location": session.location,
            }))
            .with_recipients(user_ids),
    );
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// POST /api/v1/courses/{id}/sessions
pub async fn create_session(
    RequireTrainer(auth): RequireTrainer,
    State(state): State<AppState>,
    Path(course_id): Path<DbId>,
    Json(mut input): Json<CreateSession>,
) -> AppResult<(StatusCode, Json<ApiResponse<Session>>)> {
    validate_title(&input.title)?;
    validate_schedule(input.starts_at, input.ends_at)?;
    load_course(&state, course_id).await?;
    input.trainer_ids = merge_attendees(&input.trainer_ids, &[]);
    input.attendee_ids = merge_attendees(&input.attendee_ids, &[]);

    let session = SessionRepo::create(&state.pool, course_id, &input).await?;
    tracing::info!(
        course_id,
        session_id = session.id,
        starts_at = %session.starts_at,
        "Session scheduled"
    );

    let notify = merge_attendees(&session.attendee_ids, &session.trainer_ids);
    publish_scheduled(&state, &session, auth.user_id, &notify);
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(session))))
}

/// GET /api/v1/courses/{id}/sessions
pub async fn list_sessions(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Vec<Session>>>> {
    load_course(&state, course_id).await?;
    let sessions = SessionRepo::list_for_course(&state.pool, course_id).await?;
    Ok(Json(ApiResponse::ok(sessions)))
}

/// GET /api/v1/courses/{id}/sessions/{session_id}
pub async fn get_session(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((course_id, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<ApiResponse<Session>>> {
    Ok(Json(ApiResponse::ok(load_session(&state, course_id, id).await?)))
}

/// PUT /api/v1/courses/{id}/sessions/{session_id}
///
/// A partial schedule change is validated against the stored other end.
pub async fn update_session(
    RequireTrainer(_): RequireTrainer,
    State(state): State<AppState>,
    Path((course_id, id)): Path<(DbId, DbId)>,
    Json(mut input): Json<UpdateSession>,
) -> AppResult<Json<ApiResponse<Session>>> {
    let current = load_session(&state, course_id, id).await?;
    if let Some(title) = &input.title {
        validate_title(title)?;
    }
    if input.starts_at.is_some() || input.ends_at.is_some() {
        validate_schedule(
            input.starts_at.unwrap_or(current.starts_at),
            input.ends_at.unwrap_or(current.ends_at),
        )?;
    }
    if let Some(trainers) = input.trainer_ids.take() {
        input.trainer_ids = Some(merge_attendees(&trainers, &[]));
    }
    let session = SessionRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| session_not_found(id))?;
    Ok(Json(ApiResponse::ok(session)))
}

/// DELETE /api/v1/courses/{id}/sessions/{session_id}
pub async fn delete_session(
    RequireTrainer(auth): RequireTrainer,
    State(state): State<AppState>,
    Path((course_id, id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    load_session(&state, course_id, id).await?;
    if !SessionRepo::delete(&state.pool, id).await? {
        return Err(session_not_found(id));
    }
    tracing::info!(course_id, session_id = id, user_id = auth.user_id, "Session deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Attendees and items
// ---------------------------------------------------------------------------

/// POST /api/v1/courses/{id}/sessions/{session_id}/attendees
pub async fn add_session_attendees(
    RequireTrainer(auth): RequireTrainer,
    State(state): State<AppState>,
    Path((course_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<AttendeeChange>,
) -> AppResult<Json<ApiResponse<Session>>> {
    let mut tx = state.pool.begin().await?;
    let session = lock_session(&mut tx, course_id, id).await?;
    let merged = merge_attendees(&session.attendee_ids, &input.user_ids);
    let added: Vec<DbId> = merged
        .iter()
        .copied()
        .filter(|uid| !session.attendee_ids.contains(uid))
        .collect();

    let session = SessionRepo::set_attendees(&mut *tx, id, &merged)
        .await?
        .ok_or_else(|| session_not_found(id))?;
    tx.commit().await?;
    publish_scheduled(&state, &session, auth.user_id, &added);
    Ok(Json(ApiResponse::ok(session)))
}

/// DELETE /api/v1/courses/{id}/sessions/{session_id}/attendees
pub async fn remove_session_attendees(
    RequireTrainer(_): RequireTrainer,
    State(state): State<AppState>,
    Path((course_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<AttendeeChange>,
) -> AppResult<Json<ApiResponse<Session>>> {
    let mut tx = state.pool.begin().await?;
    let session = lock_session(&mut tx, course_id, id).await?;
    let remaining = remove_attendees(&session.attendee_ids, &input.user_ids);
    let session = SessionRepo::set_attendees(&mut *tx, id, &remaining)
        .await?
        .ok_or_else(|| session_not_found(id))?;
    tx.commit().await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// POST /api/v1/courses/{id}/sessions/{session_id}/items
pub async fn add_session_item(
    RequireTrainer(_): RequireTrainer,
    State(state): State<AppState>,
    Path((course_id, id)): Path<(DbId, DbId)>,
    Json(item): Json<SessionItem>,
) -> AppResult<Json<ApiResponse<Session>>> {
    ensure_item_exists(&state, item).await?;
    let mut tx = state.pool.begin().await?;
    let session = lock_session(&mut tx, course_id, id).await?;
    let items = add_item(&session.items, item)?;
    let session = SessionRepo::set_items(&mut *tx, id, &items)
        .await?
        .ok_or_else(|| session_not_found(id))?;
    tx.commit().await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// DELETE /api/v1/courses/{id}/sessions/{session_id}/items/{kind}/{ref_id}
pub async fn remove_session_item(
    RequireTrainer(_): RequireTrainer,
    State(state): State<AppState>,
    Path((course_id, id, kind, ref_id)): Path<(DbId, DbId, ItemKind, DbId)>,
) -> AppResult<Json<ApiResponse<Session>>> {
    let mut tx = state.pool.begin().await?;
    let session = lock_session(&mut tx, course_id, id).await?;
    let items = remove_item(&session.items, SessionItem { kind, ref_id })?;
    let session = SessionRepo::set_items(&mut *tx, id, &items)
        .await?
        .ok_or_else(|| session_not_found(id))?;
    tx.commit().await?;
    Ok(Json(ApiResponse::ok(session)))
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

fn rating_lists(session: &Session) -> RatingLists<'_> {
    RatingLists {
        attendees: &session.attendee_ids,
        trainers: &session.trainer_ids,
        user_rating: &session.user_rating,
        trainer_rating: &session.trainer_rating,
    }
}

/// GET /api/v1/courses/{id}/sessions/{session_id}/rating
pub async fn get_session_rating(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((course_id, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<ApiResponse<RatingView>>> {
    let session = load_session(&state, course_id, id).await?;
    let filled = backfill_lists(&rating_lists(&session));
    if !filled.changed {
        return Ok(Json(ApiResponse::ok(filled.view())));
    }

    let mut tx = state.pool.begin().await?;
    let session = lock_session(&mut tx, course_id, id).await?;
    let filled = backfill_lists(&rating_lists(&session));
    if filled.changed {
        SessionRepo::set_ratings(&mut *tx, id, &filled.user_rating, &filled.trainer_rating)
            .await?;
    }
    tx.commit().await?;
    Ok(Json(ApiResponse::ok(filled.view())))
}

async fn submit_session_rating(
    auth: AuthUser,
    state: AppState,
    course_id: DbId,
    id: DbId,
    target: RatingTarget,
    input: SubmitRating,
) -> AppResult<Json<ApiResponse<RatingView>>> {
    let mut tx = state.pool.begin().await?;
    let session = lock_session(&mut tx, course_id, id).await?;
    let filled = apply_submission(&auth, target, &rating_lists(&session), input)?;
    SessionRepo::set_ratings(&mut *tx, id, &filled.user_rating, &filled.trainer_rating).await?;
    tx.commit().await?;
    Ok(Json(ApiResponse::ok(filled.view())))
}

/// POST /api/v1/courses/{id}/sessions/{session_id}/rating/user
pub async fn submit_session_user_rating(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((course_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<SubmitRating>,
) -> AppResult<Json<ApiResponse<RatingView>>> {
    submit_session_rating(auth, state, course_id, id, RatingTarget::User, input).await
}

/// POST /api/v1/courses/{id}/sessions/{session_id}/rating/trainer
pub async fn submit_session_trainer_rating(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((course_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<SubmitRating>,
) -> AppResult<Json<ApiResponse<RatingView>>> {
    submit_session_rating(auth, state, course_id, id, RatingTarget::Trainer, input).await
}
