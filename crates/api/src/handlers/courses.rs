//! Handlers for `/courses`: course CRUD, enrollment, item lists, ratings and
//! aggregated results.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use learnhub_core::course::{
    add_item, merge_attendees, remove_attendees, remove_item, validate_title, ItemKind,
    SessionItem,
};
use learnhub_core::error::CoreError;
use learnhub_core::notification::EVENT_COURSE_ENROLLED;
use learnhub_core::results::{compute_course_results, AttemptAnswers, CourseResults, ResourceQuestions};
use learnhub_core::types::DbId;
use learnhub_db::models::course::{
    AttendeeChange, Course, CreateCourse, RatingView, SubmitRating, UpdateCourse,
};
use learnhub_db::repositories::{AssessmentRepo, AttemptRepo, CourseRepo, SurveyRepo};
use learnhub_events::PlatformEvent;
use serde_json::json;
use sqlx::{Postgres, Transaction};

use super::ratings::{apply_submission, backfill_lists, RatingLists, RatingTarget};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdmin, RequireTrainer};
use crate::query::IncludeInactiveParams;
use crate::response::ApiResponse;
use crate::state::AppState;

pub(crate) fn course_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Course",
        id,
    })
}

pub(crate) async fn load_course(state: &AppState, id: DbId) -> AppResult<Course> {
    CourseRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| course_not_found(id))
}

/// Load and lock a course for a read-modify-write of its attendee, item or
/// rating columns.
async fn lock_course(
    tx: &mut Transaction<'_, Postgres>,
    id: DbId,
) -> AppResult<Course> {
    CourseRepo::find_for_update(tx, id)
        .await?
        .ok_or_else(|| course_not_found(id))
}

/// Reject items that point at a survey or assessment that does not exist.
///
/// Program references are not backed by a table and are taken as given.
pub(crate) async fn ensure_item_exists(state: &AppState, item: SessionItem) -> AppResult<()> {
    let found = match item.kind {
        ItemKind::Survey => SurveyRepo::find_by_id(&state.pool, item.ref_id)
            .await?
            .is_some(),
        ItemKind::Assessment => AssessmentRepo::find_by_id(&state.pool, item.ref_id)
            .await?
            .is_some(),
        ItemKind::Program => true,
    };
    if !found {
        let entity = match item.kind {
            ItemKind::Survey => "Survey",
            _ => "Assessment",
        };
        return Err(AppError::Core(CoreError::NotFound {
            entity,
            id: item.ref_id,
        }));
    }
    Ok(())
}

fn publish_enrolled(state: &AppState, course: &Course, actor: DbId, user_ids: &[DbId]) {
    if user_ids.is_empty() {
        return;
    }
    state.publish(
        PlatformEvent::new(EVENT_COURSE_ENROLLED)
            .with_source("course", course.id)
            .with_actor(actor)
            .with_payload(json!({
                "course_id": course.id,
                "title": course.title,
            }))
            .with_recipients(user_ids),
    );
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// POST /api/v1/courses
pub async fn create_course(
    RequireTrainer(auth): RequireTrainer,
    State(state): State<AppState>,
    Json(mut input): Json<CreateCourse>,
) -> AppResult<(StatusCode, Json<ApiResponse<Course>>)> {
    validate_title(&input.title)?;
    input.trainer_ids = merge_attendees(&input.trainer_ids, &[]);
    input.attendee_ids = merge_attendees(&input.attendee_ids, &[]);

    let course = CourseRepo::create(&state.pool, &input, auth.user_id).await?;
    tracing::info!(course_id = course.id, user_id = auth.user_id, "Course created");
    publish_enrolled(&state, &course, auth.user_id, &course.attendee_ids);
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(course))))
}

/// GET /api/v1/courses
pub async fn list_courses(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<ApiResponse<Vec<Course>>>> {
    let courses = CourseRepo::list(&state.pool, params.include_inactive).await?;
    Ok(Json(ApiResponse::ok(courses)))
}

/// GET /api/v1/courses/{id}
pub async fn get_course(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Course>>> {
    Ok(Json(ApiResponse::ok(load_course(&state, id).await?)))
}

/// PUT /api/v1/courses/{id}
pub async fn update_course(
    RequireTrainer(_): RequireTrainer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateCourse>,
) -> AppResult<Json<ApiResponse<Course>>> {
    if let Some(title) = &input.title {
        validate_title(title)?;
    }
    if let Some(trainers) = input.trainer_ids.take() {
        input.trainer_ids = Some(merge_attendees(&trainers, &[]));
    }
    let course = CourseRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| course_not_found(id))?;
    Ok(Json(ApiResponse::ok(course)))
}

/// DELETE /api/v1/courses/{id}
pub async fn delete_course(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !CourseRepo::delete(&state.pool, id).await? {
        return Err(course_not_found(id));
    }
    tracing::info!(course_id = id, user_id = admin.user_id, "Course deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Attendees
// ---------------------------------------------------------------------------

/// POST /api/v1/courses/{id}/attendees
///
/// Enrolls users; only the newly added ones are notified.
pub async fn add_attendees(
    RequireTrainer(auth): RequireTrainer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AttendeeChange>,
) -> AppResult<Json<ApiResponse<Course>>> {
    let mut tx = state.pool.begin().await?;
    let course = lock_course(&mut tx, id).await?;
    let merged = merge_attendees(&course.attendee_ids, &input.user_ids);
    let added: Vec<DbId> = merged
        .iter()
        .copied()
        .filter(|uid| !course.attendee_ids.contains(uid))
        .collect();

    let course = CourseRepo::set_attendees(&mut *tx, id, &merged)
        .await?
        .ok_or_else(|| course_not_found(id))?;
    tx.commit().await?;
    tracing::info!(course_id = id, added = added.len(), "Attendees enrolled");
    publish_enrolled(&state, &course, auth.user_id, &added);
    Ok(Json(ApiResponse::ok(course)))
}

/// DELETE /api/v1/courses/{id}/attendees
pub async fn remove_course_attendees(
    RequireTrainer(_): RequireTrainer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AttendeeChange>,
) -> AppResult<Json<ApiResponse<Course>>> {
    let mut tx = state.pool.begin().await?;
    let course = lock_course(&mut tx, id).await?;
    let remaining = remove_attendees(&course.attendee_ids, &input.user_ids);
    let course = CourseRepo::set_attendees(&mut *tx, id, &remaining)
        .await?
        .ok_or_else(|| course_not_found(id))?;
    tx.commit().await?;
    Ok(Json(ApiResponse::ok(course)))
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// POST /api/v1/courses/{id}/items
pub async fn add_course_item(
    RequireTrainer(_): RequireTrainer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(item): Json<SessionItem>,
) -> AppResult<Json<ApiResponse<Course>>> {
    ensure_item_exists(&state, item).await?;
    let mut tx = state.pool.begin().await?;
    let course = lock_course(&mut tx, id).await?;
    let items = add_item(&course.items, item)?;
    let course = CourseRepo::set_items(&mut *tx, id, &items)
        .await?
        .ok_or_else(|| course_not_found(id))?;
    tx.commit().await?;
    Ok(Json(ApiResponse::ok(course)))
}

/// DELETE /api/v1/courses/{id}/items/{kind}/{ref_id}
pub async fn remove_course_item(
    RequireTrainer(_): RequireTrainer,
    State(state): State<AppState>,
    Path((id, kind, ref_id)): Path<(DbId, ItemKind, DbId)>,
) -> AppResult<Json<ApiResponse<Course>>> {
    let mut tx = state.pool.begin().await?;
    let course = lock_course(&mut tx, id).await?;
    let items = remove_item(&course.items, SessionItem { kind, ref_id })?;
    let course = CourseRepo::set_items(&mut *tx, id, &items)
        .await?
        .ok_or_else(|| course_not_found(id))?;
    tx.commit().await?;
    Ok(Json(ApiResponse::ok(course)))
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

fn rating_lists(course: &Course) -> RatingLists<'_> {
    RatingLists {
        attendees: &course.attendee_ids,
        trainers: &course.trainer_ids,
        user_rating: &course.user_rating,
        trainer_rating: &course.trainer_rating,
    }
}

/// GET /api/v1/courses/{id}/rating
///
/// Backfills an unrated entry for every attendee and trainer without one and
/// writes the lists back when anything was added. The write re-reads the
/// course under its row lock.
pub async fn get_course_rating(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<RatingView>>> {
    let course = load_course(&state, id).await?;
    let filled = backfill_lists(&rating_lists(&course));
    if !filled.changed {
        return Ok(Json(ApiResponse::ok(filled.view())));
    }

    let mut tx = state.pool.begin().await?;
    let course = lock_course(&mut tx, id).await?;
    let filled = backfill_lists(&rating_lists(&course));
    if filled.changed {
        CourseRepo::set_ratings(&mut *tx, id, &filled.user_rating, &filled.trainer_rating)
            .await?;
        tracing::debug!(course_id = id, "Backfilled course ratings");
    }
    tx.commit().await?;
    Ok(Json(ApiResponse::ok(filled.view())))
}

async fn submit_course_rating(
    auth: AuthUser,
    state: AppState,
    id: DbId,
    target: RatingTarget,
    input: SubmitRating,
) -> AppResult<Json<ApiResponse<RatingView>>> {
    let mut tx = state.pool.begin().await?;
    let course = lock_course(&mut tx, id).await?;
    let filled = apply_submission(&auth, target, &rating_lists(&course), input)?;
    CourseRepo::set_ratings(&mut *tx, id, &filled.user_rating, &filled.trainer_rating).await?;
    tx.commit().await?;
    Ok(Json(ApiResponse::ok(filled.view())))
}

/// POST /api/v1/courses/{id}/rating/user
pub async fn submit_user_rating(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SubmitRating>,
) -> AppResult<Json<ApiResponse<RatingView>>> {
    submit_course_rating(auth, state, id, RatingTarget::User, input).await
}

/// POST /api/v1/courses/{id}/rating/trainer
pub async fn submit_trainer_rating(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SubmitRating>,
) -> AppResult<Json<ApiResponse<RatingView>>> {
    submit_course_rating(auth, state, id, RatingTarget::Trainer, input).await
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// GET /api/v1/courses/{id}/results
///
/// Star-rating averages over every attempt submitted within the course.
pub async fn get_course_results(
    RequireTrainer(_): RequireTrainer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<CourseResults>>> {
    let course = load_course(&state, id).await?;

    let ids_of = |kind: ItemKind| -> Vec<DbId> {
        course
            .items
            .iter()
            .filter(|item| item.kind == kind)
            .map(|item| item.ref_id)
            .collect()
    };
    let surveys = SurveyRepo::find_many(&state.pool, &ids_of(ItemKind::Survey)).await?;
    let assessments =
        AssessmentRepo::find_many(&state.pool, &ids_of(ItemKind::Assessment)).await?;

    let resources: Vec<ResourceQuestions> = surveys
        .into_iter()
        .map(|s| ResourceQuestions {
            resource_kind: ItemKind::Survey.as_str().to_string(),
            resource_id: s.id,
            questions: s.questions.0,
        })
        .chain(assessments.into_iter().map(|a| ResourceQuestions {
            resource_kind: ItemKind::Assessment.as_str().to_string(),
            resource_id: a.id,
            questions: a.questions.0,
        }))
        .collect();

    let attempts: Vec<AttemptAnswers> = AttemptRepo::list_for_course(&state.pool, id)
        .await?
        .into_iter()
        .map(|a| AttemptAnswers {
            resource_kind: a.resource_kind,
            resource_id: a.resource_id,
            user_id: a.user_id,
            trainer_id: a.trainer_id,
            answers: a.answers.0,
        })
        .collect();

    let results = compute_course_results(
        &resources,
        &attempts,
        &course.attendee_ids,
        &course.trainer_ids,
    );
    Ok(Json(ApiResponse::ok(results)))
}
