//! Handlers for `/assessments`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use learnhub_core::assessment::{validate_pass_mark, validate_questions, DEFAULT_PASS_MARK};
use learnhub_core::course::{merge_attendees, remove_attendees, validate_title};
use learnhub_core::error::CoreError;
use learnhub_core::notification::EVENT_ASSESSMENT_ASSIGNED;
use learnhub_core::roles::ROLE_LEARNER;
use learnhub_core::types::DbId;
use learnhub_db::models::assessment::{Assessment, CreateAssessment, UpdateAssessment};
use learnhub_db::models::course::AttendeeChange;
use learnhub_db::repositories::AssessmentRepo;
use learnhub_events::PlatformEvent;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireTrainer;
use crate::preview::{write_preview, PreviewTarget};
use crate::query::IncludeInactiveParams;
use crate::response::ApiResponse;
use crate::state::AppState;

pub(crate) fn assessment_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Assessment",
        id,
    })
}

/// Learners never see which option is correct.
fn redact_for(auth: &AuthUser, mut assessment: Assessment) -> Assessment {
    if auth.role == ROLE_LEARNER {
        for q in assessment.questions.iter_mut() {
            q.correct_option = None;
        }
    }
    assessment
}

/// POST /api/v1/assessments
///
/// Also writes the social preview page; its key is stored when the write
/// succeeds.
pub async fn create_assessment(
    RequireTrainer(auth): RequireTrainer,
    State(state): State<AppState>,
    Json(input): Json<CreateAssessment>,
) -> AppResult<(StatusCode, Json<ApiResponse<Assessment>>)> {
    validate_title(&input.title)?;
    validate_questions(&input.questions)?;
    validate_pass_mark(input.pass_mark.unwrap_or(DEFAULT_PASS_MARK))?;

    let mut assessment = AssessmentRepo::create(&state.pool, &input, auth.user_id).await?;
    tracing::info!(assessment_id = assessment.id, user_id = auth.user_id, "Assessment created");

    let target = PreviewTarget {
        section: "assessments",
        id: assessment.id,
        title: &assessment.title,
        description: assessment.description.as_deref(),
    };
    if let Some(key) = write_preview(&state.config.static_dir, &state.site, &target).await {
        AssessmentRepo::set_preview_key(&state.pool, assessment.id, &key).await?;
        assessment.preview_key = Some(key);
    }
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(assessment))))
}

/// GET /api/v1/assessments
pub async fn list_assessments(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<ApiResponse<Vec<Assessment>>>> {
    let assessments = AssessmentRepo::list(&state.pool, params.include_inactive)
        .await?
        .into_iter()
        .map(|a| redact_for(&auth, a))
        .collect();
    Ok(Json(ApiResponse::ok(assessments)))
}

/// GET /api/v1/assessments/{id}
pub async fn get_assessment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Assessment>>> {
    let assessment = AssessmentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| assessment_not_found(id))?;
    Ok(Json(ApiResponse::ok(redact_for(&auth, assessment))))
}

/// PUT /api/v1/assessments/{id}
pub async fn update_assessment(
    RequireTrainer(_): RequireTrainer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAssessment>,
) -> AppResult<Json<ApiResponse<Assessment>>> {
    if let Some(title) = &input.title {
        validate_title(title)?;
    }
    if let Some(questions) = &input.questions {
        validate_questions(questions)?;
    }
    if let Some(pass_mark) = input.pass_mark {
        validate_pass_mark(pass_mark)?;
    }
    let assessment = AssessmentRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| assessment_not_found(id))?;
    Ok(Json(ApiResponse::ok(assessment)))
}

/// POST /api/v1/assessments/{id}/attendees
///
/// Assigns the assessment; newly assigned users are notified.
pub async fn assign_assessment(
    RequireTrainer(auth): RequireTrainer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AttendeeChange>,
) -> AppResult<Json<ApiResponse<Assessment>>> {
    let mut tx = state.pool.begin().await?;
    let current = AssessmentRepo::find_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| assessment_not_found(id))?;
    let merged = merge_attendees(&current.attendee_ids, &input.user_ids);
    let added: Vec<DbId> = merged
        .iter()
        .copied()
        .filter(|uid| !current.attendee_ids.contains(uid))
        .collect();

    let assessment = AssessmentRepo::set_attendees(&mut *tx, id, &merged)
        .await?
        .ok_or_else(|| assessment_not_found(id))?;
    tx.commit().await?;

    if !added.is_empty() {
        state.publish(
            PlatformEvent::new(EVENT_ASSESSMENT_ASSIGNED)
                .with_source("assessment", id)
                .with_actor(auth.user_id)
                .with_payload(json!({
                    "assessment_id": id,
                    "title": assessment.title,
                }))
                .with_recipients(&added),
        );
    }
    Ok(Json(ApiResponse::ok(assessment)))
}

/// DELETE /api/v1/assessments/{id}/attendees
pub async fn unassign_assessment(
    RequireTrainer(_): RequireTrainer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AttendeeChange>,
) -> AppResult<Json<ApiResponse<Assessment>>> {
    let mut tx = state.pool.begin().await?;
    let current = AssessmentRepo::find_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| assessment_not_found(id))?;
    let remaining = remove_attendees(&current.attendee_ids, &input.user_ids);
    let assessment = AssessmentRepo::set_attendees(&mut *tx, id, &remaining)
        .await?
        .ok_or_else(|| assessment_not_found(id))?;
    tx.commit().await?;
    Ok(Json(ApiResponse::ok(assessment)))
}
