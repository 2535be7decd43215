//! Handlers for submitting answers to surveys and assessments.
//!
//! Assessments are graded on submission; surveys only store the answers.
//! An attempt tied to a course feeds that course's results.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use learnhub_core::assessment::{grade, validate_answers, Question};
use learnhub_core::course::{ItemKind, SessionItem};
use learnhub_core::error::CoreError;
use learnhub_core::types::DbId;
use learnhub_db::models::attempt::{Attempt, CreateAttempt, SubmitAttempt};
use learnhub_db::repositories::{AssessmentRepo, AttemptRepo, SurveyRepo};

use super::assessments::assessment_not_found;
use super::courses::load_course;
use super::surveys::survey_not_found;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Check the course context of an attempt: the course must list the item,
/// and a named trainer must be one of its trainers.
async fn check_course_context(
    state: &AppState,
    item: SessionItem,
    input: &SubmitAttempt,
) -> AppResult<()> {
    let Some(course_id) = input.course_id else {
        if input.trainer_id.is_some() {
            return Err(AppError::Core(CoreError::Validation(
                "trainer_id requires course_id".into(),
            )));
        }
        return Ok(());
    };
    let course = load_course(state, course_id).await?;
    if !course.items.contains(&item) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Course {course_id} does not include {} {}",
            item.kind.as_str(),
            item.ref_id
        ))));
    }
    if let Some(trainer_id) = input.trainer_id {
        if !course.trainer_ids.contains(&trainer_id) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "User {trainer_id} is not a trainer of course {course_id}"
            ))));
        }
    }
    Ok(())
}

async fn store_attempt(
    state: &AppState,
    auth: &AuthUser,
    kind: ItemKind,
    resource_id: DbId,
    questions: &[Question],
    pass_mark: Option<i32>,
    input: SubmitAttempt,
) -> AppResult<Attempt> {
    validate_answers(questions, &input.answers)?;
    check_course_context(
        state,
        SessionItem {
            kind,
            ref_id: resource_id,
        },
        &input,
    )
    .await?;

    let graded = pass_mark.map(|mark| grade(questions, &input.answers, mark));
    let attempt = AttemptRepo::create(
        &state.pool,
        &CreateAttempt {
            resource_kind: kind.as_str().to_string(),
            resource_id,
            course_id: input.course_id,
            session_id: input.session_id,
            user_id: auth.user_id,
            trainer_id: input.trainer_id,
            answers: input.answers,
            score: graded.as_ref().and_then(|g| g.score),
            passed: graded.as_ref().and_then(|g| g.passed),
        },
    )
    .await?;

    tracing::info!(
        attempt_id = attempt.id,
        resource_kind = kind.as_str(),
        resource_id,
        user_id = auth.user_id,
        score = ?attempt.score,
        "Attempt submitted"
    );
    Ok(attempt)
}

/// POST /api/v1/assessments/{id}/attempts
pub async fn submit_assessment_attempt(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SubmitAttempt>,
) -> AppResult<(StatusCode, Json<ApiResponse<Attempt>>)> {
    let assessment = AssessmentRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|a| a.is_active)
        .ok_or_else(|| assessment_not_found(id))?;
    let attempt = store_attempt(
        &state,
        &auth,
        ItemKind::Assessment,
        id,
        &assessment.questions,
        Some(assessment.pass_mark),
        input,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(attempt))))
}

/// POST /api/v1/surveys/{id}/attempts
pub async fn submit_survey_attempt(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SubmitAttempt>,
) -> AppResult<(StatusCode, Json<ApiResponse<Attempt>>)> {
    let survey = SurveyRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| survey_not_found(id))?;
    let attempt = store_attempt(
        &state,
        &auth,
        ItemKind::Survey,
        id,
        &survey.questions,
        None,
        input,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(attempt))))
}

/// GET /api/v1/assessments/{id}/attempts
///
/// The caller's own attempts, newest first.
pub async fn my_assessment_attempts(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Vec<Attempt>>>> {
    let attempts =
        AttemptRepo::list_for_user(&state.pool, ItemKind::Assessment.as_str(), id, auth.user_id)
            .await?;
    Ok(Json(ApiResponse::ok(attempts)))
}

/// GET /api/v1/surveys/{id}/attempts
pub async fn my_survey_attempts(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Vec<Attempt>>>> {
    let attempts =
        AttemptRepo::list_for_user(&state.pool, ItemKind::Survey.as_str(), id, auth.user_id)
            .await?;
    Ok(Json(ApiResponse::ok(attempts)))
}
