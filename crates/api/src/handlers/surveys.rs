//! Handlers for `/surveys`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use learnhub_core::assessment::validate_questions;
use learnhub_core::course::{merge_attendees, remove_attendees, validate_title};
use learnhub_core::error::CoreError;
use learnhub_core::notification::EVENT_SURVEY_ASSIGNED;
use learnhub_core::types::DbId;
use learnhub_db::models::course::AttendeeChange;
use learnhub_db::models::survey::{CreateSurvey, Survey, UpdateSurvey};
use learnhub_db::repositories::SurveyRepo;
use learnhub_events::PlatformEvent;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireTrainer;
use crate::preview::{write_preview, PreviewTarget};
use crate::query::IncludeInactiveParams;
use crate::response::ApiResponse;
use crate::state::AppState;

pub(crate) fn survey_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Survey",
        id,
    })
}

/// POST /api/v1/surveys
pub async fn create_survey(
    RequireTrainer(auth): RequireTrainer,
    State(state): State<AppState>,
    Json(input): Json<CreateSurvey>,
) -> AppResult<(StatusCode, Json<ApiResponse<Survey>>)> {
    validate_title(&input.title)?;
    validate_questions(&input.questions)?;

    let mut survey = SurveyRepo::create(&state.pool, &input, auth.user_id).await?;
    tracing::info!(survey_id = survey.id, user_id = auth.user_id, "Survey created");

    let target = PreviewTarget {
        section: "surveys",
        id: survey.id,
        title: &survey.title,
        description: survey.description.as_deref(),
    };
    if let Some(key) = write_preview(&state.config.static_dir, &state.site, &target).await {
        SurveyRepo::set_preview_key(&state.pool, survey.id, &key).await?;
        survey.preview_key = Some(key);
    }
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(survey))))
}

/// GET /api/v1/surveys
pub async fn list_surveys(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<ApiResponse<Vec<Survey>>>> {
    let surveys = SurveyRepo::list(&state.pool, params.include_inactive).await?;
    Ok(Json(ApiResponse::ok(surveys)))
}

/// GET /api/v1/surveys/{id}
pub async fn get_survey(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Survey>>> {
    let survey = SurveyRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| survey_not_found(id))?;
    Ok(Json(ApiResponse::ok(survey)))
}

/// PUT /api/v1/surveys/{id}
pub async fn update_survey(
    RequireTrainer(_): RequireTrainer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateSurvey>,
) -> AppResult<Json<ApiResponse<Survey>>> {
    if let Some(title) = &input.title {
        validate_title(title)?;
    }
    if let Some(questions) = &input.questions {
        validate_questions(questions)?;
    }
    let survey = SurveyRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| survey_not_found(id))?;
    Ok(Json(ApiResponse::ok(survey)))
}

/// POST /api/v1/surveys/{id}/attendees
pub async fn assign_survey(
    RequireTrainer(auth): RequireTrainer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AttendeeChange>,
) -> AppResult<Json<ApiResponse<Survey>>> {
    let mut tx = state.pool.begin().await?;
    let current = SurveyRepo::find_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| survey_not_found(id))?;
    let merged = merge_attendees(&current.attendee_ids, &input.user_ids);
    let added: Vec<DbId> = merged
        .iter()
        .copied()
        .filter(|uid| !current.attendee_ids.contains(uid))
        .collect();

    let survey = SurveyRepo::set_attendees(&mut *tx, id, &merged)
        .await?
        .ok_or_else(|| survey_not_found(id))?;
    tx.commit().await?;

    if !added.is_empty() {
        state.publish(
            PlatformEvent::new(EVENT_SURVEY_ASSIGNED)
                .with_source("survey", id)
                .with_actor(auth.user_id)
                .with_payload(json!({
                    "survey_id": id,
                    "title": survey.title,
                }))
                .with_recipients(&added),
        );
    }
    Ok(Json(ApiResponse::ok(survey)))
}

/// DELETE /api/v1/surveys/{id}/attendees
pub async fn unassign_survey(
    RequireTrainer(_): RequireTrainer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AttendeeChange>,
) -> AppResult<Json<ApiResponse<Survey>>> {
    let mut tx = state.pool.begin().await?;
    let current = SurveyRepo::find_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| survey_not_found(id))?;
    let remaining = remove_attendees(&current.attendee_ids, &input.user_ids);
    let survey = SurveyRepo::set_attendees(&mut *tx, id, &remaining)
        .await?
        .ok_or_else(|| survey_not_found(id))?;
    tx.commit().await?;
    Ok(Json(ApiResponse::ok(survey)))
}
