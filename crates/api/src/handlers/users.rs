//! Handlers for `/users` (admin account management).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use learnhub_core::error::CoreError;
use learnhub_core::types::DbId;
use learnhub_core::users::{
    validate_email, validate_password, validate_role, validate_username, USER_ALREADY_EXISTS,
};
use learnhub_db::models::user::{CreateUser, UpdateUser, UserResponse};
use learnhub_db::repositories::UserRepo;
use serde::Deserialize;

use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub role: String,
}

/// POST /api/v1/users
///
/// A duplicate username or email is a 409 "User Already Exists".
pub async fn create_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    let username = input.username.trim();
    let email = input.email.trim().to_lowercase();
    validate_username(username)?;
    validate_email(&email)?;
    validate_role(&input.role)?;
    validate_password(&input.password)?;

    if UserRepo::exists(&state.pool, username, &email).await? {
        return Err(AppError::Core(CoreError::Conflict(USER_ALREADY_EXISTS.into())));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Failed to hash password: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: username.to_string(),
            email,
            display_name: input.display_name.trim().to_string(),
            password_hash,
            role: input.role,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, created_by = admin.user_id, role = %user.role, "User created");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(user.into()))))
}

/// GET /api/v1/users
pub async fn list_users(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<UserResponse>>>> {
    let users = UserRepo::list(&state.pool).await?;
    Ok(Json(ApiResponse::ok(
        users.into_iter().map(UserResponse::from).collect(),
    )))
}

/// GET /api/v1/users/{id}
///
/// Admins may read anyone; other users only themselves.
pub async fn get_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    if !auth.is_admin() && auth.user_id != id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot read another user's account".into(),
        )));
    }
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;
    Ok(Json(ApiResponse::ok(user.into())))
}

/// PUT /api/v1/users/{id}
pub async fn update_user(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateUser>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    if let Some(role) = &input.role {
        validate_role(role)?;
    }
    if let Some(email) = input.email.take() {
        let email = email.trim().to_lowercase();
        validate_email(&email)?;
        input.email = Some(email);
    }

    let user = UserRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;
    Ok(Json(ApiResponse::ok(user.into())))
}
