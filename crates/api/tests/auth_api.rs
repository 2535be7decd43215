//! HTTP-level tests for login, the response envelope on auth failures, and
//! role enforcement on user management.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_test_user, get, get_auth, post_json, post_json_auth, token_for,
    TEST_PASSWORD,
};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_returns_token_in_envelope(pool: PgPool) {
    let user = create_test_user(&pool, "loginuser", "trainer").await;
    let app = common::build_test_app(pool);

    let body = json!({"username": "loginuser", "password": TEST_PASSWORD});
    let response = post_json(app.clone(), "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    let data = &json["data"];
    assert!(data["access_token"].is_string());
    assert_eq!(data["token_type"], "Bearer");
    assert_eq!(data["expires_in"], 15 * 60);
    assert_eq!(data["user"]["id"], user.id);
    assert_eq!(data["user"]["role"], "trainer");
    assert!(data["user"].get("password_hash").is_none());

    // The issued token works against /me.
    let token = data["access_token"].as_str().unwrap();
    let me = body_json(get_auth(app, "/api/v1/auth/me", token).await).await;
    assert_eq!(me["data"]["username"], "loginuser");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn wrong_password_is_401_with_envelope(pool: PgPool) {
    create_test_user(&pool, "wrongpw", "learner").await;
    let app = common::build_test_app(pool);

    let body = json!({"username": "wrongpw", "password": "not the password"});
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "UNAUTHORIZED");
    assert!(json["data"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_user_gets_same_message_as_wrong_password(pool: PgPool) {
    create_test_user(&pool, "known", "learner").await;
    let app = common::build_test_app(pool);

    let unknown = body_json(
        post_json(
            app.clone(),
            "/api/v1/auth/login",
            json!({"username": "nobody", "password": TEST_PASSWORD}),
        )
        .await,
    )
    .await;
    let wrong = body_json(
        post_json(
            app,
            "/api/v1/auth/login",
            json!({"username": "known", "password": "nope nope nope"}),
        )
        .await,
    )
    .await;
    assert_eq!(unknown["message"], wrong["message"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deactivated_account_cannot_log_in(pool: PgPool) {
    let user = create_test_user(&pool, "gone", "learner").await;
    sqlx::query("UPDATE users SET is_active = false WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();
    let app = common::build_test_app(pool);

    let body = json!({"username": "gone", "password": TEST_PASSWORD});
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Token and role enforcement
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_token_is_401(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/auth/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn garbage_token_is_401(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/auth/me", "not.a.jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn learner_cannot_list_users(pool: PgPool) {
    let learner = create_test_user(&pool, "learner", "learner").await;
    let app = common::build_test_app(pool);

    let response = get_auth(app, "/api/v1/users", &token_for(&learner)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "FORBIDDEN");
}

// ---------------------------------------------------------------------------
// User management
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_creates_user_then_duplicate_conflicts(pool: PgPool) {
    let admin = create_test_user(&pool, "admin", "admin").await;
    let token = token_for(&admin);
    let app = common::build_test_app(pool);

    let body = json!({
        "username": "newbie",
        "email": "Newbie@Example.com",
        "display_name": "New Bie",
        "password": "long enough password",
        "role": "learner"
    });
    let response = post_json_auth(app.clone(), "/api/v1/users", body.clone(), &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["email"], "newbie@example.com");

    let response = post_json_auth(app, "/api/v1/users", body, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["message"], "User Already Exists");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_user_rejects_unknown_role(pool: PgPool) {
    let admin = create_test_user(&pool, "admin", "admin").await;
    let app = common::build_test_app(pool);

    let body = json!({
        "username": "someone",
        "email": "someone@example.com",
        "display_name": "Someone",
        "password": "long enough password",
        "role": "superuser"
    });
    let response = post_json_auth(app, "/api/v1/users", body, &token_for(&admin)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
