#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use learnhub_api::auth::jwt::{generate_access_token, JwtConfig};
use learnhub_api::auth::password::hash_password;
use learnhub_api::config::ServerConfig;
use learnhub_api::router::build_app_router;
use learnhub_api::site::SiteConfig;
use learnhub_api::state::AppState;
use learnhub_api::ws::WsManager;
use learnhub_db::models::user::{CreateUser, User};
use learnhub_db::repositories::UserRepo;
use learnhub_events::{EventBus, MailDispatcher, RecountConfig, RecountQueue};

pub const TEST_PASSWORD: &str = "correct horse battery";

/// Test `ServerConfig` with a private static directory per call.
pub fn test_config() -> ServerConfig {
    let static_dir = std::env::temp_dir().join(format!("learnhub-test-{}", uuid::Uuid::new_v4()));
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        recount_settle_ms: 0,
        static_dir: static_dir.to_string_lossy().into_owned(),
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Application state with mail disabled and a running recount worker.
pub fn test_state(pool: PgPool) -> AppState {
    let config = test_config();
    let (recount, worker) = RecountQueue::new(pool.clone(), RecountConfig::default());
    tokio::spawn(worker.run(CancellationToken::new()));

    AppState {
        mailer: MailDispatcher::new(pool.clone(), None),
        pool,
        config: Arc::new(config),
        site: Arc::new(SiteConfig::default()),
        ws_manager: Arc::new(WsManager::new()),
        event_bus: Arc::new(EventBus::default()),
        recount,
    }
}

/// Full router over a fresh state, same middleware stack as production.
pub fn build_test_app(pool: PgPool) -> Router {
    let state = test_state(pool);
    let config = state.config.clone();
    build_app_router(state, &config)
}

/// Router plus the state behind it, for tests that subscribe to the bus.
pub fn build_test_app_with_state(pool: PgPool) -> (Router, AppState) {
    let state = test_state(pool);
    let config = state.config.clone();
    (build_app_router(state.clone(), &config), state)
}

/// Insert a user directly; the password is [`TEST_PASSWORD`].
pub async fn create_test_user(pool: &PgPool, username: &str, role: &str) -> User {
    let input = CreateUser {
        username: username.to_string(),
        email: format!("{username}@test.com"),
        display_name: username.to_string(),
        password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
        role: role.to_string(),
    };
    UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed")
}

/// Access token for `user`, signed with the test secret.
pub fn token_for(user: &User) -> String {
    generate_access_token(user.id, &user.role, &test_config().jwt)
        .expect("token generation should succeed")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");
    app.oneshot(request).await.expect("router is infallible")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn delete_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), Some(body)).await
}
