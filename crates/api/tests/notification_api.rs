//! Tests for event routing into stored notifications and the
//! `/notifications` endpoints.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{body_json, create_test_user, get_auth, post_json_auth, token_for};
use learnhub_api::notifications::NotificationRouter;
use learnhub_api::state::AppState;
use learnhub_core::notification::{EVENT_CONTENT_UPDATE_SUBMITTED, EVENT_COURSE_ENROLLED};
use learnhub_events::PlatformEvent;
use serde_json::json;
use sqlx::PgPool;

fn router_for(state: &AppState) -> NotificationRouter {
    NotificationRouter::new(
        state.pool.clone(),
        Arc::clone(&state.ws_manager),
        state.mailer.clone(),
        Arc::clone(&state.site),
    )
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn enrollment_event_stores_one_row_per_recipient(pool: PgPool) {
    let alice = create_test_user(&pool, "alice", "learner").await;
    let bob = create_test_user(&pool, "bob", "learner").await;
    let (_app, state) = common::build_test_app_with_state(pool);

    let event = PlatformEvent::new(EVENT_COURSE_ENROLLED)
        .with_source("course", 7)
        .with_payload(json!({"course_id": 7, "title": "First aid"}))
        .with_recipients(&[alice.id, bob.id]);
    let stored = router_for(&state).route_event(&event).await.unwrap();

    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|n| n.kind == "course_enrolled"));
    assert!(stored[0].title.contains("First aid"));
    assert!(stored[0].link.as_deref().unwrap().ends_with("/courses/7"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submission_without_recipients_goes_to_admins(pool: PgPool) {
    let admin = create_test_user(&pool, "admin", "admin").await;
    create_test_user(&pool, "learner", "learner").await;
    let (_app, state) = common::build_test_app_with_state(pool);

    let event = PlatformEvent::new(EVENT_CONTENT_UPDATE_SUBMITTED)
        .with_payload(json!({"content_update_id": 3, "update_type": "EDIT"}));
    let stored = router_for(&state).route_event(&event).await.unwrap();

    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].user_id, admin.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unmapped_event_stores_nothing(pool: PgPool) {
    let alice = create_test_user(&pool, "alice", "learner").await;
    let (_app, state) = common::build_test_app_with_state(pool);

    let event = PlatformEvent::new("something.else").with_recipients(&[alice.id]);
    let stored = router_for(&state).route_event(&event).await.unwrap();
    assert!(stored.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_count_and_mark_read(pool: PgPool) {
    let alice = create_test_user(&pool, "alice", "learner").await;
    let bob = create_test_user(&pool, "bob", "learner").await;
    let (app, state) = common::build_test_app_with_state(pool);
    let router = router_for(&state);

    for course_id in [1, 2] {
        let event = PlatformEvent::new(EVENT_COURSE_ENROLLED)
            .with_payload(json!({"course_id": course_id, "title": "Course"}))
            .with_recipients(&[alice.id]);
        router.route_event(&event).await.unwrap();
    }
    let token = token_for(&alice);

    let json = body_json(get_auth(app.clone(), "/api/v1/notifications", &token).await).await;
    let rows = json["data"].as_array().unwrap().clone();
    assert_eq!(rows.len(), 2);

    let json = body_json(get_auth(app.clone(), "/api/v1/notifications/unread-count", &token).await).await;
    assert_eq!(json["data"]["count"], 2);

    // Someone else's notification is not found.
    let uri = format!("/api/v1/notifications/{}/read", rows[0]["id"]);
    let response = post_json_auth(app.clone(), &uri, json!({}), &token_for(&bob)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_json_auth(app.clone(), &uri, json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let json = body_json(
        get_auth(app.clone(), "/api/v1/notifications?unread_only=true", &token).await,
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let response = post_json_auth(app.clone(), "/api/v1/notifications/read-all", json!({}), &token).await;
    assert_eq!(body_json(response).await["data"]["marked_read"], 1);

    let json = body_json(get_auth(app, "/api/v1/notifications/unread-count", &token).await).await;
    assert_eq!(json["data"]["count"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn mail_logs_are_admin_only(pool: PgPool) {
    let admin = create_test_user(&pool, "admin", "admin").await;
    let learner = create_test_user(&pool, "learner", "learner").await;
    let app = common::build_test_app(pool);

    let response = get_auth(app.clone(), "/api/v1/mail-logs", &token_for(&learner)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(app, "/api/v1/mail-logs?limit=10", &token_for(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"], json!([]));
}
