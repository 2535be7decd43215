//! HTTP-level tests for the training-request lifecycle.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_test_user, get_auth, post_json_auth, token_for};
use learnhub_core::notification::{EVENT_TRAINING_CREATED, EVENT_TRAINING_REQUEST_PUBLISHED};
use serde_json::json;
use sqlx::PgPool;

async fn setup_request(app: axum::Router, trainer_token: &str) -> (i64, i64) {
    let response = post_json_auth(
        app.clone(),
        "/api/v1/courses",
        json!({"title": "First aid"}),
        trainer_token,
    )
    .await;
    let course_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = post_json_auth(
        app,
        "/api/v1/training-requests",
        json!({"course_id": course_id, "title": "First aid, spring intake"}),
        trainer_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "PENDING");
    (course_id, json["data"]["id"].as_i64().unwrap())
}

async fn post_action(app: axum::Router, id: i64, action: &str, token: &str) -> axum::response::Response {
    let uri = format!("/api/v1/training-requests/{id}/{action}");
    post_json_auth(app, &uri, json!({}), token).await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn full_lifecycle_moves_attendees_into_course(pool: PgPool) {
    let trainer = create_test_user(&pool, "trainer", "trainer").await;
    let alice = create_test_user(&pool, "alice", "learner").await;
    let bob = create_test_user(&pool, "bob", "learner").await;
    let trainer_token = token_for(&trainer);
    let (app, state) = common::build_test_app_with_state(pool);
    let mut events = state.event_bus.subscribe();

    let (course_id, id) = setup_request(app.clone(), &trainer_token).await;

    // Joining before publication is a conflict.
    let response = post_action(app.clone(), id, "join", &token_for(&alice)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_action(app.clone(), id, "publish", &trainer_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "PUBLISHED");

    let event = events.recv().await.unwrap();
    assert_eq!(event.event_type, EVENT_TRAINING_REQUEST_PUBLISHED);
    let recipients = event.payload["recipient_ids"].as_array().unwrap();
    assert!(recipients.contains(&json!(alice.id)));
    assert!(recipients.contains(&json!(bob.id)));

    for user in [&alice, &alice, &bob] {
        let response = post_action(app.clone(), id, "join", &token_for(user)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = post_action(app.clone(), id, "create-training", &trainer_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["status"], "TRAINING_CREATED");
    assert_eq!(data["pending_attendee_ids"], json!([]));
    assert_eq!(data["completed_attendee_ids"], json!([alice.id, bob.id]));

    let event = events.recv().await.unwrap();
    assert_eq!(event.event_type, EVENT_TRAINING_CREATED);

    let uri = format!("/api/v1/courses/{course_id}");
    let course = body_json(get_auth(app.clone(), &uri, &trainer_token).await).await;
    assert_eq!(course["data"]["attendee_ids"], json!([alice.id, bob.id]));

    // Terminal state: nothing else applies.
    for action in ["publish", "cancel", "create-training"] {
        let response = post_action(app.clone(), id, action, &trainer_token).await;
        assert_eq!(response.status(), StatusCode::CONFLICT, "{action}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn creating_training_from_pending_request_conflicts(pool: PgPool) {
    let trainer = create_test_user(&pool, "trainer", "trainer").await;
    let token = token_for(&trainer);
    let app = common::build_test_app(pool);

    let (_, id) = setup_request(app.clone(), &token).await;
    let response = post_action(app, id, "create-training", &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancel_then_list_by_status(pool: PgPool) {
    let trainer = create_test_user(&pool, "trainer", "trainer").await;
    let token = token_for(&trainer);
    let app = common::build_test_app(pool);

    let (_, canceled) = setup_request(app.clone(), &token).await;
    let (_, _pending) = setup_request(app.clone(), &token).await;

    let response = post_action(app.clone(), canceled, "cancel", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = post_action(app.clone(), canceled, "cancel", &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(
        get_auth(app.clone(), "/api/v1/training-requests?status=CANCELED", &token).await,
    )
    .await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], canceled);

    let response = get_auth(app, "/api/v1/training-requests?status=DONE", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn learners_cannot_publish(pool: PgPool) {
    let trainer = create_test_user(&pool, "trainer", "trainer").await;
    let learner = create_test_user(&pool, "alice", "learner").await;
    let app = common::build_test_app(pool);

    let (_, id) = setup_request(app.clone(), &token_for(&trainer)).await;
    let response = post_action(app, id, "publish", &token_for(&learner)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn request_for_missing_course_is_404(pool: PgPool) {
    let trainer = create_test_user(&pool, "trainer", "trainer").await;
    let app = common::build_test_app(pool);

    let body = json!({"course_id": 12345, "title": "Ghost"});
    let response =
        post_json_auth(app, "/api/v1/training-requests", body, &token_for(&trainer)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
