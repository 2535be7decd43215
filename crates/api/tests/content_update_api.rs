//! HTTP-level tests for proposing, approving, rejecting and undoing content
//! updates.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_test_user, get_auth, post_json_auth, token_for};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    admin_token: String,
    learner_token: String,
    unit_id: i64,
    name_field: i64,
    phone_field: i64,
}

async fn setup(pool: &PgPool) -> Fixture {
    let admin = create_test_user(pool, "admin", "admin").await;
    let learner = create_test_user(pool, "learner", "learner").await;

    let unit_id: i64 =
        sqlx::query_scalar("INSERT INTO org_units (name) VALUES ('Clinic') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
    let name_field: i64 = sqlx::query_scalar(
        "INSERT INTO data_fields (name, field_type) VALUES ('name', 'text') RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    let phone_field: i64 = sqlx::query_scalar(
        "INSERT INTO data_fields (name, field_type) VALUES ('phone', 'text') RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    Fixture {
        admin_token: token_for(&admin),
        learner_token: token_for(&learner),
        unit_id,
        name_field,
        phone_field,
    }
}

async fn insert_record(pool: &PgPool, id: i64, unit_id: i64, fields: serde_json::Value) {
    sqlx::query(
        "INSERT INTO data_records (id, org_unit_id, data_type, fields) VALUES ($1, $2, 'service', $3)",
    )
    .bind(id)
    .bind(unit_id)
    .bind(fields)
    .execute(pool)
    .await
    .unwrap();
}

async fn propose(
    app: axum::Router,
    token: &str,
    body: serde_json::Value,
) -> serde_json::Value {
    let response = post_json_auth(app, "/api/v1/content-updates", body, token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

// ---------------------------------------------------------------------------
// ADD SERVICE
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn add_service_allocates_next_id(pool: PgPool) {
    let fx = setup(&pool).await;
    insert_record(&pool, 41, fx.unit_id, json!([])).await;
    let app = common::build_test_app(pool.clone());

    let update = propose(
        app.clone(),
        &fx.learner_token,
        json!({
            "update_type": "ADD SERVICE",
            "after": {
                "id": null,
                "org_unit_id": fx.unit_id,
                "data_type": "service",
                "fields": [{"field_id": fx.name_field, "value": "Blood tests"}]
            }
        }),
    )
    .await;
    assert_eq!(update["status"], "PENDING");
    assert!(update["data_id"].is_null());

    let uri = format!("/api/v1/content-updates/{}/approve", update["id"]);
    let response = post_json_auth(app.clone(), &uri, json!({}), &fx.admin_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let approved = body_json(response).await["data"].clone();
    assert_eq!(approved["status"], "APPROVED");
    assert_eq!(approved["data_id"], 42);

    let response = get_auth(app, "/api/v1/data/42", &fx.admin_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let record = body_json(response).await["data"].clone();
    assert_eq!(record["org_unit_id"], fx.unit_id);
    assert_eq!(record["fields"][0]["value"], "Blood tests");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn add_service_with_taken_id_conflicts(pool: PgPool) {
    let fx = setup(&pool).await;
    insert_record(&pool, 7, fx.unit_id, json!([])).await;
    let app = common::build_test_app(pool);

    let update = propose(
        app.clone(),
        &fx.learner_token,
        json!({
            "update_type": "ADD SERVICE",
            "after": {"id": 7, "org_unit_id": fx.unit_id, "data_type": "service"}
        }),
    )
    .await;

    let uri = format!("/api/v1/content-updates/{}/approve", update["id"]);
    let response = post_json_auth(app.clone(), &uri, json!({}), &fx.admin_token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The update stays pending.
    let uri = format!("/api/v1/content-updates/{}", update["id"]);
    let json = body_json(get_auth(app, &uri, &fx.admin_token).await).await;
    assert_eq!(json["data"]["status"], "PENDING");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn records_cannot_move_into_inactive_units(pool: PgPool) {
    let fx = setup(&pool).await;
    insert_record(&pool, 1, fx.unit_id, json!([])).await;
    let closed: i64 = sqlx::query_scalar(
        "INSERT INTO org_units (name, is_active) VALUES ('Closed clinic', false) RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let annex: i64 = sqlx::query_scalar(
        "INSERT INTO org_units (name, parent_id) VALUES ('Annex', $1) RETURNING id",
    )
    .bind(fx.unit_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    let app = common::build_test_app(pool.clone());

    // Proposing straight into an inactive unit is rejected.
    let body = json!({
        "update_type": "ADD SERVICE",
        "after": {"org_unit_id": closed, "data_type": "service"}
    });
    let response = post_json_auth(app.clone(), "/api/v1/content-updates", body, &fx.learner_token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    // A unit that goes inactive after the proposal is re-checked on approval.
    let update = propose(
        app.clone(),
        &fx.learner_token,
        json!({
            "update_type": "OU CHANGE",
            "data_id": 1,
            "after": {"org_unit_id": annex}
        }),
    )
    .await;
    let uri = format!("/api/v1/org-units/{}", fx.unit_id);
    let response = common::delete_auth(app.clone(), &uri, &fx.admin_token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let uri = format!("/api/v1/content-updates/{}/approve", update["id"]);
    let response = post_json_auth(app.clone(), &uri, json!({}), &fx.admin_token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let uri = format!("/api/v1/content-updates/{}", update["id"]);
    let json = body_json(get_auth(app, &uri, &fx.admin_token).await).await;
    assert_eq!(json["data"]["status"], "PENDING");
    let unit: i64 = sqlx::query_scalar("SELECT org_unit_id FROM data_records WHERE id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(unit, fx.unit_id);
}

// ---------------------------------------------------------------------------
// EDIT
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn edit_writes_only_checked_fields(pool: PgPool) {
    let fx = setup(&pool).await;
    insert_record(
        &pool,
        1,
        fx.unit_id,
        json!([
            {"field_id": fx.name_field, "value": "Old name"},
            {"field_id": fx.phone_field, "value": "111"}
        ]),
    )
    .await;
    let app = common::build_test_app(pool);

    let update = propose(
        app.clone(),
        &fx.learner_token,
        json!({
            "update_type": "EDIT",
            "data_id": 1,
            "after": {"fields": [
                {"field_id": fx.name_field, "value": "New name"},
                {"field_id": fx.phone_field, "value": "222"}
            ]}
        }),
    )
    .await;
    assert_eq!(update["before"]["fields"][0]["value"], "Old name");

    let uri = format!("/api/v1/content-updates/{}/approve", update["id"]);
    let review = json!({"fields": [
        {"field_id": fx.name_field, "value": "New name", "checked": true},
        {"field_id": fx.phone_field, "value": "222", "checked": false}
    ]});
    let response = post_json_auth(app.clone(), &uri, review, &fx.admin_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let approved = body_json(response).await["data"].clone();
    let changes = approved["admin_change"].as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["field_id"], fx.phone_field);
    assert!(changes[0]["approved"].is_null());

    let record = body_json(get_auth(app, "/api/v1/data/1", &fx.admin_token).await).await;
    let fields = record["data"]["fields"].as_array().unwrap().clone();
    let value_of = |id: i64| {
        fields
            .iter()
            .find(|f| f["field_id"] == id)
            .map(|f| (f["value"].clone(), f["was_edited"].clone()))
            .unwrap()
    };
    assert_eq!(value_of(fx.name_field), (json!("New name"), json!(true)));
    assert_eq!(value_of(fx.phone_field), (json!("111"), json!(false)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn proposing_unknown_field_is_rejected(pool: PgPool) {
    let fx = setup(&pool).await;
    insert_record(&pool, 1, fx.unit_id, json!([])).await;
    let app = common::build_test_app(pool);

    let body = json!({
        "update_type": "EDIT",
        "data_id": 1,
        "after": {"fields": [{"field_id": 9999, "value": "x"}]}
    });
    let response = post_json_auth(app, "/api/v1/content-updates", body, &fx.learner_token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// DELETE / undo
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_then_undo_is_idempotent(pool: PgPool) {
    let fx = setup(&pool).await;
    insert_record(&pool, 5, fx.unit_id, json!([])).await;
    let app = common::build_test_app(pool.clone());

    let update = propose(
        app.clone(),
        &fx.learner_token,
        json!({"update_type": "DELETE", "data_id": 5}),
    )
    .await;
    let id = update["id"].as_i64().unwrap();

    let uri = format!("/api/v1/content-updates/{id}/approve");
    let response = post_json_auth(app.clone(), &uri, json!({}), &fx.admin_token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let active: bool = sqlx::query_scalar("SELECT is_active FROM data_records WHERE id = 5")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!active);

    let uri = format!("/api/v1/content-updates/{id}/undo-delete");
    for _ in 0..2 {
        let response = post_json_auth(app.clone(), &uri, json!({}), &fx.admin_token).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["is_undo_delete"], true);
    }

    let active: bool = sqlx::query_scalar("SELECT is_active FROM data_records WHERE id = 5")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(active);
}

// ---------------------------------------------------------------------------
// Failure paths
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_update_type_fails_with_invalid_log(pool: PgPool) {
    let fx = setup(&pool).await;
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO content_updates (update_type, after) VALUES ('MERGE', '{}') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let app = common::build_test_app(pool.clone());

    let uri = format!("/api/v1/content-updates/{id}/approve");
    let response = post_json_auth(app, &uri, json!({}), &fx.admin_token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().contains("Invalid Log"));

    let status: String = sqlx::query_scalar("SELECT status FROM content_updates WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "PENDING");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reject_stores_reason_and_blocks_approval(pool: PgPool) {
    let fx = setup(&pool).await;
    insert_record(&pool, 3, fx.unit_id, json!([])).await;
    let app = common::build_test_app(pool);

    let update = propose(
        app.clone(),
        &fx.learner_token,
        json!({"update_type": "DELETE", "data_id": 3}),
    )
    .await;
    let id = update["id"].as_i64().unwrap();

    let uri = format!("/api/v1/content-updates/{id}/reject");
    let response =
        post_json_auth(app.clone(), &uri, json!({"reason": "Still open"}), &fx.admin_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "REJECTED");
    assert_eq!(json["data"]["rejection_reason"], "Still open");

    let uri = format!("/api/v1/content-updates/{id}/approve");
    let response = post_json_auth(app, &uri, json!({}), &fx.admin_token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn learners_cannot_approve(pool: PgPool) {
    let fx = setup(&pool).await;
    insert_record(&pool, 3, fx.unit_id, json!([])).await;
    let app = common::build_test_app(pool);

    let update = propose(
        app.clone(),
        &fx.learner_token,
        json!({"update_type": "DELETE", "data_id": 3}),
    )
    .await;

    let uri = format!("/api/v1/content-updates/{}/approve", update["id"]);
    let response = post_json_auth(app, &uri, json!({}), &fx.learner_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["code"], "FORBIDDEN");
}
