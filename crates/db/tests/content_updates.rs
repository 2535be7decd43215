//! Integration tests for the approval log and the record writers it drives:
//! - sequential id allocation (`max + 1`)
//! - pending-only rejection
//! - approval bookkeeping and undo-delete flags

use assert_matches::assert_matches;
use serde_json::json;
use sqlx::PgPool;
use learnhub_core::content_update::{
    resolve_new_id, AdminChange, DataSnapshot, FieldValue, UpdateType,
};
use learnhub_db::models::content_update::{ContentUpdateFilter, CreateContentUpdate};
use learnhub_db::models::org_unit::CreateOrgUnit;
use learnhub_db::models::user::CreateUser;
use learnhub_db::repositories::{ContentUpdateRepo, DataRecordRepo, OrgUnitRepo, UserRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, username: &str) -> i64 {
    let input = CreateUser {
        username: username.to_string(),
        email: format!("{username}@example.org"),
        display_name: username.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        role: "admin".to_string(),
    };
    UserRepo::create(pool, &input).await.unwrap().id
}

async fn seed_unit(pool: &PgPool) -> i64 {
    let input = CreateOrgUnit {
        name: "Clinic".to_string(),
        parent_id: None,
        type_id: None,
        category: None,
        location: None,
        theme: None,
    };
    OrgUnitRepo::create(pool, &input).await.unwrap().id
}

fn field(field_id: i64, value: serde_json::Value) -> FieldValue {
    FieldValue {
        field_id,
        value,
        was_edited: false,
    }
}

fn add_service_snapshot(org_unit_id: i64) -> DataSnapshot {
    DataSnapshot {
        id: None,
        org_unit_id: Some(org_unit_id),
        data_type: Some("service".to_string()),
        fields: vec![field(1, json!("Blood tests"))],
        is_active: None,
    }
}

// ---------------------------------------------------------------------------
// Id allocation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_next_id_follows_current_maximum(pool: PgPool) {
    let unit = seed_unit(&pool).await;
    assert_eq!(DataRecordRepo::max_id(&pool).await.unwrap(), None);

    let mut tx = pool.begin().await.unwrap();
    DataRecordRepo::insert(&mut tx, 41, unit, "service", &[]).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let max = DataRecordRepo::lock_max_id(&mut tx).await.unwrap();
    assert_eq!(max, Some(41));
    let id = resolve_new_id(&add_service_snapshot(unit), max);
    assert_eq!(id, 42);
    let record = DataRecordRepo::insert(&mut tx, id, unit, "service", &[])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(record.id, 42);
    assert!(record.is_active);
    assert!(!record.signed.0.is_signed);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_explicit_id_collision_is_a_unique_violation(pool: PgPool) {
    let unit = seed_unit(&pool).await;
    let mut tx = pool.begin().await.unwrap();
    DataRecordRepo::insert(&mut tx, 7, unit, "service", &[]).await.unwrap();
    assert!(DataRecordRepo::exists(&mut tx, 7).await.unwrap());
    let err = DataRecordRepo::insert(&mut tx, 7, unit, "service", &[])
        .await
        .unwrap_err();
    assert_matches!(err, sqlx::Error::Database(e) if e.code().as_deref() == Some("23505"));
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reject_only_applies_to_pending(pool: PgPool) {
    let user = seed_user(&pool, "editor").await;
    let unit = seed_unit(&pool).await;

    let created = ContentUpdateRepo::create(
        &pool,
        &CreateContentUpdate {
            data_id: None,
            update_type: UpdateType::AddService.as_str().to_string(),
            before: None,
            after: add_service_snapshot(unit),
            updated_by: user,
        },
    )
    .await
    .unwrap();
    assert_eq!(created.status, "PENDING");
    assert!(created.before.is_none());

    let rejected = ContentUpdateRepo::reject(&pool, created.id, user, "  Duplicate ")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rejected.status, "REJECTED");
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Duplicate"));
    assert!(rejected.reviewed_at.is_some());

    let again = ContentUpdateRepo::reject(&pool, created.id, user, "again")
        .await
        .unwrap();
    assert!(again.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_approval_records_admin_changes_and_undo(pool: PgPool) {
    let user = seed_user(&pool, "reviewer").await;
    let unit = seed_unit(&pool).await;

    let mut tx = pool.begin().await.unwrap();
    let record = DataRecordRepo::insert(&mut tx, 1, unit, "service", &[field(1, json!("a"))])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let update = ContentUpdateRepo::create(
        &pool,
        &CreateContentUpdate {
            data_id: Some(record.id),
            update_type: UpdateType::Delete.as_str().to_string(),
            before: Some(record.snapshot()),
            after: DataSnapshot::default(),
            updated_by: user,
        },
    )
    .await
    .unwrap();

    let change = AdminChange {
        field_id: 1,
        requested: Some(json!("a")),
        approved: None,
    };
    let mut tx = pool.begin().await.unwrap();
    let locked = ContentUpdateRepo::find_for_update(&mut tx, update.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(locked.status, "PENDING");
    assert!(DataRecordRepo::set_active(&mut tx, record.id, false).await.unwrap());
    let approved = ContentUpdateRepo::mark_approved(&mut tx, update.id, user, None, &[change.clone()])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(approved.status, "APPROVED");
    assert_eq!(approved.approved_by, Some(user));
    assert_eq!(approved.data_id, Some(record.id));
    assert_eq!(approved.admin_change.0, vec![change]);

    let stored = DataRecordRepo::find_by_id(&pool, record.id).await.unwrap().unwrap();
    assert!(!stored.is_active);

    let mut tx = pool.begin().await.unwrap();
    DataRecordRepo::set_active(&mut tx, record.id, true).await.unwrap();
    let undone = ContentUpdateRepo::mark_undo_delete(&mut tx, update.id).await.unwrap();
    tx.commit().await.unwrap();
    assert!(undone.is_undo_delete);

    let listed = ContentUpdateRepo::list(
        &pool,
        &ContentUpdateFilter {
            status: Some("APPROVED".to_string()),
            data_id: Some(record.id),
            limit: None,
            offset: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(listed.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_dropped_transaction_leaves_record_untouched(pool: PgPool) {
    let unit = seed_unit(&pool).await;
    let mut tx = pool.begin().await.unwrap();
    DataRecordRepo::insert(&mut tx, 3, unit, "service", &[field(1, json!("old"))])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    {
        let mut tx = pool.begin().await.unwrap();
        DataRecordRepo::set_fields(&mut tx, 3, &[field(1, json!("new"))])
            .await
            .unwrap();
        // dropped without commit
    }

    let stored = DataRecordRepo::find_by_id(&pool, 3).await.unwrap().unwrap();
    assert_eq!(stored.fields.0[0].value, json!("old"));
}
