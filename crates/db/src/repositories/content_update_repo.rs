//! Repository for the `content_updates` table.

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use learnhub_core::content_update::AdminChange;
use learnhub_core::types::DbId;

use crate::models::content_update::{ContentUpdate, ContentUpdateFilter, CreateContentUpdate};

/// Column list for `content_updates` queries.
const COLUMNS: &str = "id, data_id, update_type, before, after, status, updated_by, approved_by, \
    rejection_reason, admin_change, is_undo_delete, reviewed_at, created_at, updated_at";

/// Default page size for listings.
const DEFAULT_LIMIT: i64 = 50;

/// Provides persistence for the approval log.
pub struct ContentUpdateRepo;

impl ContentUpdateRepo {
    /// Insert a new `PENDING` update, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateContentUpdate,
    ) -> Result<ContentUpdate, sqlx::Error> {
        let query = format!(
            "INSERT INTO content_updates (data_id, update_type, before, after, updated_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentUpdate>(&query)
            .bind(input.data_id)
            .bind(&input.update_type)
            .bind(input.before.as_ref().map(Json))
            .bind(Json(&input.after))
            .bind(input.updated_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ContentUpdate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM content_updates WHERE id = $1");
        sqlx::query_as::<_, ContentUpdate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List updates, newest first, optionally filtered by status and record.
    pub async fn list(
        pool: &PgPool,
        filter: &ContentUpdateFilter,
    ) -> Result<Vec<ContentUpdate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM content_updates
             WHERE ($1::TEXT IS NULL OR status = $1)
               AND ($2::BIGINT IS NULL OR data_id = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, ContentUpdate>(&query)
            .bind(&filter.status)
            .bind(filter.data_id)
            .bind(filter.limit.unwrap_or(DEFAULT_LIMIT))
            .bind(filter.offset.unwrap_or(0))
            .fetch_all(pool)
            .await
    }

    /// Reject a pending update. Returns `None` if it is not pending anymore.
    pub async fn reject(
        pool: &PgPool,
        id: DbId,
        reviewer: DbId,
        reason: &str,
    ) -> Result<Option<ContentUpdate>, sqlx::Error> {
        let query = format!(
            "UPDATE content_updates SET
                status = 'REJECTED',
                approved_by = $2,
                rejection_reason = $3,
                reviewed_at = NOW(),
                updated_at = NOW()
             WHERE id = $1 AND status = 'PENDING'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentUpdate>(&query)
            .bind(id)
            .bind(reviewer)
            .bind(reason.trim())
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Transactional helpers used by the approval flow
    // -----------------------------------------------------------------------

    /// Lock an update row for the rest of the transaction.
    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<ContentUpdate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM content_updates WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, ContentUpdate>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Mark an update approved, recording the record it touched and the
    /// approver's deviations from the request.
    pub async fn mark_approved(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        approver: DbId,
        data_id: Option<DbId>,
        admin_change: &[AdminChange],
    ) -> Result<ContentUpdate, sqlx::Error> {
        let query = format!(
            "UPDATE content_updates SET
                status = 'APPROVED',
                approved_by = $2,
                data_id = COALESCE($3, data_id),
                admin_change = $4,
                reviewed_at = NOW(),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentUpdate>(&query)
            .bind(id)
            .bind(approver)
            .bind(data_id)
            .bind(Json(admin_change))
            .fetch_one(&mut **tx)
            .await
    }

    /// Flag an approved deletion as undone.
    pub async fn mark_undo_delete(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<ContentUpdate, sqlx::Error> {
        let query = format!(
            "UPDATE content_updates SET is_undo_delete = true, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentUpdate>(&query)
            .bind(id)
            .fetch_one(&mut **tx)
            .await
    }
}
