//! Repository for the `data_records` table.
//!
//! Record contents only change through an approved content update, so most
//! writers here take an open transaction owned by the approval flow.

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use learnhub_core::content_update::FieldValue;
use learnhub_core::types::DbId;

use crate::models::data_record::{BulkStatusUpdate, DataRecord, DataRecordFilter, Signature};

/// Column list for `data_records` queries.
const COLUMNS: &str = "id, org_unit_id, data_type, fields, is_active, temp_inactive, signed, \
    created_at, updated_at";

/// Advisory lock key serializing `max(id) + 1` allocation.
const ID_ALLOCATION_LOCK: i64 = 0x4c48_4441_5441;

/// Provides read and write operations for `Data` records.
pub struct DataRecordRepo;

impl DataRecordRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DataRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM data_records WHERE id = $1");
        sqlx::query_as::<_, DataRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List records, optionally narrowed to a unit and data type.
    pub async fn list(
        pool: &PgPool,
        filter: &DataRecordFilter,
    ) -> Result<Vec<DataRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM data_records
             WHERE ($1::BIGINT IS NULL OR org_unit_id = $1)
               AND ($2::TEXT IS NULL OR data_type = $2)
               AND ($3 OR is_active = true)
             ORDER BY id"
        );
        sqlx::query_as::<_, DataRecord>(&query)
            .bind(filter.org_unit_id)
            .bind(&filter.data_type)
            .bind(filter.include_inactive)
            .fetch_all(pool)
            .await
    }

    /// Current maximum id, `None` when the table is empty.
    pub async fn max_id(pool: &PgPool) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT MAX(id) FROM data_records")
            .fetch_one(pool)
            .await
    }

    /// Admin sign-off: record who signed the record and when.
    pub async fn sign(
        pool: &PgPool,
        id: DbId,
        signed_by: DbId,
    ) -> Result<Option<DataRecord>, sqlx::Error> {
        let signature = Signature {
            is_signed: true,
            signed_by: Some(signed_by),
            signed_at: Some(chrono::Utc::now()),
        };
        let query = format!(
            "UPDATE data_records SET signed = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DataRecord>(&query)
            .bind(id)
            .bind(Json(&signature))
            .fetch_optional(pool)
            .await
    }

    /// Direct status write for the admin bulk path. Bypasses the approval
    /// log. Returns the number of rows changed.
    pub async fn update_bulk_status(
        pool: &PgPool,
        input: &BulkStatusUpdate,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE data_records SET
                is_active = COALESCE($2, is_active),
                temp_inactive = COALESCE($3, temp_inactive),
                updated_at = NOW()
             WHERE id = ANY($1)",
        )
        .bind(&input.ids)
        .bind(input.is_active)
        .bind(input.temp_inactive)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Transactional writers used by the approval flow
    // -----------------------------------------------------------------------

    /// Lock a record for the rest of the transaction.
    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<DataRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM data_records WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, DataRecord>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Take the id-allocation lock and read the current maximum id.
    ///
    /// The lock is held until the transaction ends, so two concurrent
    /// approvals cannot allocate the same id.
    pub async fn lock_max_id(tx: &mut Transaction<'_, Postgres>) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ID_ALLOCATION_LOCK)
            .execute(&mut **tx)
            .await?;
        sqlx::query_scalar("SELECT MAX(id) FROM data_records")
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn exists(tx: &mut Transaction<'_, Postgres>, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM data_records WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut **tx)
            .await
    }

    /// Insert a record from an `ADD SERVICE` snapshot under `id`.
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        org_unit_id: DbId,
        data_type: &str,
        fields: &[FieldValue],
    ) -> Result<DataRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO data_records (id, org_unit_id, data_type, fields)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DataRecord>(&query)
            .bind(id)
            .bind(org_unit_id)
            .bind(data_type)
            .bind(Json(fields))
            .fetch_one(&mut **tx)
            .await
    }

    /// Replace a record's `fields` array.
    pub async fn set_fields(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        fields: &[FieldValue],
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE data_records SET fields = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(Json(fields))
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set `is_active`. Returns `true` if the row existed.
    pub async fn set_active(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        is_active: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE data_records SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(is_active)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a record to another unit.
    pub async fn set_org_unit(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        org_unit_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE data_records SET org_unit_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(org_unit_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
