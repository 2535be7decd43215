//! Repository for the `data_fields` table.

use sqlx::PgPool;
use learnhub_core::types::DbId;

use crate::models::data_record::{CreateDataField, DataField};

const COLUMNS: &str = "id, name, field_type, created_at";

/// Field types a `data_fields` row may declare.
pub const FIELD_TYPES: &[&str] = &["text", "number", "date", "boolean", "url", "email"];

/// Provides operations for record field definitions.
pub struct DataFieldRepo;

impl DataFieldRepo {
    pub async fn create(pool: &PgPool, input: &CreateDataField) -> Result<DataField, sqlx::Error> {
        let query = format!(
            "INSERT INTO data_fields (name, field_type) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DataField>(&query)
            .bind(input.name.trim())
            .bind(&input.field_type)
            .fetch_one(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<DataField>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM data_fields ORDER BY id");
        sqlx::query_as::<_, DataField>(&query).fetch_all(pool).await
    }

    /// Ids among `ids` that have no field definition.
    pub async fn missing_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT wanted FROM UNNEST($1::BIGINT[]) AS wanted
             WHERE NOT EXISTS (SELECT 1 FROM data_fields f WHERE f.id = wanted)
             ORDER BY wanted",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }
}
