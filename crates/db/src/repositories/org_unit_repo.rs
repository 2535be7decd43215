//! Repository for the `org_units` and `org_unit_types` tables.

use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use learnhub_core::org_unit::{compute_counters, DataTally, OuForest, OuNode};
use learnhub_core::types::DbId;

use crate::models::org_unit::{
    CreateOrgUnit, OrgUnit, OrgUnitType, OrgUnitWithDepth, UpdateOrgUnit,
};

/// Column list for `org_units` queries.
const COLUMNS: &str = "id, name, parent_id, type_id, category, location, is_active, \
    data_counter, theme, created_at, updated_at";

/// Same columns qualified with the `u` alias used by traversal queries.
const U_COLUMNS: &str = "u.id, u.name, u.parent_id, u.type_id, u.category, u.location, \
    u.is_active, u.data_counter, u.theme, u.created_at, u.updated_at";

/// Advisory lock key serializing structural changes to the unit tree.
const TREE_LOCK: i64 = 0x4c48_4f55_5452;

/// Provides CRUD, traversal and recount operations for organizational units.
pub struct OrgUnitRepo;

impl OrgUnitRepo {
    /// Insert a new unit, returning the created row.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: &CreateOrgUnit,
    ) -> Result<OrgUnit, sqlx::Error> {
        let query = format!(
            "INSERT INTO org_units (name, parent_id, type_id, category, location, theme)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrgUnit>(&query)
            .bind(input.name.trim())
            .bind(input.parent_id)
            .bind(input.type_id)
            .bind(&input.category)
            .bind(&input.location)
            .bind(&input.theme)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<OrgUnit>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM org_units WHERE id = $1");
        sqlx::query_as::<_, OrgUnit>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List units ordered by name. Inactive units are skipped unless
    /// `include_inactive` is set.
    pub async fn list(pool: &PgPool, include_inactive: bool) -> Result<Vec<OrgUnit>, sqlx::Error> {
        let filter = if include_inactive {
            ""
        } else {
            "WHERE is_active = true"
        };
        let query = format!("SELECT {COLUMNS} FROM org_units {filter} ORDER BY name, id");
        sqlx::query_as::<_, OrgUnit>(&query).fetch_all(pool).await
    }

    /// Load several units by id.
    pub async fn find_many(pool: &PgPool, ids: &[DbId]) -> Result<Vec<OrgUnit>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM org_units WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, OrgUnit>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Update a unit. Only non-`None` fields in `input` are applied;
    /// `parent_id: Some(None)` detaches the unit into a root.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        input: &UpdateOrgUnit,
    ) -> Result<Option<OrgUnit>, sqlx::Error> {
        let query = format!(
            "UPDATE org_units SET
                name = COALESCE($2, name),
                parent_id = CASE WHEN $3 THEN $4 ELSE parent_id END,
                type_id = COALESCE($5, type_id),
                category = COALESCE($6, category),
                location = COALESCE($7, location),
                is_active = COALESCE($8, is_active),
                theme = COALESCE($9, theme),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrgUnit>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(input.parent_id.is_some())
            .bind(input.parent_id.flatten())
            .bind(input.type_id)
            .bind(&input.category)
            .bind(&input.location)
            .bind(input.is_active)
            .bind(&input.theme)
            .fetch_optional(executor)
            .await
    }

    /// Mark a unit inactive. Returns `true` if a row changed.
    pub async fn deactivate<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE org_units SET is_active = false, updated_at = NOW()
             WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Traversal
    // -----------------------------------------------------------------------

    /// The given units plus every descendant, each with its depth below the
    /// nearest start unit (start units are 0).
    pub async fn get_with_children(
        pool: &PgPool,
        ids: &[DbId],
    ) -> Result<Vec<OrgUnitWithDepth>, sqlx::Error> {
        let query = format!(
            "WITH RECURSIVE tree AS (
                SELECT id, 0 AS depth, ARRAY[id] AS path
                FROM org_units WHERE id = ANY($1)
                UNION ALL
                SELECT c.id, t.depth + 1, t.path || c.id
                FROM org_units c
                JOIN tree t ON c.parent_id = t.id
                WHERE NOT c.id = ANY(t.path)
             )
             SELECT {U_COLUMNS}, MIN(t.depth) AS depth
             FROM tree t
             JOIN org_units u ON u.id = t.id
             GROUP BY u.id
             ORDER BY depth, u.id"
        );
        sqlx::query_as::<_, OrgUnitWithDepth>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// The given units with their ancestors (negative depth) and descendants
    /// (positive depth).
    pub async fn get_with_graph(
        pool: &PgPool,
        ids: &[DbId],
    ) -> Result<Vec<OrgUnitWithDepth>, sqlx::Error> {
        let query = format!(
            "WITH RECURSIVE down AS (
                SELECT id, 0 AS depth, ARRAY[id] AS path
                FROM org_units WHERE id = ANY($1)
                UNION ALL
                SELECT c.id, d.depth + 1, d.path || c.id
                FROM org_units c
                JOIN down d ON c.parent_id = d.id
                WHERE NOT c.id = ANY(d.path)
             ),
             up AS (
                SELECT id, parent_id, 0 AS depth, ARRAY[id] AS path
                FROM org_units WHERE id = ANY($1)
                UNION ALL
                SELECT p.id, p.parent_id, a.depth - 1, a.path || p.id
                FROM org_units p
                JOIN up a ON p.id = a.parent_id
                WHERE NOT p.id = ANY(a.path)
             ),
             graph AS (
                SELECT id, depth FROM down
                UNION ALL
                SELECT id, depth FROM up
             )
             SELECT {U_COLUMNS}, (ARRAY_AGG(g.depth ORDER BY ABS(g.depth)))[1] AS depth
             FROM graph g
             JOIN org_units u ON u.id = g.id
             GROUP BY u.id
             ORDER BY depth, u.id"
        );
        sqlx::query_as::<_, OrgUnitWithDepth>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Load every unit's `(id, parent_id, is_active)` into a forest.
    pub async fn load_forest<'e>(executor: impl PgExecutor<'e>) -> Result<OuForest, sqlx::Error> {
        let rows: Vec<(DbId, Option<DbId>, bool)> =
            sqlx::query_as("SELECT id, parent_id, is_active FROM org_units")
                .fetch_all(executor)
                .await?;
        Ok(OuForest::new(rows.into_iter().map(|(id, parent_id, is_active)| {
            OuNode {
                id,
                parent_id,
                is_active,
            }
        })))
    }

    /// Take the tree lock and load the forest.
    ///
    /// The lock is held until the transaction ends. Re-parenting,
    /// deactivation and moves of records into a unit validate against this
    /// snapshot, so two concurrent moves cannot commit a cycle.
    pub async fn lock_forest(tx: &mut Transaction<'_, Postgres>) -> Result<OuForest, sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(TREE_LOCK)
            .execute(&mut **tx)
            .await?;
        Self::load_forest(&mut **tx).await
    }

    /// Units reachable from an active root through active units only.
    pub async fn list_reachable(pool: &PgPool) -> Result<Vec<OrgUnit>, sqlx::Error> {
        let forest = Self::load_forest(pool).await?;
        let ids: Vec<DbId> = forest.reachable_ids().into_iter().collect();
        Self::find_many(pool, &ids).await
    }

    // -----------------------------------------------------------------------
    // Counters
    // -----------------------------------------------------------------------

    /// Active record counts grouped by unit, data type and signature.
    pub async fn data_tallies(pool: &PgPool) -> Result<Vec<DataTally>, sqlx::Error> {
        let rows: Vec<(DbId, String, bool, i64)> = sqlx::query_as(
            "SELECT org_unit_id,
                    data_type,
                    COALESCE((signed->>'is_signed')::boolean, false) AS is_signed,
                    COUNT(*) AS count
             FROM data_records
             WHERE is_active = true AND temp_inactive = false
             GROUP BY 1, 2, 3",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(org_unit_id, data_type, is_signed, count)| DataTally {
                org_unit_id,
                data_type,
                is_signed,
                count,
            })
            .collect())
    }

    /// Recompute and rewrite every unit's `data_counter`.
    ///
    /// All counters are replaced in one transaction. Returns the number of
    /// units written.
    pub async fn recount(pool: &PgPool) -> Result<usize, sqlx::Error> {
        let forest = Self::load_forest(pool).await?;
        let tallies = Self::data_tallies(pool).await?;
        let counters = compute_counters(&forest, &tallies);

        let mut tx = pool.begin().await?;
        for (id, counter) in &counters {
            sqlx::query("UPDATE org_units SET data_counter = $2 WHERE id = $1")
                .bind(id)
                .bind(Json(counter))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::debug!(units = counters.len(), "Rewrote org unit data counters");
        Ok(counters.len())
    }
}

/// Provides operations for unit types.
pub struct OrgUnitTypeRepo;

impl OrgUnitTypeRepo {
    pub async fn create(pool: &PgPool, name: &str) -> Result<OrgUnitType, sqlx::Error> {
        sqlx::query_as::<_, OrgUnitType>(
            "INSERT INTO org_unit_types (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name.trim())
        .fetch_one(pool)
        .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<OrgUnitType>, sqlx::Error> {
        sqlx::query_as::<_, OrgUnitType>(
            "SELECT id, name, created_at FROM org_unit_types ORDER BY name",
        )
        .fetch_all(pool)
        .await
    }
}
