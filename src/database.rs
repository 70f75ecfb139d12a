// src/database.rs
//! PostgreSQL/PostGIS position store.

mod models;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::{
    config::DatabaseConfig,
    errors::MonitorError,
    models::{Mmsi, PositionReport},
    pagination::PageRequest,
    store::{AttributeMap, PositionStore, RowSet, SpatialFilter, EXCLUDED_MESSAGE_TYPES},
};
use self::models::{AttributeRow, PositionRow};

const COUNT_WITHIN: &str = "
    SELECT COUNT(*)
    FROM ais_positions
    WHERE ST_Within(loc, ST_GeomFromText($1, 4326))
      AND created_at BETWEEN $2 AND $3
      AND message_type <> ALL($4)";

const FIND_WITHIN: &str = "
    SELECT id, mmsi, created_at, ST_X(loc) AS lon, ST_Y(loc) AS lat,
           sog, cog, heading, rot, nav_status, message_type, ais_type
    FROM ais_positions
    WHERE ST_Within(loc, ST_GeomFromText($1, 4326))
      AND created_at BETWEEN $2 AND $3
      AND message_type <> ALL($4)
    ORDER BY created_at DESC, id DESC
    LIMIT $5 OFFSET $6";

const LIST_POSITIONS: &str = "
    SELECT id, mmsi, created_at, ST_X(loc) AS lon, ST_Y(loc) AS lat,
           sog, cog, heading, rot, nav_status, message_type, ais_type
    FROM ais_positions
    ORDER BY id
    LIMIT $1 OFFSET $2";

// Planner statistics; -1 before the table is first analyzed
const ESTIMATED_COUNT: &str = "
    SELECT GREATEST(reltuples, 0)::BIGINT
    FROM pg_class
    WHERE oid = 'ais_positions'::regclass";

const COUNT_LATEST: &str = "
    SELECT COUNT(DISTINCT mmsi)
    FROM ais_positions
    WHERE created_at BETWEEN $1 AND $2
      AND message_type <> ALL($3)";

const FIND_LATEST: &str = "
    WITH latest AS (
        SELECT DISTINCT ON (mmsi)
               id, mmsi, created_at, ST_X(loc) AS lon, ST_Y(loc) AS lat,
               sog, cog, heading, rot, nav_status, message_type, ais_type
        FROM ais_positions
        WHERE created_at BETWEEN $1 AND $2
          AND message_type <> ALL($3)
        ORDER BY mmsi, created_at DESC, id DESC
    )
    SELECT * FROM latest
    ORDER BY mmsi
    LIMIT $4 OFFSET $5";

const PRIMARY_ATTRIBUTES_TABLE: &str = "vessel_static";
const SECONDARY_ATTRIBUTES_TABLE: &str = "vessel_static_secondary";

fn attributes_query(table: &str) -> String {
    format!(
        "SELECT mmsi, imo::text AS imo, name, built::text AS built, flag, flag_name,
                vessel_type::text AS vessel_type, type_name,
                gross_tonnage::text AS gross_tonnage, deadweight::text AS deadweight,
                length_overall::text AS length_overall, beam::text AS beam,
                draught::text AS draught, class, class_code
         FROM {}
         WHERE mmsi = ANY($1)",
        table
    )
}

fn excluded_message_types() -> Vec<i16> {
    EXCLUDED_MESSAGE_TYPES.iter().map(|&t| t as i16).collect()
}

/// Convert rows into reports, skipping rows the ingester stored with an invalid MMSI
fn into_reports(rows: Vec<PositionRow>) -> Vec<PositionReport> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            match PositionReport::try_from(row) {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!("Skipping position row {}: {}", id, e);
                    None
                }
            }
        })
        .collect()
}

/// Read access to the position database
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Wrap an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool, running migrations if configured
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, MonitorError> {
        info!(
            "Connecting to database: max_connections={}, acquire_timeout={:?}",
            config.max_connections, config.acquire_timeout
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| MonitorError::StoreUnavailable(format!("connection failed: {}", e)))?;

        let database = Self::new(pool);
        if config.run_migrations {
            database.migrate().await?;
        }
        Ok(database)
    }

    pub async fn migrate(&self) -> Result<(), MonitorError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn attributes(&self, table: &str, mmsis: &[Mmsi]) -> Result<AttributeMap, MonitorError> {
        if mmsis.is_empty() {
            return Ok(AttributeMap::new());
        }
        let keys: Vec<i32> = mmsis.iter().map(Mmsi::as_db).collect();
        let sql = attributes_query(table);
        let rows: Vec<AttributeRow> = sqlx::query_as(&sql)
            .bind(&keys[..])
            .fetch_all(&self.pool)
            .await?;

        debug!("Found {} of {} vessels in {}", rows.len(), mmsis.len(), table);
        rows.into_iter().map(AttributeRow::into_record).collect()
    }
}

#[async_trait]
impl PositionStore for Database {
    async fn find_within(
        &self,
        filter: &SpatialFilter,
        page: PageRequest,
    ) -> Result<RowSet, MonitorError> {
        let wkt = filter.polygon.to_wkt();
        let excluded = excluded_message_types();
        // Returned to the pool on drop, on every exit path
        let mut conn = self.pool.acquire().await?;

        let total: i64 = sqlx::query_scalar(COUNT_WITHIN)
            .bind(&wkt)
            .bind(filter.start)
            .bind(filter.end)
            .bind(&excluded[..])
            .fetch_one(&mut *conn)
            .await?;

        let rows: Vec<PositionRow> = sqlx::query_as(FIND_WITHIN)
            .bind(&wkt)
            .bind(filter.start)
            .bind(filter.end)
            .bind(&excluded[..])
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&mut *conn)
            .await?;

        Ok(RowSet {
            rows: into_reports(rows),
            total: total.max(0) as u64,
        })
    }

    async fn list_positions(&self, page: PageRequest) -> Result<RowSet, MonitorError> {
        let mut conn = self.pool.acquire().await?;

        let total: i64 = sqlx::query_scalar(ESTIMATED_COUNT)
            .fetch_one(&mut *conn)
            .await?;

        let rows: Vec<PositionRow> = sqlx::query_as(LIST_POSITIONS)
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&mut *conn)
            .await?;

        Ok(RowSet {
            rows: into_reports(rows),
            total: total.max(0) as u64,
        })
    }

    async fn latest_per_vessel(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        page: PageRequest,
    ) -> Result<RowSet, MonitorError> {
        let excluded = excluded_message_types();
        let mut conn = self.pool.acquire().await?;

        let total: i64 = sqlx::query_scalar(COUNT_LATEST)
            .bind(since)
            .bind(until)
            .bind(&excluded[..])
            .fetch_one(&mut *conn)
            .await?;

        let rows: Vec<PositionRow> = sqlx::query_as(FIND_LATEST)
            .bind(since)
            .bind(until)
            .bind(&excluded[..])
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&mut *conn)
            .await?;

        Ok(RowSet {
            rows: into_reports(rows),
            total: total.max(0) as u64,
        })
    }

    async fn primary_attributes(&self, mmsis: &[Mmsi]) -> Result<AttributeMap, MonitorError> {
        self.attributes(PRIMARY_ATTRIBUTES_TABLE, mmsis).await
    }

    async fn secondary_attributes(&self, mmsis: &[Mmsi]) -> Result<AttributeMap, MonitorError> {
        self.attributes(SECONDARY_ATTRIBUTES_TABLE, mmsis).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_query_casts_numeric_columns() {
        let sql = attributes_query(PRIMARY_ATTRIBUTES_TABLE);
        assert!(sql.contains("FROM vessel_static\n"));
        assert!(sql.contains("imo::text AS imo"));
        assert!(sql.contains("mmsi = ANY($1)"));
    }

    fn row(id: i64, mmsi: i32) -> PositionRow {
        PositionRow {
            id,
            mmsi,
            created_at: Utc::now(),
            lon: 24.9,
            lat: 60.1,
            sog: None,
            cog: None,
            heading: None,
            rot: None,
            nav_status: None,
            message_type: 1,
            ais_type: None,
        }
    }

    #[test]
    fn rows_with_invalid_mmsi_are_skipped() {
        let reports = into_reports(vec![
            row(1, 230000001),
            row(2, 1_500_000_000),
            row(3, -5),
            row(4, 230000002),
        ]);

        let ids: Vec<i64> = reports.iter().map(|r| r.sequence).collect();
        assert_eq!(ids, vec![1, 4]);
        assert_eq!(reports[1].mmsi.value(), 230000002);
    }

    #[test]
    fn excluded_types_as_smallint() {
        assert_eq!(excluded_message_types(), vec![5i16, 24]);
    }
}
