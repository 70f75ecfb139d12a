//! Store tests against a PostGIS database.
//!
//! Need `DATABASE_URL` pointing at a server with the PostGIS extension
//! available; run with `cargo test -- --ignored`.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use sqlx::PgPool;

use ais_monitor::{
    database::Database,
    geometry::Polygon,
    models::Mmsi,
    pagination::PageRequest,
    store::{PositionStore, SpatialFilter},
};

const SQUARE: &str = r#"[{"lat":0,"lng":0},{"lat":0,"lng":1},{"lat":1,"lng":1},{"lat":1,"lng":0}]"#;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

async fn insert_position(
    pool: &PgPool,
    mmsi: i32,
    created_at: DateTime<Utc>,
    lon: f64,
    lat: f64,
    message_type: i16,
) {
    sqlx::query(
        "INSERT INTO ais_positions (mmsi, created_at, loc, sog, nav_status, message_type)
         VALUES ($1, $2, ST_SetSRID(ST_MakePoint($3, $4), 4326), 10.5, 0, $5)",
    )
    .bind(mmsi)
    .bind(created_at)
    .bind(lon)
    .bind(lat)
    .bind(message_type)
    .execute(pool)
    .await
    .expect("Failed to insert position");
}

fn square_filter() -> SpatialFilter {
    SpatialFilter {
        polygon: Polygon::parse(SQUARE).unwrap(),
        start: base_time(),
        end: base_time() + TimeDelta::days(1),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_find_within(pool: PgPool) {
    let t = base_time();
    insert_position(&pool, 230000001, t + TimeDelta::hours(1), 0.5, 0.5, 1).await;
    insert_position(&pool, 230000002, t + TimeDelta::hours(2), 0.2, 0.8, 1).await;
    insert_position(&pool, 230000003, t + TimeDelta::hours(3), 0.9, 0.1, 1).await;
    // Outside the polygon
    insert_position(&pool, 230000004, t + TimeDelta::hours(4), 2.0, 2.0, 1).await;
    // Outside the time window
    insert_position(&pool, 230000005, t + TimeDelta::days(2), 0.5, 0.5, 1).await;
    // Static data message
    insert_position(&pool, 230000006, t + TimeDelta::hours(5), 0.5, 0.5, 5).await;

    let db = Database::new(pool);
    let result = db
        .find_within(&square_filter(), PageRequest::new(1, 2))
        .await
        .expect("Failed to query");

    assert_eq!(result.total, 3);
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0].mmsi.value(), 230000003);
    assert_eq!(result.rows[1].mmsi.value(), 230000002);
    assert_eq!(result.rows[0].location.lon, 0.9);
    assert_eq!(result.rows[0].speed_over_ground, Some(10.5));

    let result = db
        .find_within(&square_filter(), PageRequest::new(2, 2))
        .await
        .expect("Failed to query");
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].mmsi.value(), 230000001);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_latest_per_vessel(pool: PgPool) {
    let t = base_time();
    insert_position(&pool, 230000001, t + TimeDelta::minutes(1), 0.1, 0.1, 1).await;
    insert_position(&pool, 230000001, t + TimeDelta::minutes(5), 0.2, 0.2, 1).await;
    // Same timestamp, later ingestion wins
    insert_position(&pool, 230000002, t + TimeDelta::minutes(3), 0.3, 0.3, 18).await;
    insert_position(&pool, 230000002, t + TimeDelta::minutes(3), 0.4, 0.4, 18).await;
    insert_position(&pool, 230000003, t + TimeDelta::minutes(4), 0.5, 0.5, 24).await;

    let db = Database::new(pool);
    let result = db
        .latest_per_vessel(t, t + TimeDelta::minutes(15), PageRequest::first(10))
        .await
        .expect("Failed to query");

    assert_eq!(result.total, 2);
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0].mmsi.value(), 230000001);
    assert_eq!(result.rows[0].location.lon, 0.2);
    assert_eq!(result.rows[1].location.lon, 0.4);
    assert_eq!(result.rows[1].message_type, 18);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_list_positions(pool: PgPool) {
    let t = base_time();
    for i in 0..3 {
        insert_position(&pool, 230000001 + i, t, 0.5, 0.5, 1).await;
    }

    let db = Database::new(pool);
    let result = db
        .list_positions(PageRequest::new(1, 2))
        .await
        .expect("Failed to query");

    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0].mmsi.value(), 230000001);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_attributes(pool: PgPool) {
    sqlx::query(
        "INSERT INTO vessel_static (mmsi, imo, name, built, vessel_type, length_overall)
         VALUES (230000001, 9123456, 'TEST VESSEL', 2005, 70, 120.5)",
    )
    .execute(&pool)
    .await
    .expect("Failed to insert static data");
    sqlx::query(
        "INSERT INTO vessel_static_secondary (mmsi, name) VALUES (230000002, 'SECONDARY')",
    )
    .execute(&pool)
    .await
    .expect("Failed to insert static data");

    let db = Database::new(pool);
    let first = Mmsi::try_from(230000001u32).unwrap();
    let second = Mmsi::try_from(230000002u32).unwrap();

    let primary = db.primary_attributes(&[first, second]).await.unwrap();
    assert_eq!(primary.len(), 1);
    let record = &primary[&first];
    assert_eq!(record.name.as_deref(), Some("TEST VESSEL"));
    assert_eq!(record.imo.as_deref(), Some("9123456"));
    assert_eq!(record.vessel_type.as_deref(), Some("70"));
    assert_eq!(record.length_overall.as_deref(), Some("120.5"));
    assert!(record.flag.is_none());

    let secondary = db.secondary_attributes(&[first, second]).await.unwrap();
    assert_eq!(secondary.len(), 1);
    assert_eq!(secondary[&second].name.as_deref(), Some("SECONDARY"));

    assert!(db.primary_attributes(&[]).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_invalid_mmsi_row_is_skipped(pool: PgPool) {
    let t = base_time();
    insert_position(&pool, 230000001, t + TimeDelta::hours(1), 0.5, 0.5, 1).await;
    insert_position(&pool, 1_500_000_000, t + TimeDelta::hours(2), 0.5, 0.5, 1).await;

    let db = Database::new(pool);
    let result = db
        .find_within(&square_filter(), PageRequest::first(10))
        .await
        .expect("Failed to query");
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].mmsi.value(), 230000001);

    let latest = db
        .latest_per_vessel(t, t + TimeDelta::hours(3), PageRequest::first(10))
        .await
        .expect("Failed to query");
    assert_eq!(latest.rows.len(), 1);
}
