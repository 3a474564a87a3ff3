//! Durable vacation-spot store: transactional Postgres upsert keyed by
//! (city, airport), plus an in-memory mirror for tests and dry runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use getaway_core::{SpotKey, VacationSpot};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

pub const CRATE_NAME: &str = "getaway-store";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Outcome of one merge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    /// Rows written (inserted or updated) inside the merge transaction.
    pub merged: u64,
    /// Duplicate-keyed source rows collapsed before the merge.
    pub deduplicated: u64,
}

/// Collapses duplicate (city, airport) rows, keeping the last occurrence.
/// Duplicate-keyed source rows are tolerated by policy; the resolution is
/// explicit last-write-wins rather than the engine picking an arbitrary row.
/// A multi-row `ON CONFLICT` upsert also may not touch the same key twice
/// in one statement, so the collapse has to happen before the merge.
pub fn dedup_last_wins(spots: Vec<VacationSpot>) -> Vec<VacationSpot> {
    let mut by_key: BTreeMap<SpotKey, VacationSpot> = BTreeMap::new();
    for spot in spots {
        by_key.insert(spot.key(), spot);
    }
    by_key.into_values().collect()
}

#[async_trait]
pub trait VacationSpotStore: Send + Sync {
    /// Upserts the harmonized rows: on key match all metric columns are
    /// replaced, otherwise a new row is inserted. Idempotent for unchanged
    /// input.
    async fn upsert_all(&self, spots: &[VacationSpot]) -> Result<UpsertSummary, StoreError>;

    /// All stored spots, ordered by (city, airport).
    async fn load_all(&self) -> Result<Vec<VacationSpot>, StoreError>;

    /// Deletes rows refreshed before the cutoff; returns the purged count.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

pub struct PgVacationSpotStore {
    pool: PgPool,
}

impl PgVacationSpotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl VacationSpotStore for PgVacationSpotStore {
    async fn upsert_all(&self, spots: &[VacationSpot]) -> Result<UpsertSummary, StoreError> {
        let input_rows = spots.len() as u64;
        let spots = dedup_last_wins(spots.to_vec());
        let mut summary = UpsertSummary {
            merged: 0,
            deduplicated: input_rows - spots.len() as u64,
        };

        let mut tx = self.pool.begin().await?;
        for spot in &spots {
            sqlx::query(
                r#"
                INSERT INTO vacation_spots (
                    city, airport,
                    co2_emissions_kg_per_person, punctual_pct,
                    avg_temperature_air_f, avg_relative_humidity_pct,
                    avg_cloud_cover_pct, precipitation_probability_pct,
                    aquarium_cnt, zoo_cnt, korean_restaurant_cnt,
                    refreshed_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ON CONFLICT (city, airport) DO UPDATE
                   SET co2_emissions_kg_per_person = excluded.co2_emissions_kg_per_person,
                       punctual_pct = excluded.punctual_pct,
                       avg_temperature_air_f = excluded.avg_temperature_air_f,
                       avg_relative_humidity_pct = excluded.avg_relative_humidity_pct,
                       avg_cloud_cover_pct = excluded.avg_cloud_cover_pct,
                       precipitation_probability_pct = excluded.precipitation_probability_pct,
                       aquarium_cnt = excluded.aquarium_cnt,
                       zoo_cnt = excluded.zoo_cnt,
                       korean_restaurant_cnt = excluded.korean_restaurant_cnt,
                       refreshed_at = excluded.refreshed_at
                "#,
            )
            .bind(&spot.city)
            .bind(&spot.airport)
            .bind(spot.co2_emissions_kg_per_person)
            .bind(spot.punctual_pct)
            .bind(spot.avg_temperature_air_f)
            .bind(spot.avg_relative_humidity_pct)
            .bind(spot.avg_cloud_cover_pct)
            .bind(spot.precipitation_probability_pct)
            .bind(spot.aquarium_cnt)
            .bind(spot.zoo_cnt)
            .bind(spot.korean_restaurant_cnt)
            .bind(spot.refreshed_at)
            .execute(&mut *tx)
            .await?;
            summary.merged += 1;
        }
        tx.commit().await?;

        info!(
            merged = summary.merged,
            deduplicated = summary.deduplicated,
            "merged harmonized rows into vacation_spots"
        );
        Ok(summary)
    }

    async fn load_all(&self) -> Result<Vec<VacationSpot>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT city, airport,
                   co2_emissions_kg_per_person, punctual_pct,
                   avg_temperature_air_f, avg_relative_humidity_pct,
                   avg_cloud_cover_pct, precipitation_probability_pct,
                   aquarium_cnt, zoo_cnt, korean_restaurant_cnt,
                   refreshed_at
              FROM vacation_spots
             ORDER BY city, airport
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(VacationSpot {
                city: row.try_get("city")?,
                airport: row.try_get("airport")?,
                co2_emissions_kg_per_person: row.try_get("co2_emissions_kg_per_person")?,
                punctual_pct: row.try_get("punctual_pct")?,
                avg_temperature_air_f: row.try_get("avg_temperature_air_f")?,
                avg_relative_humidity_pct: row.try_get("avg_relative_humidity_pct")?,
                avg_cloud_cover_pct: row.try_get("avg_cloud_cover_pct")?,
                precipitation_probability_pct: row.try_get("precipitation_probability_pct")?,
                aquarium_cnt: row.try_get("aquarium_cnt")?,
                zoo_cnt: row.try_get("zoo_cnt")?,
                korean_restaurant_cnt: row.try_get("korean_restaurant_cnt")?,
                refreshed_at: row.try_get("refreshed_at")?,
            });
        }
        Ok(out)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM vacation_spots
             WHERE refreshed_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM vacation_spots")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("cnt")?;
        Ok(count as u64)
    }
}

/// In-memory store with the same merge semantics as the Postgres
/// implementation. Backs tests and the CLI dry-run mode.
#[derive(Default)]
pub struct MemoryVacationSpotStore {
    spots: Mutex<BTreeMap<SpotKey, VacationSpot>>,
}

impl MemoryVacationSpotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VacationSpotStore for MemoryVacationSpotStore {
    async fn upsert_all(&self, spots: &[VacationSpot]) -> Result<UpsertSummary, StoreError> {
        let input_rows = spots.len() as u64;
        let deduped = dedup_last_wins(spots.to_vec());
        let mut summary = UpsertSummary {
            merged: 0,
            deduplicated: input_rows - deduped.len() as u64,
        };
        let mut stored = self.spots.lock().await;
        for spot in deduped {
            stored.insert(spot.key(), spot);
            summary.merged += 1;
        }
        Ok(summary)
    }

    async fn load_all(&self) -> Result<Vec<VacationSpot>, StoreError> {
        Ok(self.spots.lock().await.values().cloned().collect())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut stored = self.spots.lock().await;
        let before = stored.len();
        stored.retain(|_, spot| spot.refreshed_at >= cutoff);
        Ok((before - stored.len()) as u64)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.spots.lock().await.len() as u64)
    }
}
