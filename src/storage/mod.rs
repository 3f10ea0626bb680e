//! SQLite storage layer for raw cost records.

pub mod schema;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::forecast::{Observation, MAX_DAILY_COST};

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single billed line item, before per-day aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    #[serde(default = "default_service")]
    pub service: String,
    pub amount: f64,
    pub incurred_on: NaiveDate,
}

fn default_service() -> String {
    "unallocated".to_string()
}

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: impl AsRef<Path>) -> Result<Pool> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

/// Save a raw cost record.
pub fn save_cost_record(pool: &Pool, record: &CostRecord) -> Result<()> {
    if !record.amount.is_finite() || record.amount < 0.0 || record.amount > MAX_DAILY_COST {
        anyhow::bail!(
            "invalid cost amount {} for {} on {}",
            record.amount,
            record.service,
            record.incurred_on
        );
    }

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO cost_records (service, amount, incurred_on) VALUES (?1, ?2, ?3)",
        params![
            record.service,
            record.amount,
            record.incurred_on.format(DATE_FORMAT).to_string()
        ],
    )
    .context("failed to save cost record")?;

    Ok(())
}

/// Total cost per calendar day on or after `since`, oldest first.
pub fn daily_costs(pool: &Pool, since: NaiveDate) -> Result<Vec<Observation>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT incurred_on, SUM(amount) FROM cost_records
         WHERE incurred_on >= ?1
         GROUP BY incurred_on
         ORDER BY incurred_on ASC",
    )?;

    let rows = stmt.query_map(params![since.format(DATE_FORMAT).to_string()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
    })?;

    let mut observations = Vec::new();
    for r in rows {
        let (day, total) = r?;
        let date = NaiveDate::parse_from_str(&day, DATE_FORMAT)
            .with_context(|| format!("malformed date in cost_records: {}", day))?;
        observations.push(Observation::new(date, total));
    }

    Ok(observations)
}
