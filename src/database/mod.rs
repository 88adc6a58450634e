use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::TrackerError;
use crate::metrics::{compute_average, compute_yield};
use crate::models::{FcfYears, FinancialRecord, TARGET_YEARS};

/// SQLite-backed store for per-ticker financial records.
///
/// Every mutation recomputes `average_fcf` and `fcf_yield` from the merged
/// input state inside a single transaction, so there is no write path that
/// can desynchronize the derived columns. There is no cross-call locking:
/// two concurrent updates to the same ticker race with last-writer-wins on
/// the final commit.
#[derive(Clone)]
pub struct MetricsStore {
    pool: SqlitePool,
}

impl MetricsStore {
    /// Open (creating if missing) the database at `database_path` and ensure
    /// the schema exists.
    pub async fn new(database_path: &str) -> Result<Self, TrackerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(database_path)
                    .create_if_missing(true),
            )
            .await?;

        // WAL keeps concurrent readers unblocked during refresh writes.
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&pool)
            .await?;

        let store = Self { pool };
        store.create_schema().await?;
        info!("Database ready: {}", database_path);
        Ok(store)
    }

    /// Idempotent schema setup. Upgrades are additive: the derived columns
    /// are added to tables created before they existed, and the duplicate
    /// column error is ignored on databases that already have them.
    async fn create_schema(&self) -> Result<(), TrackerError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stock_financials (
                ticker TEXT PRIMARY KEY,
                company_name TEXT,
                enterprise_value REAL,
                fcf_2025 REAL,
                fcf_2024 REAL,
                fcf_2023 REAL,
                fcf_2022 REAL,
                fcf_2021 REAL,
                average_fcf REAL,
                fcf_yield REAL,
                last_updated TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for column in ["average_fcf", "fcf_yield"] {
            let alter = format!("ALTER TABLE stock_financials ADD COLUMN {} REAL", column);
            if let Err(e) = sqlx::query(&alter).execute(&self.pool).await {
                debug!("Skipping additive migration for {}: {}", column, e);
            }
        }

        Ok(())
    }

    /// Insert or replace the full record for a ticker, recomputing both
    /// derived fields. Idempotent for identical inputs (modulo the
    /// `last_updated` stamp).
    pub async fn upsert(
        &self,
        ticker: &str,
        company_name: &str,
        enterprise_value: Option<f64>,
        fcf: FcfYears,
    ) -> Result<(), TrackerError> {
        let ticker = ticker.trim().to_uppercase();
        let average_fcf = compute_average(&fcf.values());
        let fcf_yield = compute_yield(average_fcf, enterprise_value);

        sqlx::query(
            r#"
            INSERT INTO stock_financials
                (ticker, company_name, enterprise_value,
                 fcf_2025, fcf_2024, fcf_2023, fcf_2022, fcf_2021,
                 average_fcf, fcf_yield, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(ticker) DO UPDATE SET
                company_name = excluded.company_name,
                enterprise_value = excluded.enterprise_value,
                fcf_2025 = excluded.fcf_2025,
                fcf_2024 = excluded.fcf_2024,
                fcf_2023 = excluded.fcf_2023,
                fcf_2022 = excluded.fcf_2022,
                fcf_2021 = excluded.fcf_2021,
                average_fcf = excluded.average_fcf,
                fcf_yield = excluded.fcf_yield,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(&ticker)
        .bind(company_name)
        .bind(enterprise_value)
        .bind(fcf.fcf_2025)
        .bind(fcf.fcf_2024)
        .bind(fcf.fcf_2023)
        .bind(fcf.fcf_2022)
        .bind(fcf.fcf_2021)
        .bind(average_fcf)
        .bind(fcf_yield)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!("Upserted {}", ticker);
        Ok(())
    }

    /// Replace a single year's FCF figure and recompute both derived fields
    /// from the merged year set and the stored enterprise value.
    ///
    /// The read-recompute-write sequence runs in one transaction.
    pub async fn update_fcf(
        &self,
        ticker: &str,
        year: i32,
        value: Option<f64>,
    ) -> Result<(), TrackerError> {
        if !FcfYears::supports(year) {
            return Err(TrackerError::InvalidInput(format!(
                "year must be {}-{}, got {}",
                TARGET_YEARS[4], TARGET_YEARS[0], year
            )));
        }

        let ticker = ticker.trim().to_uppercase();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM stock_financials WHERE ticker = ?")
            .bind(&ticker)
            .fetch_optional(&mut *tx)
            .await?;
        let record = match row {
            Some(row) => record_from_row(&row),
            None => return Err(TrackerError::NotFound(ticker)),
        };

        let mut fcf = record.fcf;
        fcf.set(year, value);
        let average_fcf = compute_average(&fcf.values());
        let fcf_yield = compute_yield(average_fcf, record.enterprise_value);

        // Year validated above; the column name is safe to interpolate.
        let update = format!(
            "UPDATE stock_financials
             SET fcf_{} = ?, average_fcf = ?, fcf_yield = ?, last_updated = ?
             WHERE ticker = ?",
            year
        );
        sqlx::query(&update)
            .bind(value)
            .bind(average_fcf)
            .bind(fcf_yield)
            .bind(Utc::now().to_rfc3339())
            .bind(&ticker)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Replace the enterprise value and recompute the yield. The stored
    /// average is untouched since it does not depend on EV.
    pub async fn update_enterprise_value(
        &self,
        ticker: &str,
        value: Option<f64>,
    ) -> Result<(), TrackerError> {
        let ticker = ticker.trim().to_uppercase();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM stock_financials WHERE ticker = ?")
            .bind(&ticker)
            .fetch_optional(&mut *tx)
            .await?;
        let record = match row {
            Some(row) => record_from_row(&row),
            None => return Err(TrackerError::NotFound(ticker)),
        };

        let fcf_yield = compute_yield(record.average_fcf, value);

        sqlx::query(
            "UPDATE stock_financials
             SET enterprise_value = ?, fcf_yield = ?, last_updated = ?
             WHERE ticker = ?",
        )
        .bind(value)
        .bind(fcf_yield)
        .bind(Utc::now().to_rfc3339())
        .bind(&ticker)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Fetch one record by ticker.
    pub async fn get(&self, ticker: &str) -> Result<Option<FinancialRecord>, TrackerError> {
        let ticker = ticker.trim().to_uppercase();
        let row = sqlx::query("SELECT * FROM stock_financials WHERE ticker = ?")
            .bind(&ticker)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| record_from_row(&r)))
    }

    /// All records, ordered by ticker ascending.
    pub async fn get_all(&self) -> Result<Vec<FinancialRecord>, TrackerError> {
        let rows = sqlx::query("SELECT * FROM stock_financials ORDER BY ticker")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    /// Records with a non-null yield, best first, truncated to `limit`.
    pub async fn get_top_by_yield(&self, limit: i64) -> Result<Vec<FinancialRecord>, TrackerError> {
        let rows = sqlx::query(
            "SELECT * FROM stock_financials
             WHERE fcf_yield IS NOT NULL
             ORDER BY fcf_yield DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    /// Total number of stored records.
    pub async fn count(&self) -> Result<i64, TrackerError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_financials")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Delete one record. Returns whether a record existed.
    pub async fn delete(&self, ticker: &str) -> Result<bool, TrackerError> {
        let ticker = ticker.trim().to_uppercase();
        let result = sqlx::query("DELETE FROM stock_financials WHERE ticker = ?")
            .bind(&ticker)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove all records.
    pub async fn clear(&self) -> Result<(), TrackerError> {
        sqlx::query("DELETE FROM stock_financials")
            .execute(&self.pool)
            .await?;
        warn!("Cleared all stored records");
        Ok(())
    }
}

fn record_from_row(row: &SqliteRow) -> FinancialRecord {
    FinancialRecord {
        ticker: row.get::<String, _>("ticker"),
        company_name: row
            .get::<Option<String>, _>("company_name")
            .unwrap_or_default(),
        enterprise_value: row.get::<Option<f64>, _>("enterprise_value"),
        fcf: FcfYears {
            fcf_2025: row.get::<Option<f64>, _>("fcf_2025"),
            fcf_2024: row.get::<Option<f64>, _>("fcf_2024"),
            fcf_2023: row.get::<Option<f64>, _>("fcf_2023"),
            fcf_2022: row.get::<Option<f64>, _>("fcf_2022"),
            fcf_2021: row.get::<Option<f64>, _>("fcf_2021"),
        },
        average_fcf: row.get::<Option<f64>, _>("average_fcf"),
        fcf_yield: row.get::<Option<f64>, _>("fcf_yield"),
        last_updated: row
            .get::<Option<String>, _>("last_updated")
            .unwrap_or_default(),
    }
}
