use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::format_large_number;

/// Fiscal years tracked for free cash flow, most recent first.
pub const TARGET_YEARS: [i32; 5] = [2025, 2024, 2023, 2022, 2021];

/// Annual free cash flow figures for the five tracked fiscal years.
///
/// A fixed struct instead of a year-keyed map so the supported year set is
/// enforced by the type, with year-number access validated at the boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FcfYears {
    pub fcf_2025: Option<f64>,
    pub fcf_2024: Option<f64>,
    pub fcf_2023: Option<f64>,
    pub fcf_2022: Option<f64>,
    pub fcf_2021: Option<f64>,
}

impl FcfYears {
    /// Whether `year` is one of the tracked fiscal years.
    pub fn supports(year: i32) -> bool {
        TARGET_YEARS.contains(&year)
    }

    /// Value for a tracked year. Returns `None` for untracked years as well
    /// as for tracked years with no figure; callers that must distinguish
    /// the two validate with [`FcfYears::supports`] first.
    pub fn get(&self, year: i32) -> Option<f64> {
        match year {
            2025 => self.fcf_2025,
            2024 => self.fcf_2024,
            2023 => self.fcf_2023,
            2022 => self.fcf_2022,
            2021 => self.fcf_2021,
            _ => None,
        }
    }

    /// Set the value for a tracked year. Returns `false` if `year` is
    /// outside the supported set, leaving the struct unchanged.
    pub fn set(&mut self, year: i32, value: Option<f64>) -> bool {
        let slot = match year {
            2025 => &mut self.fcf_2025,
            2024 => &mut self.fcf_2024,
            2023 => &mut self.fcf_2023,
            2022 => &mut self.fcf_2022,
            2021 => &mut self.fcf_2021,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// All values, most recent year first.
    pub fn values(&self) -> [Option<f64>; 5] {
        [
            self.fcf_2025,
            self.fcf_2024,
            self.fcf_2023,
            self.fcf_2022,
            self.fcf_2021,
        ]
    }

    /// Iterate `(year, value)` pairs, most recent year first.
    pub fn iter(&self) -> impl Iterator<Item = (i32, Option<f64>)> + '_ {
        TARGET_YEARS.into_iter().map(|year| (year, self.get(year)))
    }
}

/// One stored record per ticker. `average_fcf` and `fcf_yield` are derived
/// by the store on every mutation and are never set directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub ticker: String,
    pub company_name: String,
    pub enterprise_value: Option<f64>,
    pub fcf: FcfYears,
    pub average_fcf: Option<f64>,
    pub fcf_yield: Option<f64>,
    pub last_updated: String,
}

impl FinancialRecord {
    /// Formatted multi-line block for CLI display.
    pub fn display(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(50);
        out.push_str(&format!("\n{}\n", rule));
        out.push_str(&format!("  {} - {}\n", self.ticker, self.company_name));
        out.push_str(&format!("{}\n", rule));
        out.push_str(&format!(
            "  Enterprise Value: {}\n",
            format_large_number(self.enterprise_value)
        ));
        for (year, value) in self.fcf.iter() {
            out.push_str(&format!("  FCF {}: {}\n", year, format_large_number(value)));
        }
        out.push_str(&format!(
            "  Average FCF: {}\n",
            format_large_number(self.average_fcf)
        ));
        match self.fcf_yield {
            Some(y) => out.push_str(&format!("  FCF Yield: {:.3}\n", y)),
            None => out.push_str("  FCF Yield: N/A\n"),
        }
        out.push_str(&format!("  Last Updated: {}\n", self.last_updated));
        out
    }
}

/// One entry in the read-only company directory.
///
/// Not the source of truth for whether a [`FinancialRecord`] exists; only
/// used for name resolution and search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub ticker: String,
    pub title: String,
    pub cik: Option<u64>,
}

impl std::fmt::Display for Company {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.ticker, self.title)
    }
}

/// Outcome for one ticker within a refresh or ingestion batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// The record was written.
    Updated,
    /// The provider had nothing for this ticker; the record was left alone.
    Skipped,
    /// Provider or store failure for this ticker.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemResult {
    pub ticker: String,
    pub outcome: ItemOutcome,
}

/// Per-batch report: every ticker gets a typed result, so best-effort
/// continuation is explicit rather than an exception being swallowed.
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub items: Vec<ItemResult>,
}

impl RefreshReport {
    pub fn push_updated(&mut self, ticker: &str) {
        self.items.push(ItemResult {
            ticker: ticker.to_string(),
            outcome: ItemOutcome::Updated,
        });
    }

    pub fn push_skipped(&mut self, ticker: &str) {
        self.items.push(ItemResult {
            ticker: ticker.to_string(),
            outcome: ItemOutcome::Skipped,
        });
    }

    pub fn push_failed(&mut self, ticker: &str, error: impl ToString) {
        self.items.push(ItemResult {
            ticker: ticker.to_string(),
            outcome: ItemOutcome::Failed(error.to_string()),
        });
    }

    pub fn success_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.outcome == ItemOutcome::Updated)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, ItemOutcome::Failed(_)))
            .count()
    }
}

/// Configuration for the application.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub company_tickers_path: String,
    pub provider_base_url: String,
    pub provider_timeout_secs: u64,
    pub ingest_delay: Duration,
    pub ev_refresh_interval: Duration,
    pub fcf_refresh_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "stocks.db".to_string()),
            company_tickers_path: std::env::var("COMPANY_TICKERS_PATH")
                .unwrap_or_else(|_| "company_tickers.json".to_string()),
            provider_base_url: std::env::var("PROVIDER_BASE_URL")
                .unwrap_or_else(|_| "https://query1.finance.yahoo.com".to_string()),
            provider_timeout_secs: std::env::var("PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            ingest_delay: Duration::from_millis(
                std::env::var("INGEST_DELAY_MS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .unwrap_or(500),
            ),
            ev_refresh_interval: Duration::from_secs(
                std::env::var("EV_REFRESH_SECS")
                    .unwrap_or_else(|_| "86400".to_string()) // daily
                    .parse()
                    .unwrap_or(86_400),
            ),
            fcf_refresh_interval: Duration::from_secs(
                std::env::var("FCF_REFRESH_SECS")
                    .unwrap_or_else(|_| "5184000".to_string()) // ~2 months
                    .parse()
                    .unwrap_or(5_184_000),
            ),
        })
    }
}
