//! Financial-data provider seam.
//!
//! The store and orchestrator only depend on [`DataProvider`]; the concrete
//! HTTP adapter lives in [`yahoo`].

use async_trait::async_trait;

use crate::error::TrackerError;
use crate::models::{FcfYears, TARGET_YEARS};

pub mod yahoo;

pub use yahoo::YahooProvider;

/// Per-ticker access to the external financial-data source.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Latest enterprise value, if the source publishes one.
    async fn enterprise_value(&self, ticker: &str) -> Result<Option<f64>, TrackerError>;

    /// Annual free cash flow for the tracked years, with the TTM fallback
    /// applied for the most recent year (see [`assemble_fcf_years`]).
    async fn free_cash_flow(&self, ticker: &str) -> Result<FcfYears, TrackerError>;
}

/// Build the per-year FCF set from raw provider figures.
///
/// `annual` holds `(fiscal_year, figure)` pairs from published annual
/// statements; years outside the tracked set are ignored. `recent_quarters`
/// holds quarterly figures, most recent first.
///
/// When the most recent tracked year has no annual figure, it is filled with
/// the trailing-twelve-month sum of the four most recent quarters, but only
/// if all four are present. Earlier years never use the fallback.
pub fn assemble_fcf_years(
    annual: &[(i32, Option<f64>)],
    recent_quarters: &[Option<f64>],
) -> FcfYears {
    let mut fcf = FcfYears::default();

    for &(year, value) in annual {
        if value.is_some() {
            fcf.set(year, value);
        }
    }

    let latest_year = TARGET_YEARS[0];
    if fcf.get(latest_year).is_none() {
        if let Some(ttm) = trailing_twelve_months(recent_quarters) {
            fcf.set(latest_year, Some(ttm));
        }
    }

    fcf
}

/// Sum of the four most recent quarterly figures, or `None` unless exactly
/// four are available.
fn trailing_twelve_months(recent_quarters: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = recent_quarters
        .iter()
        .take(4)
        .copied()
        .flatten()
        .collect();

    if present.len() == 4 {
        Some(present.iter().sum())
    } else {
        None
    }
}
