use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::TrackerError;
use crate::models::{Config, FcfYears};

use super::{assemble_fcf_years, DataProvider};

/// Yahoo-style quoteSummary provider adapter.
///
/// Fetches enterprise value from the `defaultKeyStatistics` module and the
/// annual/quarterly cash flow statements for the FCF figures. Missing fields
/// degrade to `None`/empty; only transport and non-success responses are
/// surfaced as provider failures.
pub struct YahooProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSummaryResult {
    #[serde(rename = "defaultKeyStatistics")]
    default_key_statistics: Option<KeyStatistics>,
    #[serde(rename = "cashflowStatementHistory")]
    cashflow_history: Option<CashflowHistory>,
    #[serde(rename = "cashflowStatementHistoryQuarterly")]
    cashflow_history_quarterly: Option<CashflowHistory>,
}

#[derive(Debug, Deserialize)]
struct KeyStatistics {
    #[serde(rename = "enterpriseValue")]
    enterprise_value: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct CashflowHistory {
    #[serde(rename = "cashflowStatements", default)]
    statements: Vec<CashflowStatement>,
}

#[derive(Debug, Deserialize)]
struct CashflowStatement {
    #[serde(rename = "endDate")]
    end_date: Option<DateValue>,
    #[serde(rename = "freeCashFlow")]
    free_cash_flow: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DateValue {
    fmt: Option<String>,
}

impl YahooProvider {
    /// Create a provider client with an explicit request timeout. Calls with
    /// no response within the timeout fail as `Provider` errors instead of
    /// hanging a refresh batch.
    pub fn new(config: &Config) -> Result<Self, TrackerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.provider_timeout_secs))
            .user_agent("fcf-tracker/1.0")
            .build()?;

        Ok(Self {
            client,
            base_url: config.provider_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn quote_summary(
        &self,
        ticker: &str,
        modules: &str,
    ) -> Result<QuoteSummaryResult, TrackerError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, ticker);
        let response = self
            .client
            .get(&url)
            .query(&[("modules", modules)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::Provider(format!(
                "quoteSummary for {} returned HTTP {}",
                ticker, status
            )));
        }

        let payload: QuoteSummaryResponse = response.json().await?;
        debug!("Fetched {} for {}", modules, ticker);

        Ok(payload
            .quote_summary
            .result
            .and_then(|mut results| {
                if results.is_empty() {
                    None
                } else {
                    Some(results.remove(0))
                }
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl DataProvider for YahooProvider {
    async fn enterprise_value(&self, ticker: &str) -> Result<Option<f64>, TrackerError> {
        let result = self.quote_summary(ticker, "defaultKeyStatistics").await?;
        Ok(result
            .default_key_statistics
            .and_then(|stats| stats.enterprise_value)
            .and_then(|value| value.raw))
    }

    async fn free_cash_flow(&self, ticker: &str) -> Result<FcfYears, TrackerError> {
        let result = self
            .quote_summary(
                ticker,
                "cashflowStatementHistory,cashflowStatementHistoryQuarterly",
            )
            .await?;

        let annual: Vec<(i32, Option<f64>)> = result
            .cashflow_history
            .map(|h| h.statements)
            .unwrap_or_default()
            .iter()
            .filter_map(|s| fiscal_year(s).map(|year| (year, figure(s))))
            .collect();

        // Statements arrive most recent first.
        let quarters: Vec<Option<f64>> = result
            .cashflow_history_quarterly
            .map(|h| h.statements)
            .unwrap_or_default()
            .iter()
            .map(figure)
            .collect();

        Ok(assemble_fcf_years(&annual, &quarters))
    }
}

fn fiscal_year(statement: &CashflowStatement) -> Option<i32> {
    statement
        .end_date
        .as_ref()
        .and_then(|d| d.fmt.as_deref())
        .and_then(|fmt| fmt.get(..4))
        .and_then(|year| year.parse().ok())
}

fn figure(statement: &CashflowStatement) -> Option<f64> {
    statement
        .free_cash_flow
        .as_ref()
        .and_then(|value| value.raw)
        .filter(|v| v.is_finite())
}
