use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::database::MetricsStore;
use crate::error::TrackerError;
use crate::models::{Company, FinancialRecord, RefreshReport};
use crate::provider::DataProvider;
use crate::resolver::TickerResolver;
use crate::utils::format_large_number;

/// Bulk and single-ticker ingestion of provider data into the store.
pub struct IngestionRunner {
    store: MetricsStore,
    resolver: TickerResolver,
    provider: Arc<dyn DataProvider>,
    delay: Duration,
}

impl IngestionRunner {
    /// `delay` is a fixed pause between consecutive provider calls; simple
    /// pacing, not a token bucket.
    pub fn new(
        store: MetricsStore,
        resolver: TickerResolver,
        provider: Arc<dyn DataProvider>,
        delay: Duration,
    ) -> Self {
        Self {
            store,
            resolver,
            provider,
            delay,
        }
    }

    pub fn resolver(&self) -> &TickerResolver {
        &self.resolver
    }

    /// Fetch EV and FCF for one company and upsert the full record.
    async fn ingest_company(&self, ticker: &str, company_name: &str) -> Result<(), TrackerError> {
        let enterprise_value = self.provider.enterprise_value(ticker).await?;
        let fcf = self.provider.free_cash_flow(ticker).await?;
        self.store
            .upsert(ticker, company_name, enterprise_value, fcf)
            .await
    }

    /// Ingest every directory company, optionally truncated to `limit`.
    ///
    /// Per-company failures are recorded and the run continues; the report
    /// carries the final success/error tally.
    pub async fn run(&self, limit: Option<usize>) -> Result<RefreshReport, TrackerError> {
        let mut companies: Vec<Company> = self.resolver.companies().to_vec();
        if let Some(limit) = limit {
            companies.truncate(limit);
        }

        let total = companies.len();
        info!("Starting ingestion of {} tickers", total);

        let mut report = RefreshReport::default();
        for (i, company) in companies.iter().enumerate() {
            info!(
                "[{}/{}] Processing {} ({})",
                i + 1,
                total,
                company.ticker,
                company.title
            );

            match self.ingest_company(&company.ticker, &company.title).await {
                Ok(()) => report.push_updated(&company.ticker),
                Err(e) => {
                    warn!("Error ingesting {}: {}", company.ticker, e);
                    report.push_failed(&company.ticker, e);
                }
            }

            if i + 1 < total {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(
            "Ingestion complete: {} success, {} errors",
            report.success_count(),
            report.error_count()
        );
        Ok(report)
    }

    /// Ingest or re-ingest a single resolved ticker, returning the stored
    /// record. The company name comes from the directory when the ticker is
    /// known there, otherwise the uppercased ticker stands in.
    pub async fn ingest_single(&self, input: &str) -> Result<FinancialRecord, TrackerError> {
        let ticker = self.resolver.resolve(input);
        let name = self
            .resolver
            .get_company(&ticker)
            .map(|c| c.title.clone())
            .unwrap_or_else(|| ticker.to_uppercase());

        info!("Ingesting {} ({})", ticker, name);
        self.ingest_company(&ticker, &name).await?;

        let record = self
            .store
            .get(&ticker)
            .await?
            .ok_or_else(|| TrackerError::NotFound(ticker.clone()))?;

        info!(
            "Ingested {}: EV {}, average FCF {}",
            record.ticker,
            format_large_number(record.enterprise_value),
            format_large_number(record.average_fcf)
        );
        Ok(record)
    }
}
