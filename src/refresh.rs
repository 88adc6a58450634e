use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{error, info, warn};

use crate::database::MetricsStore;
use crate::error::TrackerError;
use crate::models::{Config, RefreshReport, TARGET_YEARS};
use crate::provider::DataProvider;

/// Drives the two refresh batches against the provider and the store.
///
/// Both batches are best-effort: a per-ticker failure is recorded in the
/// report and the batch moves on. Neither rolls back partial progress; a
/// ticker that fails mid-update keeps its prior derived values until the
/// next successful refresh.
pub struct RefreshOrchestrator {
    store: MetricsStore,
    provider: Arc<dyn DataProvider>,
}

impl RefreshOrchestrator {
    pub fn new(store: MetricsStore, provider: Arc<dyn DataProvider>) -> Self {
        Self { store, provider }
    }

    /// Fetch a fresh enterprise value for every stored ticker and write it
    /// through the store. Tickers the provider has no EV for are skipped
    /// without touching the record.
    pub async fn refresh_enterprise_values(&self) -> Result<RefreshReport, TrackerError> {
        info!("Starting EV refresh");
        let records = self.store.get_all().await?;
        let mut report = RefreshReport::default();

        for record in records {
            match self.refresh_one_ev(&record.ticker).await {
                Ok(true) => report.push_updated(&record.ticker),
                Ok(false) => report.push_skipped(&record.ticker),
                Err(e) => {
                    warn!("Error updating EV for {}: {}", record.ticker, e);
                    report.push_failed(&record.ticker, e);
                }
            }
        }

        info!(
            "EV refresh complete: {} updated, {} errors",
            report.success_count(),
            report.error_count()
        );
        Ok(report)
    }

    async fn refresh_one_ev(&self, ticker: &str) -> Result<bool, TrackerError> {
        match self.provider.enterprise_value(ticker).await? {
            Some(ev) => {
                self.store.update_enterprise_value(ticker, Some(ev)).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Fetch the annual FCF set for every stored ticker and write each
    /// present year through the store.
    pub async fn refresh_fcf_values(&self) -> Result<RefreshReport, TrackerError> {
        info!("Starting FCF refresh");
        let records = self.store.get_all().await?;
        let mut report = RefreshReport::default();

        for record in records {
            match self.refresh_one_fcf(&record.ticker).await {
                Ok(()) => report.push_updated(&record.ticker),
                Err(e) => {
                    warn!("Error updating FCF for {}: {}", record.ticker, e);
                    report.push_failed(&record.ticker, e);
                }
            }
        }

        info!(
            "FCF refresh complete: {} updated, {} errors",
            report.success_count(),
            report.error_count()
        );
        Ok(report)
    }

    async fn refresh_one_fcf(&self, ticker: &str) -> Result<(), TrackerError> {
        let fcf = self.provider.free_cash_flow(ticker).await?;
        for year in TARGET_YEARS {
            if let Some(value) = fcf.get(year) {
                self.store.update_fcf(ticker, year, Some(value)).await?;
            }
        }
        Ok(())
    }
}

/// Owns the two background refresh tasks with an explicit start/stop
/// lifecycle; nothing is scheduled at module load.
///
/// Consecutive firings of the same job run on one task, so they cannot
/// overlap, but nothing prevents an operator from running a CLI refresh
/// concurrently with a scheduled one; there is no cross-process
/// single-flight guard.
pub struct RefreshScheduler {
    orchestrator: Arc<RefreshOrchestrator>,
    ev_interval: Duration,
    fcf_interval: Duration,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new(orchestrator: RefreshOrchestrator, config: &Config) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            orchestrator: Arc::new(orchestrator),
            ev_interval: config.ev_refresh_interval,
            fcf_interval: config.fcf_refresh_interval,
            shutdown,
            tasks: Vec::new(),
        }
    }

    /// Spawn both refresh loops. The first firing happens one full interval
    /// after start, not immediately.
    pub fn start(&mut self) {
        info!(
            "Scheduling EV refresh every {:?}, FCF refresh every {:?}",
            self.ev_interval, self.fcf_interval
        );

        let ev = self.orchestrator.clone();
        self.tasks.push(Self::spawn_loop(
            "EV refresh",
            self.ev_interval,
            self.shutdown.subscribe(),
            move || {
                let ev = ev.clone();
                async move { ev.refresh_enterprise_values().await.map(|_| ()) }
            },
        ));

        let fcf = self.orchestrator.clone();
        self.tasks.push(Self::spawn_loop(
            "FCF refresh",
            self.fcf_interval,
            self.shutdown.subscribe(),
            move || {
                let fcf = fcf.clone();
                async move { fcf.refresh_fcf_values().await.map(|_| ()) }
            },
        ));
    }

    fn spawn_loop<F, Fut>(
        name: &'static str,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
        job: F,
    ) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<(), TrackerError>> + Send,
    {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = job().await {
                            // Storage-level failure ends this batch only.
                            error!("{} batch failed: {}", name, e);
                        }
                    }
                    _ = shutdown.changed() => {
                        info!("{} task stopping", name);
                        break;
                    }
                }
            }
        })
    }

    /// Signal both loops to stop and wait for them to finish.
    pub async fn stop(&mut self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}
