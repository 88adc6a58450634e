//! In-memory provider double for refresh and ingestion tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use fcf_tracker::error::TrackerError;
use fcf_tracker::models::FcfYears;
use fcf_tracker::provider::DataProvider;

#[derive(Default)]
pub struct FakeProvider {
    evs: HashMap<String, f64>,
    fcfs: HashMap<String, FcfYears>,
    failing: HashSet<String>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ev(mut self, ticker: &str, ev: f64) -> Self {
        self.evs.insert(ticker.to_string(), ev);
        self
    }

    pub fn with_fcf(mut self, ticker: &str, fcf: FcfYears) -> Self {
        self.fcfs.insert(ticker.to_string(), fcf);
        self
    }

    /// Every call for this ticker fails with a provider error.
    pub fn failing_on(mut self, ticker: &str) -> Self {
        self.failing.insert(ticker.to_string());
        self
    }

    fn check(&self, ticker: &str) -> Result<(), TrackerError> {
        if self.failing.contains(ticker) {
            Err(TrackerError::Provider(format!(
                "simulated outage for {}",
                ticker
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DataProvider for FakeProvider {
    async fn enterprise_value(&self, ticker: &str) -> Result<Option<f64>, TrackerError> {
        self.check(ticker)?;
        Ok(self.evs.get(ticker).copied())
    }

    async fn free_cash_flow(&self, ticker: &str) -> Result<FcfYears, TrackerError> {
        self.check(ticker)?;
        Ok(self.fcfs.get(ticker).copied().unwrap_or_default())
    }
}
