//! Refresh orchestration: per-ticker isolation, skip semantics, idempotency.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use fcf_tracker::models::{FcfYears, ItemOutcome};
use fcf_tracker::refresh::RefreshOrchestrator;

use crate::common::database::fresh_store;
use crate::common::provider::FakeProvider;

#[tokio::test]
async fn ev_refresh_isolates_the_failing_ticker() {
    let (store, _dir) = fresh_store().await;

    let mut provider = FakeProvider::new();
    for i in 0..10 {
        let ticker = format!("TK{}", i);
        let fcf = FcfYears {
            fcf_2025: Some(100.0),
            ..Default::default()
        };
        store
            .upsert(&ticker, "Ticker Corp", Some(1_000.0), fcf)
            .await
            .unwrap();
        provider = provider.with_ev(&ticker, 50_000.0);
    }
    let provider = provider.failing_on("TK3");

    let orchestrator = RefreshOrchestrator::new(store.clone(), Arc::new(provider));
    let report = orchestrator.refresh_enterprise_values().await.unwrap();

    assert_eq!(report.success_count(), 9);
    assert_eq!(report.error_count(), 1);

    // The nine healthy tickers got the new EV; the failing one kept its
    // prior inputs and derived values.
    let healthy = store.get("TK0").await.unwrap().unwrap();
    assert_eq!(healthy.enterprise_value, Some(50_000.0));
    assert_eq!(healthy.fcf_yield, Some(0.002));

    let failed = store.get("TK3").await.unwrap().unwrap();
    assert_eq!(failed.enterprise_value, Some(1_000.0));
    assert_eq!(failed.fcf_yield, Some(0.1));
}

#[tokio::test]
async fn ev_refresh_skips_tickers_with_no_published_value() {
    let (store, _dir) = fresh_store().await;
    store
        .upsert(
            "AAPL",
            "Apple Inc.",
            Some(1_000.0),
            FcfYears {
                fcf_2025: Some(100.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Provider knows the ticker but has no EV for it.
    let provider = FakeProvider::new();
    let orchestrator = RefreshOrchestrator::new(store.clone(), Arc::new(provider));
    let report = orchestrator.refresh_enterprise_values().await.unwrap();

    assert_eq!(report.success_count(), 0);
    assert_eq!(report.error_count(), 0);
    assert_eq!(report.items[0].outcome, ItemOutcome::Skipped);

    let record = store.get("AAPL").await.unwrap().unwrap();
    assert_eq!(record.enterprise_value, Some(1_000.0));
}

#[tokio::test]
async fn fcf_refresh_writes_present_years_and_recomputes() {
    let (store, _dir) = fresh_store().await;
    store
        .upsert(
            "AAPL",
            "Apple Inc.",
            Some(100_000.0),
            FcfYears {
                fcf_2024: Some(100.0),
                fcf_2023: Some(100.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let fresh = FcfYears {
        fcf_2025: Some(600.0),
        fcf_2024: Some(400.0),
        ..Default::default()
    };
    let provider = FakeProvider::new().with_fcf("AAPL", fresh);
    let orchestrator = RefreshOrchestrator::new(store.clone(), Arc::new(provider));
    let report = orchestrator.refresh_fcf_values().await.unwrap();

    assert_eq!(report.success_count(), 1);

    let record = store.get("AAPL").await.unwrap().unwrap();
    // Years the provider had are replaced; years it lacked are kept.
    assert_eq!(record.fcf.fcf_2025, Some(600.0));
    assert_eq!(record.fcf.fcf_2024, Some(400.0));
    assert_eq!(record.fcf.fcf_2023, Some(100.0));
    // Average over the merged set: (600 + 400 + 100) / 3.
    assert_eq!(record.average_fcf, Some(1_100.0 / 3.0));
}

#[tokio::test]
async fn fcf_refresh_reruns_reproduce_the_same_state() {
    let (store, _dir) = fresh_store().await;
    store
        .upsert("AAPL", "Apple Inc.", Some(100_000.0), FcfYears::default())
        .await
        .unwrap();

    let fresh = FcfYears {
        fcf_2025: Some(500.0),
        fcf_2024: Some(300.0),
        ..Default::default()
    };
    let provider = Arc::new(FakeProvider::new().with_fcf("AAPL", fresh));
    let orchestrator = RefreshOrchestrator::new(store.clone(), provider);

    orchestrator.refresh_fcf_values().await.unwrap();
    let first = store.get("AAPL").await.unwrap().unwrap();

    orchestrator.refresh_fcf_values().await.unwrap();
    let second = store.get("AAPL").await.unwrap().unwrap();

    assert_eq!(first.fcf, second.fcf);
    assert_eq!(first.average_fcf, second.average_fcf);
    assert_eq!(first.fcf_yield, second.fcf_yield);
}

#[tokio::test]
async fn refresh_over_an_empty_store_is_a_no_op() {
    let (store, _dir) = fresh_store().await;
    let orchestrator = RefreshOrchestrator::new(store, Arc::new(FakeProvider::new()));

    let report = orchestrator.refresh_enterprise_values().await.unwrap();
    assert!(report.items.is_empty());

    let report = orchestrator.refresh_fcf_values().await.unwrap();
    assert!(report.items.is_empty());
}
