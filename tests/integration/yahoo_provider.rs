//! HTTP provider adapter tests against a mocked quoteSummary endpoint.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fcf_tracker::error::TrackerError;
use fcf_tracker::models::Config;
use fcf_tracker::provider::{DataProvider, YahooProvider};

fn config_for(server: &MockServer) -> Config {
    Config {
        database_path: "unused.db".to_string(),
        company_tickers_path: "unused.json".to_string(),
        provider_base_url: server.uri(),
        provider_timeout_secs: 5,
        ingest_delay: Duration::ZERO,
        ev_refresh_interval: Duration::from_secs(60),
        fcf_refresh_interval: Duration::from_secs(60),
    }
}

fn statement(end_date: &str, fcf: Option<f64>) -> serde_json::Value {
    match fcf {
        Some(v) => json!({ "endDate": { "fmt": end_date }, "freeCashFlow": { "raw": v } }),
        None => json!({ "endDate": { "fmt": end_date } }),
    }
}

#[tokio::test]
async fn enterprise_value_is_read_from_key_statistics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/AAPL"))
        .and(query_param("modules", "defaultKeyStatistics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteSummary": {
                "result": [
                    { "defaultKeyStatistics": { "enterpriseValue": { "raw": 3.1e12 } } }
                ]
            }
        })))
        .mount(&server)
        .await;

    let provider = YahooProvider::new(&config_for(&server)).unwrap();
    let ev = provider.enterprise_value("AAPL").await.unwrap();
    assert_eq!(ev, Some(3.1e12));
}

#[tokio::test]
async fn missing_enterprise_value_is_none_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteSummary": { "result": [ { "defaultKeyStatistics": {} } ] }
        })))
        .mount(&server)
        .await;

    let provider = YahooProvider::new(&config_for(&server)).unwrap();
    assert_eq!(provider.enterprise_value("AAPL").await.unwrap(), None);
}

#[tokio::test]
async fn http_error_surfaces_as_provider_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let provider = YahooProvider::new(&config_for(&server)).unwrap();
    let err = provider.enterprise_value("AAPL").await.unwrap_err();
    assert!(matches!(err, TrackerError::Provider(_)));
}

#[tokio::test]
async fn fcf_maps_annual_statements_and_applies_ttm_for_latest_year() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/AAPL"))
        .and(query_param(
            "modules",
            "cashflowStatementHistory,cashflowStatementHistoryQuarterly",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteSummary": {
                "result": [{
                    "cashflowStatementHistory": {
                        "cashflowStatements": [
                            statement("2024-09-30", Some(400.0)),
                            statement("2023-09-30", Some(300.0)),
                            statement("2019-09-30", Some(50.0))
                        ]
                    },
                    "cashflowStatementHistoryQuarterly": {
                        "cashflowStatements": [
                            statement("2025-06-30", Some(110.0)),
                            statement("2025-03-31", Some(120.0)),
                            statement("2024-12-31", Some(130.0)),
                            statement("2024-09-30", Some(140.0))
                        ]
                    }
                }]
            }
        })))
        .mount(&server)
        .await;

    let provider = YahooProvider::new(&config_for(&server)).unwrap();
    let fcf = provider.free_cash_flow("AAPL").await.unwrap();

    assert_eq!(fcf.fcf_2024, Some(400.0));
    assert_eq!(fcf.fcf_2023, Some(300.0));
    // No 2025 annual figure: TTM over the four quarters.
    assert_eq!(fcf.fcf_2025, Some(500.0));
    // 2019 is outside the tracked years.
    assert_eq!(fcf.fcf_2022, None);
}

#[tokio::test]
async fn ttm_is_withheld_when_a_quarter_is_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteSummary": {
                "result": [{
                    "cashflowStatementHistory": { "cashflowStatements": [] },
                    "cashflowStatementHistoryQuarterly": {
                        "cashflowStatements": [
                            statement("2025-06-30", Some(110.0)),
                            statement("2025-03-31", None),
                            statement("2024-12-31", Some(130.0)),
                            statement("2024-09-30", Some(140.0))
                        ]
                    }
                }]
            }
        })))
        .mount(&server)
        .await;

    let provider = YahooProvider::new(&config_for(&server)).unwrap();
    let fcf = provider.free_cash_flow("AAPL").await.unwrap();
    assert_eq!(fcf.fcf_2025, None);
}

#[tokio::test]
async fn empty_result_set_yields_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteSummary": { "result": [] }
        })))
        .mount(&server)
        .await;

    let provider = YahooProvider::new(&config_for(&server)).unwrap();
    assert_eq!(provider.enterprise_value("AAPL").await.unwrap(), None);
    let fcf = provider.free_cash_flow("AAPL").await.unwrap();
    assert_eq!(fcf, fcf_tracker::models::FcfYears::default());
}
