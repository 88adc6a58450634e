use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fcf_tracker::database::MetricsStore;
use fcf_tracker::ingestion::IngestionRunner;
use fcf_tracker::models::Config;
use fcf_tracker::provider::{DataProvider, YahooProvider};
use fcf_tracker::refresh::{RefreshOrchestrator, RefreshScheduler};
use fcf_tracker::resolver::TickerResolver;
use fcf_tracker::utils::format_large_number;

#[derive(Parser)]
#[command(name = "fcf-tracker", about = "Track FCF yield for a stock universe")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest provider data for the whole directory, or one ticker
    Ingest {
        /// Ingest a single ticker or company name instead of the directory
        #[arg(long)]
        ticker: Option<String>,
        /// Limit the number of directory companies processed
        #[arg(long)]
        limit: Option<usize>,
        /// Delay between provider calls, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Look up one stored record by ticker or company name
    Lookup {
        /// Ticker or company name (e.g. NVDA, Apple)
        query: String,
    },
    /// Print the top records ranked by FCF yield
    Top {
        #[arg(long, default_value_t = 30)]
        limit: i64,
    },
    /// Run one enterprise-value refresh batch now
    RefreshEv,
    /// Run one FCF refresh batch now
    RefreshFcf,
    /// Run the scheduled refresh jobs until interrupted
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fcf_tracker=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let store = MetricsStore::new(&config.database_path).await?;
    let provider: Arc<dyn DataProvider> = Arc::new(YahooProvider::new(&config)?);

    match cli.command {
        Command::Ingest {
            ticker,
            limit,
            delay_ms,
        } => {
            let delay = delay_ms.map(Duration::from_millis).unwrap_or(config.ingest_delay);
            let resolver = TickerResolver::load(&config.company_tickers_path);
            let runner = IngestionRunner::new(store, resolver, provider, delay);

            match ticker {
                Some(ticker) => {
                    let record = runner.ingest_single(&ticker).await?;
                    println!("{}", record.display());
                }
                None => {
                    let report = runner.run(limit).await?;
                    println!("\nIngestion complete!");
                    println!("  Success: {}", report.success_count());
                    println!("  Errors: {}", report.error_count());
                }
            }
        }
        Command::Lookup { query } => {
            let resolver = TickerResolver::load(&config.company_tickers_path);
            let ticker = resolver.resolve(&query);
            if ticker != query.trim().to_uppercase() {
                println!("Resolved '{}' -> {}", query.trim(), ticker);
            }

            match store.get(&ticker).await? {
                Some(record) => println!("{}", record.display()),
                None => {
                    println!("\nTicker '{}' not found in database.", ticker);
                    println!("Run 'fcf-tracker ingest' to populate it.");
                }
            }
        }
        Command::Top { limit } => {
            let records = store.get_top_by_yield(limit).await?;
            let total = store.count().await?;

            println!("Top {} stocks by FCF yield", records.len());
            println!("Total stocks: {}, showing: {}", total, records.len());
            println!("Rendered at: {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
            println!("{:<5} {:<8} {:<32} {:>9} {:>12} {:>14}", "Rank", "Ticker", "Company", "Yield", "Avg FCF", "EV");
            for (rank, record) in records.iter().enumerate() {
                println!(
                    "{:<5} {:<8} {:<32} {:>9} {:>12} {:>14}",
                    rank + 1,
                    record.ticker,
                    record.company_name.chars().take(32).collect::<String>(),
                    record
                        .fcf_yield
                        .map(|y| format!("{:.3}", y))
                        .unwrap_or_else(|| "N/A".to_string()),
                    format_large_number(record.average_fcf),
                    format_large_number(record.enterprise_value),
                );
            }
        }
        Command::RefreshEv => {
            let orchestrator = RefreshOrchestrator::new(store, provider);
            let report = orchestrator.refresh_enterprise_values().await?;
            println!(
                "EV refresh complete: {} updated, {} errors",
                report.success_count(),
                report.error_count()
            );
        }
        Command::RefreshFcf => {
            let orchestrator = RefreshOrchestrator::new(store, provider);
            let report = orchestrator.refresh_fcf_values().await?;
            println!(
                "FCF refresh complete: {} updated, {} errors",
                report.success_count(),
                report.error_count()
            );
        }
        Command::Serve => {
            let orchestrator = RefreshOrchestrator::new(store, provider);
            let mut scheduler = RefreshScheduler::new(orchestrator, &config);
            scheduler.start();
            info!("Refresh jobs scheduled; press ctrl-c to stop");

            tokio::signal::ctrl_c().await?;
            scheduler.stop().await;
            info!("Shut down cleanly");
        }
    }

    Ok(())
}
