pub mod database;
pub mod error;
pub mod ingestion;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod refresh;
pub mod resolver;
pub mod utils;
