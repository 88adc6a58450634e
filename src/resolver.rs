use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

use crate::models::Company;

#[derive(Debug, Deserialize)]
struct DirectoryEntry {
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    title: String,
    cik_str: Option<u64>,
}

/// Resolves free-form user input (ticker or partial company name) to a
/// ticker symbol, backed by a company directory loaded once at construction.
///
/// Resolution is total: unknown input falls back to the uppercased input,
/// treated as an unverified ticker guess.
pub struct TickerResolver {
    companies: Vec<Company>,
    ticker_index: HashMap<String, usize>,
}

impl TickerResolver {
    /// Load the directory from a SEC-style `company_tickers.json` file: an
    /// object keyed by ascending numeric index, each value carrying
    /// `ticker`, `title` and `cik_str`.
    ///
    /// A missing or malformed file degrades to an empty directory; the
    /// resolver still works, with no partial-match capability.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let companies = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<u64, DirectoryEntry>>(&content) {
                Ok(entries) => entries
                    .into_values()
                    .map(|e| Company {
                        ticker: e.ticker,
                        title: e.title,
                        cik: e.cik_str,
                    })
                    .collect(),
                Err(e) => {
                    warn!("Could not parse company directory {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("Could not read company directory {}: {}", path.display(), e);
                Vec::new()
            }
        };

        info!("Loaded {} companies from {}", companies.len(), path.display());
        Self::from_companies(companies)
    }

    /// Build a resolver over an already-loaded company list, preserving its
    /// order for partial-name matching.
    pub fn from_companies(companies: Vec<Company>) -> Self {
        let mut ticker_index = HashMap::with_capacity(companies.len());
        for (i, company) in companies.iter().enumerate() {
            // Duplicate tickers keep the last entry, like the exact-match
            // index the directory file implies.
            ticker_index.insert(company.ticker.to_uppercase(), i);
        }
        Self {
            companies,
            ticker_index,
        }
    }

    /// Resolve user input to a ticker symbol.
    ///
    /// 1. Exact ticker match, case-insensitive.
    /// 2. First directory entry (original load order) whose title contains
    ///    the input as a case-insensitive substring. First match wins; there
    ///    is deliberately no ranking by match quality, for compatibility
    ///    with the established behavior.
    /// 3. Fallback: the uppercased input unchanged.
    pub fn resolve(&self, user_input: &str) -> String {
        let user_input = user_input.trim();
        let input_upper = user_input.to_uppercase();
        let input_lower = user_input.to_lowercase();

        if let Some(&i) = self.ticker_index.get(&input_upper) {
            return self.companies[i].ticker.clone();
        }

        for company in &self.companies {
            if company.title.to_lowercase().contains(&input_lower) {
                return company.ticker.clone();
            }
        }

        input_upper
    }

    /// Directory entry for an exact ticker, case-insensitive.
    pub fn get_company(&self, ticker: &str) -> Option<&Company> {
        self.ticker_index
            .get(&ticker.trim().to_uppercase())
            .map(|&i| &self.companies[i])
    }

    /// First `limit` companies, in load order, whose ticker or title
    /// contains the query as a case-insensitive substring.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Company> {
        let query_lower = query.to_lowercase();
        let mut results = Vec::new();

        for company in &self.companies {
            if company.ticker.to_lowercase().contains(&query_lower)
                || company.title.to_lowercase().contains(&query_lower)
            {
                results.push(company);
                if results.len() >= limit {
                    break;
                }
            }
        }

        results
    }

    /// All companies in load order.
    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}
