use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Matched links keyed by URL, valued by the anchor text that matched.
///
/// Keys behave as a set: a later write for the same URL replaces the earlier
/// one. Iteration order is sorted but carries no meaning.
pub type ScrapeResult = BTreeMap<String, String>;

/// A site that could not be scraped while the aggregator kept going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteFailure {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeReport {
    pub results: ScrapeResult,
    pub failures: Vec<SiteFailure>,
    pub sites_visited: usize,
}

impl ScrapeReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}
