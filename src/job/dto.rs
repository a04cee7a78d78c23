use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticLevel};
use super::models::Job;

/// Default number of results requested from each provider
pub const DEFAULT_RESULTS_WANTED: usize = 20;

/// A search to run against every configured provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchRequest {
    pub keywords: Vec<String>,
    /// Province or state
    pub region: String,
    pub radius: u32,
    pub max_listing_days: u32,
    pub results_wanted: usize,
}

impl SearchRequest {
    pub fn new(keywords: Vec<String>, region: impl Into<String>) -> Self {
        Self {
            keywords,
            region: region.into(),
            radius: 25,
            max_listing_days: 7,
            results_wanted: DEFAULT_RESULTS_WANTED,
        }
    }

    /// Keywords joined with single spaces
    pub fn query(&self) -> String {
        self.keywords.join(" ")
    }
}

/// Result of a scrape run: jobs keyed by `key_id` plus every failure that
/// was isolated along the way
#[derive(Debug, Default, Serialize)]
pub struct ScrapeReport {
    pub jobs: HashMap<String, Job>,
    pub diagnostics: Vec<Diagnostic>,
    /// False when cancellation cut the run short
    pub complete: bool,
    /// Index of the adapter each job came from, in the order the adapters
    /// were passed to the orchestrator
    #[serde(skip)]
    pub sources: HashMap<String, usize>,
}

impl ScrapeReport {
    pub fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }

    /// One line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} jobs, {} provider failures, {} malformed rows, {} field failures{}",
            self.jobs.len(),
            self.count(DiagnosticLevel::Provider),
            self.count(DiagnosticLevel::Row),
            self.count(DiagnosticLevel::Field),
            if self.complete { "" } else { " (incomplete)" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_joins_keywords_with_single_spaces() {
        let request = SearchRequest::new(
            vec!["rust".to_string(), "backend".to_string(), "engineer".to_string()],
            "ON",
        );
        assert_eq!(request.query(), "rust backend engineer");
    }

    #[test]
    fn summary_flags_incomplete_runs() {
        let report = ScrapeReport::default();
        assert!(report.summary().ends_with("(incomplete)"));
    }
}
