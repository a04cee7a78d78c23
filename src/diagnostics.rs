use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::error::{FieldComputationFailure, MalformedRow, ProviderUnavailable};
use crate::scraper::RawRow;

/// Scope a failure was isolated at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    Provider,
    Row,
    Field,
    /// Whole run, only used for cancellation
    Run,
}

/// Structured, non-fatal failure record
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub provider: String,
    pub reason: String,
    pub context: Value,
}

impl Diagnostic {
    pub fn provider(provider: &str, err: &ProviderUnavailable) -> Self {
        Self {
            level: DiagnosticLevel::Provider,
            provider: provider.to_string(),
            reason: err.to_string(),
            context: Value::Null,
        }
    }

    /// Keeps the offending row for post-mortem
    pub fn row(provider: &str, row: &RawRow, err: &MalformedRow) -> Self {
        Self {
            level: DiagnosticLevel::Row,
            provider: provider.to_string(),
            reason: err.to_string(),
            context: json!({ "row": row.as_value() }),
        }
    }

    pub fn field(provider: &str, key_id: &str, err: &FieldComputationFailure) -> Self {
        Self {
            level: DiagnosticLevel::Field,
            provider: provider.to_string(),
            reason: err.to_string(),
            context: json!({ "key_id": key_id, "field": err.field }),
        }
    }

    /// A job that no configured adapter claims, so it cannot be enriched
    pub fn unrouted(provider: &str, key_id: &str) -> Self {
        Self {
            level: DiagnosticLevel::Field,
            provider: provider.to_string(),
            reason: "no adapter configured for this job, enrichment skipped".to_string(),
            context: json!({ "key_id": key_id, "field": Value::Null }),
        }
    }

    pub fn cancelled(stage: &str) -> Self {
        Self {
            level: DiagnosticLevel::Run,
            provider: String::new(),
            reason: "cancelled".to_string(),
            context: json!({ "stage": stage }),
        }
    }
}

/// Collects diagnostics for a run and logs each one as it arrives
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        match diagnostic.level {
            DiagnosticLevel::Provider => error!(
                "Provider {} failed: {}",
                diagnostic.provider, diagnostic.reason
            ),
            DiagnosticLevel::Row => warn!(
                "Skipping malformed row from {}: {} (row: {})",
                diagnostic.provider, diagnostic.reason, diagnostic.context
            ),
            DiagnosticLevel::Field => warn!(
                "Field failure for {} job {}: {}",
                diagnostic.provider, diagnostic.context["key_id"], diagnostic.reason
            ),
            DiagnosticLevel::Run => warn!(
                "Run cancelled during {}, returning partial results",
                diagnostic.context["stage"]
            ),
        }
        self.records.push(diagnostic);
    }

    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.records
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(records: Vec<Diagnostic>) -> Self {
        Self { records }
    }
}
