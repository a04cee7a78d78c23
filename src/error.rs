use thiserror::Error;

use crate::job::JobField;

/// A provider could not produce results: network failure, authentication
/// failure, throttling or an unexpected response shape.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("provider unavailable: {reason}")]
pub struct ProviderUnavailable {
    pub reason: String,
}

impl ProviderUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// One raw row could not be turned into a [`crate::job::Job`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedRow {
    /// Row is not a JSON object
    #[error("row is not an object")]
    NotAnObject,

    /// A required column is absent or null
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A required column has a value of the wrong type or format
    #[error("field `{field}` has the wrong shape: {detail}")]
    WrongShape { field: &'static str, detail: String },

    /// The assembled job failed validation
    #[error("validation failed: {0}")]
    Invalid(String),
}

/// A set or delayed field could not be computed for one job.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("could not compute {field}: {reason}")]
pub struct FieldComputationFailure {
    pub field: JobField,
    pub reason: String,
}

impl FieldComputationFailure {
    pub fn new(field: JobField, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors raised by a [`crate::worker::PageFetcher`]
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("empty response body")]
    EmptyBody,
}

/// Startup configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got `{value}`")]
    InvalidNumber { name: &'static str, value: String },
}
