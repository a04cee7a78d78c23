pub mod dto;
pub mod models;

// Re-export commonly used types
pub use dto::{ScrapeReport, SearchRequest};
pub use models::{Job, JobField, JobStatus, Locale, Remoteness, Wage};
