pub mod enrichment;
pub mod fetcher;
pub mod orchestrator;

pub use enrichment::{apply_set_fields, EnrichmentExecutor};
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use orchestrator::ScrapeOrchestrator;
