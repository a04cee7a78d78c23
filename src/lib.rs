//! Scrape-and-normalize pipeline for job listings.
//!
//! A [`job::SearchRequest`] is fanned out to every configured
//! [`scraper::ProviderAdapter`] by the [`worker::ScrapeOrchestrator`], rows are
//! normalized into [`job::Job`]s, and the [`worker::EnrichmentExecutor`] fills
//! in ordered set fields and fetched delayed fields. Failures are isolated
//! per provider, row and field and reported as [`diagnostics::Diagnostic`]s.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod job;
pub mod scraper;
pub mod shutdown;
pub mod worker;
