use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ProviderUnavailable;
use crate::job::{Job, ScrapeReport, SearchRequest};
use crate::scraper::{normalize, ProviderAdapter};
use crate::shutdown::CancelToken;

/// What a provider task hands back to the orchestrator
enum Outcome {
    /// A normalized job and the index of the adapter that produced it
    Job(usize, Job),
    Diagnostic(Diagnostic),
}

/// Fans a search out to every adapter and assembles one `key_id -> Job` map
pub struct ScrapeOrchestrator {
    semaphore: Arc<Semaphore>,
}

impl ScrapeOrchestrator {
    /// `max_concurrent_searches` bounds how many providers are queried at once
    pub fn new(max_concurrent_searches: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent_searches.max(1))),
        }
    }

    /// Run the search on every adapter.
    ///
    /// # Failure isolation
    /// - An adapter that cannot search becomes a provider diagnostic
    /// - A row that cannot be normalized becomes a row diagnostic
    /// - Neither stops other rows or adapters
    ///
    /// # Concurrency Model
    /// - Each adapter runs in its own task once it holds a semaphore permit
    /// - Rows are normalized inside the adapter's task
    /// - Tasks send outcomes over a channel; only this function touches the map
    /// - Duplicate keys are last-write-wins
    ///
    /// Cancellation stops new dispatch and row consumption; whatever already
    /// arrived is returned with `complete = false`. The report records which
    /// adapter produced each job so enrichment uses that adapter's pipeline.
    pub async fn scrape_all(
        &self,
        request: &SearchRequest,
        adapters: &[ProviderAdapter],
        cancel: &CancelToken,
    ) -> ScrapeReport {
        let query = request.query();
        info!("Scraping '{}' from {} providers", query, adapters.len());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handles: Vec<(&'static str, JoinHandle<bool>)> = Vec::new();
        let mut interrupted = false;

        for (index, adapter) in adapters.iter().enumerate() {
            if cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            // Acquire semaphore permit before spawning task
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    interrupted = true;
                    break;
                }
                permit = self.semaphore.clone().acquire_owned() => permit,
            };
            let permit = match permit {
                Ok(permit) => permit,
                Err(e) => {
                    let site = adapter.site_identifier();
                    error!("Failed to acquire search permit for {}: {:?}", site, e);
                    let _ = tx.send(Outcome::Diagnostic(Diagnostic::provider(
                        site,
                        &ProviderUnavailable::new("search pool closed"),
                    )));
                    continue;
                }
            };

            let adapter = adapter.clone();
            let request = request.clone();
            let query = query.clone();
            let cancel = cancel.clone();
            let tx = tx.clone();
            let site = adapter.site_identifier();

            let handle = tokio::spawn(async move {
                let interrupted =
                    run_adapter(index, &adapter, &query, &request, &cancel, &tx).await;
                // Permit is released here
                drop(permit);
                interrupted
            });
            handles.push((site, handle));
        }
        drop(tx);

        let mut jobs: HashMap<String, Job> = HashMap::new();
        let mut sources: HashMap<String, usize> = HashMap::new();
        let mut diagnostics = Diagnostics::new();

        while let Some(outcome) = rx.recv().await {
            match outcome {
                Outcome::Job(index, job) => {
                    sources.insert(job.key_id.clone(), index);
                    if let Some(previous) = jobs.insert(job.key_id.clone(), job) {
                        debug!("Duplicate key {}, keeping the later row", previous.key_id);
                    }
                }
                Outcome::Diagnostic(diagnostic) => diagnostics.record(diagnostic),
            }
        }

        for (site, handle) in handles {
            match handle.await {
                Ok(cut_short) => interrupted |= cut_short,
                Err(e) => {
                    error!("Search task for {} failed: {:?}", site, e);
                    diagnostics.record(Diagnostic::provider(
                        site,
                        &ProviderUnavailable::new(format!("search task failed: {}", e)),
                    ));
                }
            }
        }

        if interrupted {
            diagnostics.record(Diagnostic::cancelled("search"));
        }

        let report = ScrapeReport {
            jobs,
            diagnostics: diagnostics.into_inner(),
            complete: !interrupted,
            sources,
        };
        info!("Scrape finished: {}", report.summary());
        report
    }
}

/// Search one provider and stream its rows through the normalizer.
/// Returns true when cancellation cut the search or its rows short.
async fn run_adapter(
    index: usize,
    adapter: &ProviderAdapter,
    query: &str,
    request: &SearchRequest,
    cancel: &CancelToken,
    tx: &mpsc::UnboundedSender<Outcome>,
) -> bool {
    let site = adapter.site_identifier();
    info!("Searching {} ({:?})", site, adapter.locale());

    let search = adapter.search(
        query,
        &request.region,
        request.radius,
        request.max_listing_days,
        request.results_wanted,
    );
    let mut rows = tokio::select! {
        biased;
        _ = cancel.cancelled() => return true,
        result = search => match result {
            Ok(rows) => rows,
            Err(e) => {
                let _ = tx.send(Outcome::Diagnostic(Diagnostic::provider(site, &e)));
                return false;
            }
        },
    };

    let mut accepted = 0usize;
    let mut interrupted = false;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                interrupted = true;
                break;
            }
            next = rows.next() => next,
        };

        let outcome = match next {
            None => break,
            Some(Ok(row)) => {
                match normalize(&row, query, adapter.locale(), adapter.pipeline()) {
                    Ok(job) => {
                        accepted += 1;
                        Outcome::Job(index, job)
                    }
                    Err(e) => Outcome::Diagnostic(Diagnostic::row(site, &row, &e)),
                }
            }
            Some(Err(e)) => {
                let _ = tx.send(Outcome::Diagnostic(Diagnostic::provider(site, &e)));
                break;
            }
        };

        if tx.send(outcome).is_err() {
            break;
        }
    }

    info!("{} produced {} jobs", site, accepted);
    interrupted
}
