use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::FieldComputationFailure;
use crate::job::{Job, JobField, ScrapeReport};
use crate::scraper::fields::apply_set_field;
use crate::scraper::ProviderAdapter;
use crate::shutdown::CancelToken;
use super::fetcher::PageFetcher;

/// Values fetched for one job's delayed fields
type DelayedOutcome = Vec<(JobField, Result<String, FieldComputationFailure>)>;

/// Apply `fields` to one job in declared order. Every field is attempted;
/// failures are returned and the failed field keeps its default.
pub fn apply_set_fields(job: &mut Job, fields: &[JobField]) -> Vec<FieldComputationFailure> {
    fields
        .iter()
        .filter_map(|field| apply_set_field(job, *field).err())
        .collect()
}

/// Runs the set-field pass and then the delayed-field pass over a batch
pub struct EnrichmentExecutor {
    fetcher: Arc<dyn PageFetcher>,
    semaphore: Arc<Semaphore>,
    fetch_timeout: Duration,
}

impl EnrichmentExecutor {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        max_concurrent_fetches: usize,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            semaphore: Arc::new(Semaphore::new(max_concurrent_fetches.max(1))),
            fetch_timeout,
        }
    }

    /// Set fields for every job, then delayed fields. Each job uses the
    /// pipeline and headers of the adapter that produced it.
    pub async fn enrich(
        &self,
        report: ScrapeReport,
        adapters: &[ProviderAdapter],
        cancel: &CancelToken,
    ) -> ScrapeReport {
        let ScrapeReport {
            mut jobs,
            diagnostics,
            complete,
            sources,
        } = report;
        let mut diagnostics = Diagnostics::from(diagnostics);

        Self::set_pass(&mut jobs, &sources, adapters, &mut diagnostics);
        // A run cancelled during the search dispatches no fetches
        let complete = if complete {
            self.delayed_pass(&mut jobs, &sources, adapters, &mut diagnostics, cancel)
                .await
        } else {
            false
        };

        let report = ScrapeReport {
            jobs,
            diagnostics: diagnostics.into_inner(),
            complete,
            sources,
        };
        info!("Enrichment finished: {}", report.summary());
        report
    }

    /// Ordered, synchronous set-field pass. A job no adapter claims is
    /// reported and left as normalized.
    pub fn set_pass(
        jobs: &mut HashMap<String, Job>,
        sources: &HashMap<String, usize>,
        adapters: &[ProviderAdapter],
        diagnostics: &mut Diagnostics,
    ) {
        for job in jobs.values_mut() {
            let Some(adapter) = adapter_for(sources, adapters, job) else {
                diagnostics.record(Diagnostic::unrouted(&job.provider, &job.key_id));
                continue;
            };
            for failure in apply_set_fields(job, &adapter.pipeline().set_fields) {
                diagnostics.record(Diagnostic::field(&job.provider, &job.key_id, &failure));
            }
        }
    }

    /// Concurrent delayed-field pass. Returns false when cancelled before
    /// every job's fetch finished. Fetches that already completed are
    /// still applied; the rest keep their set-pass state.
    ///
    /// # Concurrency Model
    /// - A semaphore permit is acquired before each job's fetch task spawns
    /// - Each fetch is bounded by the per-item timeout
    /// - Tasks only return fetched values; jobs never leave this map
    pub async fn delayed_pass(
        &self,
        jobs: &mut HashMap<String, Job>,
        sources: &HashMap<String, usize>,
        adapters: &[ProviderAdapter],
        diagnostics: &mut Diagnostics,
        cancel: &CancelToken,
    ) -> bool {
        let mut handles: Vec<(String, JoinHandle<DelayedOutcome>)> = Vec::new();
        let mut cancelled = false;

        for job in jobs.values() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let Some(adapter) = adapter_for(sources, adapters, job) else {
                debug!("No adapter for {}, skipping delayed fields", job.key_id);
                continue;
            };
            let fields = adapter.pipeline().delayed_fields.clone();
            if fields.is_empty() {
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = self.semaphore.clone().acquire_owned() => permit,
            };
            let permit = match permit {
                Ok(permit) => permit,
                Err(e) => {
                    error!("Failed to acquire fetch permit for {}: {:?}", job.key_id, e);
                    continue;
                }
            };

            let fetcher = self.fetcher.clone();
            let fetch_timeout = self.fetch_timeout;
            let url = job.url.clone();
            let headers = adapter.headers();

            let handle = tokio::spawn(async move {
                let mut outcome = DelayedOutcome::new();
                for field in fields {
                    let value =
                        fetch_delayed_field(fetcher.as_ref(), field, &url, &headers, fetch_timeout)
                            .await;
                    outcome.push((field, value));
                }
                // Permit is released here
                drop(permit);
                outcome
            });
            handles.push((job.key_id.clone(), handle));
        }

        for (key_id, mut handle) in handles {
            if !cancelled {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => cancelled = true,
                    joined = &mut handle => {
                        apply_outcome(jobs, diagnostics, &key_id, joined);
                        continue;
                    }
                }
            }

            // Cancelled: keep finished fetches, stop the rest
            if handle.is_finished() {
                let joined = handle.await;
                apply_outcome(jobs, diagnostics, &key_id, joined);
            } else {
                handle.abort();
            }
        }

        if cancelled {
            diagnostics.record(Diagnostic::cancelled("delayed fields"));
        }
        !cancelled
    }
}

/// The adapter that produced `job`. Reports built without sources fall back
/// to the adapter with the job's site and locale.
fn adapter_for<'a>(
    sources: &HashMap<String, usize>,
    adapters: &'a [ProviderAdapter],
    job: &Job,
) -> Option<&'a ProviderAdapter> {
    match sources.get(&job.key_id) {
        Some(index) => adapters.get(*index),
        None => adapters.iter().find(|adapter| {
            adapter.site_identifier() == job.provider && adapter.locale() == job.locale
        }),
    }
}

fn apply_outcome(
    jobs: &mut HashMap<String, Job>,
    diagnostics: &mut Diagnostics,
    key_id: &str,
    joined: Result<DelayedOutcome, JoinError>,
) {
    let Some(job) = jobs.get_mut(key_id) else {
        return;
    };
    match joined {
        Ok(outcome) => {
            for (field, value) in outcome {
                if let Err(failure) = assign_delayed_field(job, field, value) {
                    diagnostics.record(Diagnostic::field(&job.provider, &job.key_id, &failure));
                }
            }
        }
        Err(e) => {
            error!("Fetch task for {} failed: {:?}", key_id, e);
            let failure =
                FieldComputationFailure::new(JobField::Raw, format!("fetch task failed: {}", e));
            diagnostics.record(Diagnostic::field(&job.provider, &job.key_id, &failure));
        }
    }
}

async fn fetch_delayed_field(
    fetcher: &dyn PageFetcher,
    field: JobField,
    url: &str,
    headers: &[(&'static str, String)],
    fetch_timeout: Duration,
) -> Result<String, FieldComputationFailure> {
    match field {
        JobField::Raw => {
            if url.is_empty() {
                return Err(FieldComputationFailure::new(field, "job has no url to fetch"));
            }
            match timeout(fetch_timeout, fetcher.fetch(url, headers)).await {
                Ok(Ok(body)) => Ok(body),
                Ok(Err(e)) => Err(FieldComputationFailure::new(field, e.to_string())),
                Err(_) => Err(FieldComputationFailure::new(
                    field,
                    format!("fetch timed out after {:?}", fetch_timeout),
                )),
            }
        }
        other => Err(FieldComputationFailure::new(other, "field has no delayed fetch")),
    }
}

/// Overwrites the target field; failures reset it to its default
fn assign_delayed_field(
    job: &mut Job,
    field: JobField,
    value: Result<String, FieldComputationFailure>,
) -> Result<(), FieldComputationFailure> {
    match field {
        JobField::Raw => {
            job.raw_content = value.as_ref().ok().cloned();
            value.map(|_| ())
        }
        _ => value.map(|_| ()),
    }
}
