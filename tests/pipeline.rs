use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime};
use futures_util::{stream, StreamExt};
use proptest::prelude::*;
use serde_json::{json, Value};

use job_funnel::diagnostics::DiagnosticLevel;
use job_funnel::error::{FetchError, ProviderUnavailable};
use job_funnel::job::{JobField, JobStatus, Locale, Remoteness, SearchRequest};
use job_funnel::scraper::{
    normalize, FieldPipeline, ProviderAdapter, RawRow, RowStream, SearchCapability, SearchParams,
};
use job_funnel::shutdown::{cancellation, CancelToken};
use job_funnel::worker::{EnrichmentExecutor, PageFetcher, ScrapeOrchestrator};

fn row(site: &str, id: usize, title: Option<&str>) -> Value {
    let description = if id % 2 == 0 {
        "Fully remote team."
    } else {
        "Office in Toronto."
    };
    let mut row = json!({
        "id": format!("{}", id),
        "site": site,
        "job_url": format!("https://example.com/{}/{}?utm_campaign=x", site, id),
        "company": "Acme",
        "location": "Toronto, ON",
        "date_posted": "2024-05-01T09:30:00",
        "description": description,
        "job_type": "fulltime",
    });
    if let Some(title) = title {
        row["title"] = json!(title);
    }
    row
}

/// In-memory search capability: fixed rows per site, some sites down, and
/// optionally one site that never finishes after its first rows
#[derive(Default)]
struct MemorySearch {
    rows: HashMap<String, Vec<Value>>,
    down: Vec<String>,
    stalls: Option<String>,
}

#[async_trait]
impl SearchCapability for MemorySearch {
    async fn search(&self, params: SearchParams) -> Result<RowStream, ProviderUnavailable> {
        if self.down.contains(&params.site) {
            return Err(ProviderUnavailable::new("503 from provider"));
        }
        let rows: Vec<Result<RawRow, ProviderUnavailable>> = self
            .rows
            .get(&params.site)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .take(params.results_wanted)
            .map(|row| Ok(RawRow::from(row)))
            .collect();
        if self.stalls.as_deref() == Some(params.site.as_str()) {
            return Ok(stream::iter(rows).chain(stream::pending()).boxed());
        }
        Ok(stream::iter(rows).boxed())
    }
}

struct EchoFetcher;

#[async_trait]
impl PageFetcher for EchoFetcher {
    async fn fetch(
        &self,
        url: &str,
        _headers: &[(&'static str, String)],
    ) -> Result<String, FetchError> {
        Ok(format!("<html>{}</html>", url))
    }
}

fn request() -> SearchRequest {
    SearchRequest::new(vec!["rust".to_string(), "engineer".to_string()], "ON")
}

fn adapters(search: MemorySearch) -> Vec<ProviderAdapter> {
    let search: Arc<dyn SearchCapability> = Arc::new(search);
    vec![
        ProviderAdapter::linkedin(Locale::CanadaEnglish, search.clone()),
        ProviderAdapter::zip_recruiter(Locale::CanadaEnglish, search),
    ]
}

#[tokio::test]
async fn one_malformed_row_among_ten_yields_nine_jobs() {
    let mut rows: Vec<Value> = (0..9).map(|i| row("linkedin", i, Some("Rust Engineer"))).collect();
    rows.insert(4, row("linkedin", 99, None));
    let search = MemorySearch {
        rows: HashMap::from([("linkedin".to_string(), rows)]),
        ..MemorySearch::default()
    };

    let report = ScrapeOrchestrator::new(4)
        .scrape_all(&request(), &adapters(search), &CancelToken::never())
        .await;

    assert_eq!(report.jobs.len(), 9);
    assert_eq!(report.count(DiagnosticLevel::Row), 1);
    let diagnostic = report
        .diagnostics
        .iter()
        .find(|d| d.level == DiagnosticLevel::Row)
        .unwrap();
    assert_eq!(diagnostic.provider, "linkedin");
    assert_eq!(diagnostic.context["row"]["id"], "99");
    assert!(report.complete);
}

#[tokio::test]
async fn unavailable_provider_does_not_affect_the_other() {
    let search = MemorySearch {
        rows: HashMap::from([(
            "zip_recruiter".to_string(),
            (0..5).map(|i| row("zip_recruiter", i, Some("Backend Engineer"))).collect(),
        )]),
        down: vec!["linkedin".to_string()],
        ..MemorySearch::default()
    };

    let report = ScrapeOrchestrator::new(2)
        .scrape_all(&request(), &adapters(search), &CancelToken::never())
        .await;

    assert_eq!(report.jobs.len(), 5);
    assert!(report.jobs.keys().all(|key| key.starts_with("zip_recruiter-")));
    assert_eq!(report.count(DiagnosticLevel::Provider), 1);
    assert_eq!(report.diagnostics[0].provider, "linkedin");
}

#[tokio::test]
async fn same_native_id_on_two_providers_does_not_collide() {
    let search = MemorySearch {
        rows: HashMap::from([
            ("linkedin".to_string(), vec![row("linkedin", 1, Some("A"))]),
            ("zip_recruiter".to_string(), vec![row("zip_recruiter", 1, Some("B"))]),
        ]),
        ..MemorySearch::default()
    };

    let report = ScrapeOrchestrator::new(2)
        .scrape_all(&request(), &adapters(search), &CancelToken::never())
        .await;

    assert_eq!(report.jobs.len(), 2);
    assert_eq!(report.jobs["linkedin-1"].title, "A");
    assert_eq!(report.jobs["zip_recruiter-1"].title, "B");
    assert!(report.jobs.values().all(|job| job.status == JobStatus::New));
}

#[tokio::test]
async fn full_pipeline_enriches_every_job_and_is_idempotent() {
    let search = MemorySearch {
        rows: HashMap::from([(
            "linkedin".to_string(),
            (0..4).map(|i| row("linkedin", i, Some("Rust Engineer"))).collect(),
        )]),
        ..MemorySearch::default()
    };
    let pipeline = FieldPipeline::default()
        .with_set_fields(vec![JobField::Url, JobField::Tags, JobField::Remoteness]);
    let adapters: Vec<ProviderAdapter> = adapters(search)
        .into_iter()
        .map(|adapter| adapter.with_pipeline(pipeline.clone()))
        .collect();
    let executor = EnrichmentExecutor::new(Arc::new(EchoFetcher), 2, Duration::from_secs(5));
    let cancel = CancelToken::never();

    let scraped = ScrapeOrchestrator::new(2).scrape_all(&request(), &adapters, &cancel).await;
    let enriched = executor.enrich(scraped, &adapters, &cancel).await;

    let remote = &enriched.jobs["linkedin-0"];
    assert_eq!(remote.url, "https://example.com/linkedin/0");
    assert_eq!(remote.remoteness, Remoteness::Remote);
    assert_eq!(remote.raw_content.as_deref(), Some("<html>https://example.com/linkedin/0</html>"));
    assert_eq!(enriched.jobs["linkedin-1"].remoteness, Remoteness::Unknown);
    assert!(enriched.diagnostics.is_empty());

    let first = enriched.jobs.clone();
    let again = executor.enrich(enriched, &adapters, &cancel).await;
    assert_eq!(again.jobs, first);
}

#[tokio::test]
async fn cancelling_mid_run_keeps_collected_jobs() {
    let search = MemorySearch {
        rows: HashMap::from([(
            "linkedin".to_string(),
            (0..3).map(|i| row("linkedin", i, Some("Rust Engineer"))).collect(),
        )]),
        stalls: Some("linkedin".to_string()),
        ..MemorySearch::default()
    };
    let adapters = adapters(search);
    let (handle, cancel) = cancellation();

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.cancel();
    });
    let report = ScrapeOrchestrator::new(2).scrape_all(&request(), &adapters, &cancel).await;
    stopper.await.unwrap();

    assert_eq!(report.jobs.len(), 3);
    assert!(!report.complete);
    assert_eq!(report.count(DiagnosticLevel::Run), 1);
}

proptest! {
    /// Whatever time of day a provider reports, only the calendar day survives
    #[test]
    fn post_date_is_always_midnight(millis in 0i64..4_102_444_800_000, as_text in any::<bool>()) {
        let posted = DateTime::from_timestamp_millis(millis).unwrap();
        let date_posted = if as_text {
            json!(posted.naive_utc().format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
        } else {
            json!(millis)
        };
        let mut value = row("linkedin", 1, Some("Rust Engineer"));
        value["date_posted"] = date_posted;

        let row = RawRow::from(value);
        let pipeline = FieldPipeline::default();
        let job = normalize(&row, "rust", Locale::CanadaEnglish, &pipeline).unwrap();

        prop_assert_eq!(job.post_date.time(), NaiveTime::MIN);
        prop_assert_eq!(job.post_date.date(), posted.date_naive());
        prop_assert_eq!(job.status, JobStatus::New);
    }
}
