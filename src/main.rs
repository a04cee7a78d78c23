use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use job_funnel::config::Config;
use job_funnel::diagnostics::Diagnostics;
use job_funnel::job::{Locale, SearchRequest};
use job_funnel::scraper::{ProviderAdapter, SearchCapability, Site, SnapshotSearch};
use job_funnel::shutdown::{cancellation, ShutdownCoordinator};
use job_funnel::worker::{EnrichmentExecutor, HttpPageFetcher, ScrapeOrchestrator};

/// Scrape job listings from several providers into one normalized set
#[derive(Parser, Debug)]
#[command(name = "job-funnel", version)]
struct Cli {
    /// Search keywords, joined with spaces into the query
    #[arg(short, long = "keyword", required = true)]
    keywords: Vec<String>,

    /// Province or state to search in
    #[arg(short, long)]
    region: String,

    /// Search radius
    #[arg(long, default_value_t = 25)]
    radius: u32,

    /// Ignore listings older than this many days
    #[arg(long, default_value_t = 7)]
    max_listing_days: u32,

    /// Results requested per provider (overrides RESULTS_WANTED)
    #[arg(long)]
    results: Option<usize>,

    /// Providers to search; defaults to all
    #[arg(short, long = "provider")]
    providers: Vec<Site>,

    #[arg(long, default_value = "canada-english")]
    locale: Locale,

    /// Directory holding `<site>.json` result exports
    #[arg(long, default_value = "snapshots")]
    snapshot_dir: PathBuf,

    /// Cancel the run after this many seconds and keep partial results
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Skip fetching listing pages
    #[arg(long)]
    no_delayed: bool,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn init_logging(log_dir: &str) -> anyhow::Result<()> {
    // Create logs directory if it doesn't exist
    std::fs::create_dir_all(log_dir).context("Failed to create logs directory")?;

    // Log files will be created as: logs/info.log.2024-12-22, logs/error.log.2024-12-22, etc.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    let info_file = tracing_appender::rolling::daily(log_dir, "info.log");
    let warn_file = tracing_appender::rolling::daily(log_dir, "warn.log");
    let error_file = tracing_appender::rolling::daily(log_dir, "error.log");
    let debug_file = tracing_appender::rolling::daily(log_dir, "debug.log");

    let info_layer = tracing_subscriber::fmt::layer()
        .with_writer(info_file)
        .with_ansi(false)
        .with_filter(LevelFilter::INFO);

    let warn_layer = tracing_subscriber::fmt::layer()
        .with_writer(warn_file)
        .with_ansi(false)
        .with_filter(LevelFilter::WARN);

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_file)
        .with_ansi(false)
        .with_filter(LevelFilter::ERROR);

    let debug_layer = tracing_subscriber::fmt::layer()
        .with_writer(debug_file)
        .with_ansi(false)
        .with_filter(LevelFilter::DEBUG);

    // Console goes to stderr so stdout stays clean for the report
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(info_layer)
        .with(warn_layer)
        .with(error_layer)
        .with(debug_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    init_logging(&config.log_dir)?;

    let user_agent = config.user_agent();
    info!("Starting job-funnel");
    info!("Configuration loaded successfully:");
    info!("  - Max concurrent searches: {}", config.max_concurrent_searches);
    info!("  - Max concurrent fetches: {}", config.max_concurrent_fetches);
    info!("  - Fetch timeout: {:?}", config.fetch_timeout);
    info!("  - User agent: {}", user_agent);

    let request = SearchRequest {
        keywords: cli.keywords,
        region: cli.region,
        radius: cli.radius,
        max_listing_days: cli.max_listing_days,
        results_wanted: cli.results.unwrap_or(config.results_wanted),
    };

    let sites = if cli.providers.is_empty() {
        vec![Site::Linkedin, Site::ZipRecruiter]
    } else {
        cli.providers
    };
    let capability: Arc<dyn SearchCapability> = Arc::new(SnapshotSearch::new(cli.snapshot_dir));
    let adapters: Vec<ProviderAdapter> = sites
        .into_iter()
        .map(|site| {
            ProviderAdapter::new(site, cli.locale, capability.clone())
                .with_user_agent(user_agent.clone())
        })
        .collect();

    // Cancellation is driven by signals and the optional deadline
    let (handle, cancel) = cancellation();
    let coordinator = ShutdownCoordinator::new(handle, cli.timeout_secs.map(Duration::from_secs));
    let shutdown_task = tokio::spawn(coordinator.wait_for_shutdown());

    let report = ScrapeOrchestrator::new(config.max_concurrent_searches)
        .scrape_all(&request, &adapters, &cancel)
        .await;

    let fetcher = HttpPageFetcher::new(
        reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .context("Failed to build HTTP client")?,
    );
    let executor = EnrichmentExecutor::new(
        Arc::new(fetcher),
        config.max_concurrent_fetches,
        config.fetch_timeout,
    );

    let report = if cli.no_delayed {
        let mut report = report;
        let mut diagnostics = Diagnostics::from(report.diagnostics);
        EnrichmentExecutor::set_pass(
            &mut report.jobs,
            &report.sources,
            &adapters,
            &mut diagnostics,
        );
        report.diagnostics = diagnostics.into_inner();
        report
    } else {
        executor.enrich(report, &adapters, &cancel).await
    };
    shutdown_task.abort();

    info!("Run finished: {}", report.summary());

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    match cli.output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
