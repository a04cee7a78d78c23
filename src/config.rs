use std::env;
use std::time::Duration;

use rand::seq::SliceRandom;

use crate::error::ConfigError;
use crate::job::dto::DEFAULT_RESULTS_WANTED;
use crate::scraper::provider::DEFAULT_USER_AGENT;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Candidate User-Agent headers; one is picked per run
    pub user_agents: Vec<String>,

    /// Providers searched at the same time
    /// Default: 4
    pub max_concurrent_searches: usize,

    /// Listing pages fetched at the same time for delayed fields
    /// Default: 8
    pub max_concurrent_fetches: usize,

    /// Per-job timeout for delayed field fetches
    /// Default: 20 seconds
    pub fetch_timeout: Duration,

    /// Results requested from each provider
    /// Default: 20
    pub results_wanted: usize,

    /// Directory for rolling log files
    pub log_dir: String,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Optional environment variables:
    /// - USER_AGENT: comma separated list of User-Agent strings
    /// - MAX_CONCURRENT_SEARCHES (default: 4)
    /// - MAX_CONCURRENT_FETCHES (default: 8)
    /// - FETCH_TIMEOUT_SECS (default: 20)
    /// - RESULTS_WANTED (default: 20)
    /// - LOG_DIR (default: logs)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        Ok(Config {
            user_agents: parse_user_agents(env::var("USER_AGENT").ok()),
            max_concurrent_searches: parse_count(
                "MAX_CONCURRENT_SEARCHES",
                env::var("MAX_CONCURRENT_SEARCHES").ok(),
                4,
            )?,
            max_concurrent_fetches: parse_count(
                "MAX_CONCURRENT_FETCHES",
                env::var("MAX_CONCURRENT_FETCHES").ok(),
                8,
            )?,
            fetch_timeout: Duration::from_secs(
                parse_count("FETCH_TIMEOUT_SECS", env::var("FETCH_TIMEOUT_SECS").ok(), 20)? as u64,
            ),
            results_wanted: parse_count(
                "RESULTS_WANTED",
                env::var("RESULTS_WANTED").ok(),
                DEFAULT_RESULTS_WANTED,
            )?,
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }

    /// Random pick from the configured user agents
    pub fn user_agent(&self) -> String {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }
}

fn parse_user_agents(value: Option<String>) -> Vec<String> {
    let agents: Vec<String> = value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|agent| !agent.is_empty())
        .map(str::to_string)
        .collect();
    if agents.is_empty() {
        vec![DEFAULT_USER_AGENT.to_string()]
    } else {
        agents
    }
}

fn parse_count(
    name: &'static str,
    value: Option<String>,
    default: usize,
) -> Result<usize, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => match value.trim().parse::<usize>() {
            Ok(count) if count > 0 => Ok(count),
            _ => Err(ConfigError::InvalidNumber { name, value }),
        },
    }
}
