use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::ProviderUnavailable;
use crate::job::Locale;
use super::descriptor::FieldPipeline;
use super::row::RawRow;

/// User agent used when configuration doesn't supply one
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Lazy sequence of rows from one provider. An `Err` item means the provider
/// dropped out part way through; rows before it are still usable.
pub type RowStream = BoxStream<'static, Result<RawRow, ProviderUnavailable>>;

/// Listing providers reachable through the search capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    Linkedin,
    ZipRecruiter,
}

impl Site {
    /// Identifier the search capability selects the provider by
    pub fn identifier(&self) -> &'static str {
        match self {
            Site::Linkedin => "linkedin",
            Site::ZipRecruiter => "zip_recruiter",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for Site {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "linkedin" => Ok(Site::Linkedin),
            "zip_recruiter" | "ziprecruiter" => Ok(Site::ZipRecruiter),
            other => Err(format!("unknown provider `{}`", other)),
        }
    }
}

/// Parameters handed to the search capability for one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchParams {
    pub site: String,
    pub query: String,
    pub region: String,
    pub radius: u32,
    pub hours_old: u32,
    pub results_wanted: usize,
    /// Ask for full descriptions where the provider makes that a separate call
    pub fetch_description: bool,
}

/// External search capability: produces raw rows for a provider.
#[async_trait]
pub trait SearchCapability: Send + Sync {
    async fn search(&self, params: SearchParams) -> Result<RowStream, ProviderUnavailable>;
}

/// A provider composed of its site, a locale policy and the shared search
/// capability. Regional variants are the same adapter with another locale.
#[derive(Clone)]
pub struct ProviderAdapter {
    site: Site,
    locale: Locale,
    pipeline: FieldPipeline,
    user_agent: String,
    capability: Arc<dyn SearchCapability>,
}

impl ProviderAdapter {
    pub fn new(site: Site, locale: Locale, capability: Arc<dyn SearchCapability>) -> Self {
        Self {
            site,
            locale,
            pipeline: FieldPipeline::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            capability,
        }
    }

    pub fn linkedin(locale: Locale, capability: Arc<dyn SearchCapability>) -> Self {
        Self::new(Site::Linkedin, locale, capability)
    }

    pub fn zip_recruiter(locale: Locale, capability: Arc<dyn SearchCapability>) -> Self {
        Self::new(Site::ZipRecruiter, locale, capability)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_pipeline(mut self, pipeline: FieldPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn site_identifier(&self) -> &'static str {
        self.site.identifier()
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn pipeline(&self) -> &FieldPipeline {
        &self.pipeline
    }

    /// Headers for direct retrieval of listing pages
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                    .to_string(),
            ),
            ("accept-encoding", "gzip, deflate, sdch".to_string()),
            ("accept-language", self.locale.accept_language().to_string()),
            ("upgrade-insecure-requests", "1".to_string()),
            ("user-agent", self.user_agent.clone()),
            ("cache-control", "no-cache".to_string()),
            ("connection", "keep-alive".to_string()),
        ]
    }

    pub async fn search(
        &self,
        query: &str,
        region: &str,
        radius: u32,
        max_age_days: u32,
        result_cap: usize,
    ) -> Result<RowStream, ProviderUnavailable> {
        let params = SearchParams {
            site: self.site_identifier().to_string(),
            query: query.to_string(),
            region: region.to_string(),
            radius,
            hours_old: max_age_days.saturating_mul(24),
            results_wanted: result_cap,
            fetch_description: true,
        };
        self.capability.search(params).await
    }
}

impl fmt::Debug for ProviderAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderAdapter")
            .field("site", &self.site)
            .field("locale", &self.locale)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}
