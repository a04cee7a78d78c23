use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Lifecycle state of a job. Scraping only ever creates `New` jobs; the
/// other states belong to the tracking stages downstream.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    New,
    Archive,
    Applied,
    Interviewing,
    Accepted,
    Rejected,
    Delete,
}

/// Region and language a search was run for
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Locale {
    CanadaEnglish,
    CanadaFrench,
    UsaEnglish,
    UkEnglish,
}

impl Locale {
    /// Default `Accept-Language` header value for direct page retrieval
    pub fn accept_language(&self) -> &'static str {
        match self {
            Locale::CanadaEnglish => "en-GB,en-US;q=0.8,en;q=0.6",
            Locale::CanadaFrench => "fr-CA,fr;q=0.8,en-CA;q=0.6,en;q=0.4",
            Locale::UsaEnglish => "en-US,en;q=0.8",
            Locale::UkEnglish => "en-GB,en;q=0.8",
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "canada-english" => Ok(Locale::CanadaEnglish),
            "canada-french" => Ok(Locale::CanadaFrench),
            "usa-english" => Ok(Locale::UsaEnglish),
            "uk-english" => Ok(Locale::UkEnglish),
            other => Err(format!("unknown locale `{}`", other)),
        }
    }
}

/// Identifies one attribute of a [`Job`] in a field pipeline
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobField {
    Title,
    Company,
    Location,
    Description,
    Url,
    KeyId,
    PostDate,
    Tags,
    Wage,
    Remoteness,
    Raw,
}

impl JobField {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobField::Title => "TITLE",
            JobField::Company => "COMPANY",
            JobField::Location => "LOCATION",
            JobField::Description => "DESCRIPTION",
            JobField::Url => "URL",
            JobField::KeyId => "KEY_ID",
            JobField::PostDate => "POST_DATE",
            JobField::Tags => "TAGS",
            JobField::Wage => "WAGE",
            JobField::Remoteness => "REMOTENESS",
            JobField::Raw => "RAW",
        }
    }
}

impl fmt::Display for JobField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of the work can be done away from the office
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Remoteness {
    #[default]
    Unknown,
    InPerson,
    Hybrid,
    Remote,
}

/// Advertised pay range
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Wage {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub currency: Option<String>,
    /// Pay period as reported by the provider (`yearly`, `hourly`, ...)
    pub interval: Option<String>,
}

/// Canonical job record produced from one provider row
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Validate)]
pub struct Job {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "Company must not be empty"))]
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub provider: String,
    /// `provider-nativeId`, unique within a run
    #[validate(length(min = 3, message = "Key id must contain a provider and a native id"))]
    pub key_id: String,
    pub locale: Locale,
    pub query: String,
    pub status: JobStatus,
    /// Always midnight; providers disagree on time-of-day precision
    pub post_date: NaiveDateTime,
    pub tags: Vec<String>,
    pub wage: Option<Wage>,
    pub remoteness: Remoteness,
    pub raw_content: Option<String>,
}
