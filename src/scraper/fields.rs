//! Set-field computations. Each one reads the job as it stands and assigns
//! one attribute, so the order a pipeline declares them in matters.

use url::Url;

use crate::error::FieldComputationFailure;
use crate::job::{Job, JobField, Remoteness};

/// Query parameters that only track where a click came from
const TRACKING_PARAMS: [&str; 3] = ["refid", "trackingid", "trk"];

/// Phrases in a title or description and the tag each one implies
const KEYWORD_TAGS: [(&str, &str); 9] = [
    ("remote", "remote"),
    ("hybrid", "hybrid"),
    ("contract", "contract"),
    ("part-time", "part-time"),
    ("part time", "part-time"),
    ("full-time", "full-time"),
    ("full time", "full-time"),
    ("internship", "internship"),
    ("co-op", "internship"),
];

/// Compute `field` from the job's current state and assign it. On failure
/// the field is reset to its default so a re-run never sees stale output.
pub fn apply_set_field(job: &mut Job, field: JobField) -> Result<(), FieldComputationFailure> {
    match field {
        JobField::Url => match canonical_url(&job.url) {
            Ok(url) => {
                job.url = url;
                Ok(())
            }
            Err(reason) => {
                job.url = String::new();
                Err(FieldComputationFailure::new(field, reason))
            }
        },
        JobField::Remoteness => {
            job.remoteness = classify_remoteness(job);
            Ok(())
        }
        JobField::Tags => {
            job.tags = keyword_tags(job);
            Ok(())
        }
        other => Err(FieldComputationFailure::new(
            other,
            "field is copied from the row and cannot be computed",
        )),
    }
}

/// Absolute http(s) URL without fragment or click-tracking parameters
pub fn canonical_url(raw: &str) -> Result<String, String> {
    if raw.trim().is_empty() {
        return Err("listing has no url".to_string());
    }
    let mut url = Url::parse(raw.trim()).map_err(|e| format!("invalid url `{}`: {}", raw, e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("unsupported url scheme `{}`", url.scheme()));
    }

    url.set_fragment(None);
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| {
            let name = name.to_ascii_lowercase();
            !name.starts_with("utm_") && !TRACKING_PARAMS.contains(&name.as_str())
        })
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    Ok(url.to_string())
}

/// Reads only tags and location. Keywords in the description reach it
/// through a preceding TAGS field.
pub fn classify_remoteness(job: &Job) -> Remoteness {
    let location = job.location.to_lowercase();
    let mentions =
        |needle: &str| job.tags.iter().any(|tag| tag == needle) || location.contains(needle);

    if mentions("remote") {
        Remoteness::Remote
    } else if mentions("hybrid") {
        Remoteness::Hybrid
    } else if ["on-site", "onsite", "in person", "in-person"]
        .into_iter()
        .any(mentions)
    {
        Remoteness::InPerson
    } else {
        Remoteness::Unknown
    }
}

/// Existing tags followed by keyword tags found in the title or description
pub fn keyword_tags(job: &Job) -> Vec<String> {
    let text = format!("{} {}", job.title, job.description).to_lowercase();
    let mut tags = job.tags.clone();
    for (phrase, tag) in KEYWORD_TAGS {
        if text.contains(phrase) && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobStatus, Locale};
    use chrono::NaiveDate;

    fn job() -> Job {
        Job {
            title: "Rust Developer".to_string(),
            company: "Acme".to_string(),
            location: "Toronto, ON".to_string(),
            description: "A fully remote role on a contract basis.".to_string(),
            url: "https://ca.linkedin.com/jobs/view/3921?refId=abc&trk=public&position=1#top"
                .to_string(),
            provider: "linkedin".to_string(),
            key_id: "linkedin-3921".to_string(),
            locale: Locale::CanadaEnglish,
            query: "rust".to_string(),
            status: JobStatus::New,
            post_date: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            tags: vec!["fulltime".to_string()],
            wage: None,
            remoteness: Remoteness::Unknown,
            raw_content: None,
        }
    }

    #[test]
    fn canonical_url_strips_tracking_and_fragment() {
        let url = canonical_url(&job().url).unwrap();
        assert_eq!(url, "https://ca.linkedin.com/jobs/view/3921?position=1");
    }

    #[test]
    fn canonical_url_drops_empty_query() {
        let url =
            canonical_url("https://www.ziprecruiter.com/c/Acme/Job/Dev?utm_source=feed").unwrap();
        assert_eq!(url, "https://www.ziprecruiter.com/c/Acme/Job/Dev");
    }

    #[test]
    fn relative_or_missing_urls_fail_and_reset() {
        let mut job = job();
        job.url = "/jobs/view/3921".to_string();

        let err = apply_set_field(&mut job, JobField::Url).unwrap_err();
        assert_eq!(err.field, JobField::Url);
        assert!(job.url.is_empty());
        assert!(canonical_url("").is_err());
        assert!(canonical_url("ftp://example.com/job").is_err());
    }

    #[test]
    fn remoteness_comes_from_tags_and_location() {
        let mut job = job();
        assert_eq!(classify_remoteness(&job), Remoteness::Unknown);

        job.location = "Hybrid - Ottawa, ON".to_string();
        assert_eq!(classify_remoteness(&job), Remoteness::Hybrid);

        job.tags.push("remote".to_string());
        assert_eq!(classify_remoteness(&job), Remoteness::Remote);

        job.tags.clear();
        job.location = "Calgary (On-site)".to_string();
        assert_eq!(classify_remoteness(&job), Remoteness::InPerson);
    }

    #[test]
    fn keyword_tags_append_without_duplicates() {
        let tags = keyword_tags(&job());
        assert_eq!(tags, vec!["fulltime", "remote", "contract"]);

        let mut again = job();
        again.tags = tags.clone();
        assert_eq!(keyword_tags(&again), tags);
    }

    #[test]
    fn get_only_fields_cannot_be_set() {
        let mut job = job();
        let err = apply_set_field(&mut job, JobField::Title).unwrap_err();
        assert_eq!(err.field, JobField::Title);
        assert_eq!(job.title, "Rust Developer");
    }
}
