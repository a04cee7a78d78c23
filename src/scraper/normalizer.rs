use chrono::NaiveTime;
use validator::Validate;

use crate::error::MalformedRow;
use crate::job::{Job, JobField, JobStatus, Locale, Remoteness, Wage};
use super::descriptor::FieldPipeline;
use super::row::RawRow;

/// Joins provider tag and native id into a run-unique key
pub const KEY_SEPARATOR: &str = "-";

/// Convert one raw row into a `New` job.
///
/// Required columns are always read: `title`, `company`, `location`, `id`,
/// `site` and `date_posted`. Optional get fields (description, tags, wage)
/// are only copied when the pipeline lists them. `query` and `locale` come
/// from the search that produced the row, never from the row itself.
pub fn normalize(
    row: &RawRow,
    query: &str,
    locale: Locale,
    pipeline: &FieldPipeline,
) -> Result<Job, MalformedRow> {
    if !row.is_object() {
        return Err(MalformedRow::NotAnObject);
    }

    let title = row.required_text("title")?;
    let company = row.required_text("company")?;
    let location = row.required_text("location")?;
    let native_id = row.native_id("id")?;
    let provider = row.required_text("site")?;
    let post_date = row.date("date_posted")?.and_time(NaiveTime::MIN);

    let description = if pipeline.gets(JobField::Description) {
        row.optional_text("description").unwrap_or_default()
    } else {
        String::new()
    };
    let tags = if pipeline.gets(JobField::Tags) {
        row_tags(row)
    } else {
        Vec::new()
    };
    let wage = if pipeline.gets(JobField::Wage) {
        row_wage(row)
    } else {
        None
    };

    let job = Job {
        key_id: [provider.as_str(), native_id.as_str()].join(KEY_SEPARATOR),
        title,
        company,
        location,
        description,
        // Carried as-is; the URL set field canonicalizes it
        url: row.optional_text("job_url").unwrap_or_default(),
        provider,
        locale,
        query: query.to_string(),
        status: JobStatus::New,
        post_date,
        tags,
        wage,
        remoteness: Remoteness::default(),
        raw_content: None,
    };

    if let Err(validation_errors) = job.validate() {
        let messages: Vec<String> = validation_errors
            .field_errors()
            .values()
            .flat_map(|errors| {
                errors.iter().map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation error".to_string())
                })
            })
            .collect();
        return Err(MalformedRow::Invalid(messages.join("; ")));
    }

    Ok(job)
}

/// Tags from the provider's classification columns, plus `remote` when the
/// provider flags the listing as remote
fn row_tags(row: &RawRow) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let flagged_remote = row.flag("is_remote").then(|| "remote".to_string());

    for tag in ["job_type", "job_function", "company_industry"]
        .into_iter()
        .flat_map(|column| row.text_list(column))
        .chain(flagged_remote)
    {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn row_wage(row: &RawRow) -> Option<Wage> {
    let min = row.number("min_amount");
    let max = row.number("max_amount");
    if min.is_none() && max.is_none() {
        return None;
    }
    Some(Wage {
        min,
        max,
        currency: row.optional_text("currency"),
        interval: row.optional_text("interval"),
    })
}
