use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MalformedRow;

/// One provider-native result row, exactly as the search capability
/// returned it. Column names follow the capability's export format
/// (`id`, `site`, `job_url`, `title`, `date_posted`, ...).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RawRow(Value);

impl RawRow {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn is_object(&self) -> bool {
        self.0.is_object()
    }

    /// Present and non-null
    fn get(&self, column: &'static str) -> Option<&Value> {
        self.0.get(column).filter(|value| !value.is_null())
    }

    pub fn required_text(&self, column: &'static str) -> Result<String, MalformedRow> {
        match self.get(column) {
            Some(Value::String(text)) => Ok(text.trim().to_string()),
            Some(other) => Err(MalformedRow::WrongShape {
                field: column,
                detail: format!("expected text, got {}", other),
            }),
            None => Err(MalformedRow::MissingField(column)),
        }
    }

    pub fn optional_text(&self, column: &'static str) -> Option<String> {
        match self.get(column) {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        }
    }

    /// Provider ids come back as text from some providers and as integers
    /// from others
    pub fn native_id(&self, column: &'static str) -> Result<String, MalformedRow> {
        match self.get(column) {
            Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.trim().to_string()),
            Some(Value::Number(id)) if id.is_i64() || id.is_u64() => Ok(id.to_string()),
            Some(other) => Err(MalformedRow::WrongShape {
                field: column,
                detail: format!("expected a non-empty id, got {}", other),
            }),
            None => Err(MalformedRow::MissingField(column)),
        }
    }

    pub fn number(&self, column: &'static str) -> Option<f64> {
        match self.get(column) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn flag(&self, column: &'static str) -> bool {
        matches!(self.get(column), Some(Value::Bool(true)))
    }

    /// Text values of a column that may hold a comma separated string or an
    /// array of strings
    pub fn text_list(&self, column: &'static str) -> Vec<String> {
        let values: Vec<&str> = match self.get(column) {
            Some(Value::String(text)) => text.split(',').collect(),
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        values
            .into_iter()
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty())
            .collect()
    }

    pub fn date(&self, column: &'static str) -> Result<NaiveDate, MalformedRow> {
        let value = self.get(column).ok_or(MalformedRow::MissingField(column))?;
        parse_date(value).ok_or_else(|| MalformedRow::WrongShape {
            field: column,
            detail: format!("unrecognised date {}", value),
        })
    }
}

impl From<Value> for RawRow {
    fn from(value: Value) -> Self {
        RawRow(value)
    }
}

/// Calendar day of a posting date in any of the shapes providers report:
/// plain dates, naive or offset timestamps, or epoch milliseconds.
fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|d| d.date_naive()))
                .or_else(|| {
                    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
                        .ok()
                        .map(|d| d.date())
                })
        }
        Value::Number(millis) => millis
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|d| d.date_naive()),
        _ => None,
    }
}
