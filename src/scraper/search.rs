use std::path::PathBuf;

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use serde_json::Value;
use tracing::debug;

use crate::error::ProviderUnavailable;
use super::provider::{RowStream, SearchCapability, SearchParams};
use super::row::RawRow;

/// Search capability backed by result exports on disk.
///
/// An external scraper writes one JSON array of rows per provider to
/// `<dir>/<site>.json`; this serves them back capped at `results_wanted`.
pub struct SnapshotSearch {
    dir: PathBuf,
}

impl SnapshotSearch {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SearchCapability for SnapshotSearch {
    async fn search(&self, params: SearchParams) -> Result<RowStream, ProviderUnavailable> {
        let path = self.dir.join(format!("{}.json", params.site));
        debug!("Reading {} results for '{}' from {}", params.site, params.query, path.display());

        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| {
                ProviderUnavailable::new(format!("cannot read {}: {}", path.display(), e))
            })?;

        let rows = match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Array(rows)) => rows,
            Ok(_) => {
                return Err(ProviderUnavailable::new(format!(
                    "{} does not hold an array of rows",
                    path.display()
                )))
            }
            Err(e) => {
                return Err(ProviderUnavailable::new(format!(
                    "cannot parse {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let rows = rows
            .into_iter()
            .take(params.results_wanted)
            .map(|row| Ok(RawRow::from(row)));
        Ok(stream::iter(rows).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;

    fn params(site: &str, results_wanted: usize) -> SearchParams {
        SearchParams {
            site: site.to_string(),
            query: "rust".to_string(),
            region: "ON".to_string(),
            radius: 25,
            hours_old: 168,
            results_wanted,
            fetch_description: true,
        }
    }

    fn snapshot_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("job-funnel-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn serves_rows_up_to_the_cap() {
        let dir = snapshot_dir("cap");
        std::fs::write(
            dir.join("linkedin.json"),
            r#"[{"id": "1"}, {"id": "2"}, {"id": "3"}]"#,
        )
        .unwrap();

        let rows: Vec<RawRow> = SnapshotSearch::new(&dir)
            .search(params("linkedin", 2))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].as_value()["id"], "2");
    }

    #[tokio::test]
    async fn missing_export_is_provider_unavailable() {
        let dir = snapshot_dir("missing");
        let result = SnapshotSearch::new(&dir).search(params("zip_recruiter", 20)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn non_array_export_is_provider_unavailable() {
        let dir = snapshot_dir("shape");
        std::fs::write(dir.join("linkedin.json"), r#"{"error": "rate limited"}"#).unwrap();

        match SnapshotSearch::new(&dir).search(params("linkedin", 20)).await {
            Err(err) => assert!(err.reason.contains("array")),
            Ok(_) => panic!("expected provider failure"),
        }
    }
}
