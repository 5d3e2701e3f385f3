//! JSON file report store.
//!
//! Each key becomes `<dir>/<key>.json`, pretty-printed. Writes go to a
//! temporary sibling first and are renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::ReportStore;

/// Report store writing one JSON file per key.
#[derive(Debug, Clone)]
pub struct FileReportStore {
    dir: PathBuf,
}

impl FileReportStore {
    /// Store under `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory reports are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a key is stored at.
    pub fn path_for(&self, key: &str) -> DomainResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(DomainError::ValidationFailed(format!(
                "Invalid report key: {key:?}"
            )));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl ReportStore for FileReportStore {
    async fn put(&self, key: &str, record: &serde_json::Value) -> DomainResult<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let body = serde_json::to_vec_pretty(record)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(path = %path.display(), "report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_writes_json_file() {
        let dir = TempDir::new().unwrap();
        let store = FileReportStore::new(dir.path().join("reports"));

        store
            .put("execution-report-abc", &json!({ "summary": { "total": 2 } }))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(dir.path().join("reports/execution-report-abc.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["summary"]["total"], 2);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_record() {
        let dir = TempDir::new().unwrap();
        let store = FileReportStore::new(dir.path());

        store.put("loop-1", &json!({ "v": 1 })).await.unwrap();
        store.put("loop-1", &json!({ "v": 2 })).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("loop-1.json")).unwrap();
        assert!(raw.contains("\"v\": 2"));
        assert!(!dir.path().join("loop-1.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileReportStore::new(dir.path());

        for key in ["../escape", "a/b", "", ".hidden"] {
            assert!(
                matches!(store.put(key, &json!({})).await, Err(DomainError::ValidationFailed(_))),
                "key {key:?} should be rejected"
            );
        }
    }
}
