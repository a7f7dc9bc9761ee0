//! Disk record for the ranked model list: `{ "fetchedAt": <epoch-ms>, "models": [...] }`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Records at or past this age are stale.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Fetch time plus ranked ids, exactly as persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CacheRecord {
    #[serde(rename = "fetchedAt")]
    pub fetched_at: i64,
    pub models: Vec<String>,
}

/// Why a persisted record was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidRecord {
    #[error("not json: {0}")]
    Json(String),
    #[error("fetchedAt is missing or not a number")]
    Timestamp,
    #[error("models is missing, not an array, or empty")]
    Models,
    #[error("models[{0}] is not a non-empty string")]
    Entry(usize),
}

impl CacheRecord {
    /// Record stamped with the current time.
    pub fn now(models: Vec<String>) -> Self {
        Self {
            fetched_at: now_millis(),
            models,
        }
    }

    /// Parses and structurally validates a persisted record.
    pub fn parse(body: &str) -> Result<Self, InvalidRecord> {
        let value: Value = serde_json::from_str(body).map_err(|e| InvalidRecord::Json(e.to_string()))?;
        let fetched_at = value
            .get("fetchedAt")
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .ok_or(InvalidRecord::Timestamp)?;
        let entries = value
            .get("models")
            .and_then(Value::as_array)
            .filter(|a| !a.is_empty())
            .ok_or(InvalidRecord::Models)?;
        let models = entries
            .iter()
            .enumerate()
            .map(|(i, v)| match v.as_str() {
                Some(s) if !s.is_empty() => Ok(s.to_string()),
                _ => Err(InvalidRecord::Entry(i)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { fetched_at, models })
    }

    /// Younger than [`CACHE_TTL`] at `now_ms`.
    pub fn is_fresh_at(&self, now_ms: i64) -> bool {
        let ttl_ms = CACHE_TTL.as_millis() as i64;
        now_ms.saturating_sub(self.fetched_at) < ttl_ms
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(now_millis())
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Reads and atomically replaces the cache file.
#[derive(Clone, Debug)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the record. Missing, unreadable and invalid files all yield `None`.
    pub async fn load(&self) -> Option<CacheRecord> {
        let body = match tokio::fs::read_to_string(&self.path).await {
            Ok(b) => b,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "model cache file not readable");
                return None;
            }
        };
        match CacheRecord::parse(&body) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "discarding invalid model cache file");
                None
            }
        }
    }

    /// Writes to a sibling temp file, then renames it over the canonical path.
    pub async fn save(&self, record: &CacheRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(record)?;
        let tmp = self.temp_path();
        if let Err(e) = tokio::fs::write(&tmp, &body).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "models.json".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_valid_record() {
        let r = CacheRecord::parse(r#"{"fetchedAt":1700000000000,"models":["a","b"]}"#).unwrap();
        assert_eq!(r.fetched_at, 1_700_000_000_000);
        assert_eq!(r.models, vec!["a", "b"]);
    }

    #[test]
    fn parse_rejects_structural_problems() {
        assert!(matches!(CacheRecord::parse("{"), Err(InvalidRecord::Json(_))));
        assert_eq!(
            CacheRecord::parse(r#"{"fetchedAt":"yesterday","models":["a"]}"#),
            Err(InvalidRecord::Timestamp)
        );
        assert_eq!(
            CacheRecord::parse(r#"{"fetchedAt":1,"models":[]}"#),
            Err(InvalidRecord::Models)
        );
        assert_eq!(
            CacheRecord::parse(r#"{"fetchedAt":1}"#),
            Err(InvalidRecord::Models)
        );
        assert_eq!(
            CacheRecord::parse(r#"{"fetchedAt":1,"models":["a",7]}"#),
            Err(InvalidRecord::Entry(1))
        );
        assert_eq!(
            CacheRecord::parse(r#"{"fetchedAt":1,"models":[""]}"#),
            Err(InvalidRecord::Entry(0))
        );
    }

    #[test]
    fn freshness_boundary_is_exclusive() {
        let ttl_ms = CACHE_TTL.as_millis() as i64;
        let r = CacheRecord {
            fetched_at: 1_000,
            models: vec!["a".into()],
        };
        assert!(r.is_fresh_at(1_000 + ttl_ms - 1));
        assert!(!r.is_fresh_at(1_000 + ttl_ms));
    }

    #[tokio::test]
    async fn save_then_load_uses_wire_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested").join("models.json"));
        let record = CacheRecord::now(vec!["x/y:free".into()]);
        store.save(&record).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"fetchedAt\""));
        assert_eq!(store.load().await, Some(record));
    }

    #[tokio::test]
    async fn save_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("models.json"));
        store.save(&CacheRecord::now(vec!["a".into()])).await.unwrap();
        store.save(&CacheRecord::now(vec!["b".into()])).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["models.json"]);
        assert_eq!(store.load().await.unwrap().models, vec!["b"]);
    }

    #[tokio::test]
    async fn load_of_missing_or_corrupt_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("models.json"));
        assert_eq!(store.load().await, None);

        std::fs::write(store.path(), "not json").unwrap();
        assert_eq!(store.load().await, None);
    }
}
