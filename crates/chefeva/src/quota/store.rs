//! Key-value persistence for the quota counter.
//!
//! Stores behave like browser local storage: string keys mapped to string
//! values. The tracker owns parsing; stores only move strings around.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuotaStoreError {
    #[error("quota store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("quota store is corrupt: {0}")]
    Corrupt(String),
    #[error("quota store lock poisoned")]
    Poisoned,
}

/// String key → string value storage backing the quota counter.
pub trait QuotaStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, QuotaStoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), QuotaStoreError>;
}

// ── In-memory ──────────────────────────────────────────────────────

/// Process-local store. Clones share the same map, so a test can keep a
/// handle and inspect what the tracker wrote.
#[derive(Clone, Debug, Default)]
pub struct MemoryQuotaStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with one key already set.
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::default();
        if let Ok(mut map) = store.values.lock() {
            map.insert(key.into(), value.into());
        }
        store
    }
}

impl QuotaStore for MemoryQuotaStore {
    fn get(&self, key: &str) -> Result<Option<String>, QuotaStoreError> {
        let map = self.values.lock().map_err(|_| QuotaStoreError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), QuotaStoreError> {
        let mut map = self.values.lock().map_err(|_| QuotaStoreError::Poisoned)?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ── JSON file ──────────────────────────────────────────────────────

/// Store backed by a single JSON object on disk (`{"chefEvaQuota": "30"}`).
///
/// Every write rewrites the whole file atomically: serialize to a sibling
/// temp file, then rename over the target.
#[derive(Debug)]
pub struct FileQuotaStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileQuotaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<HashMap<String, String>, QuotaStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(HashMap::new()),
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| QuotaStoreError::Corrupt(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<(), QuotaStoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(map)
            .map_err(|e| QuotaStoreError::Corrupt(e.to_string()))?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl QuotaStore for FileQuotaStore {
    fn get(&self, key: &str) -> Result<Option<String>, QuotaStoreError> {
        let _guard = self.lock.lock().map_err(|_| QuotaStoreError::Poisoned)?;
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), QuotaStoreError> {
        let _guard = self.lock.lock().map_err(|_| QuotaStoreError::Poisoned)?;
        // A corrupt file is replaced rather than blocking every future write.
        let mut map = self.read_map().unwrap_or_default();
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }
}

// ── Parsing ────────────────────────────────────────────────────────

/// Outcome of interpreting a stored quota value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredQuota {
    pub remaining: u32,
    /// Whether the stored value must be rewritten (absent, invalid, clamped).
    pub needs_rewrite: bool,
}

/// Interpret a raw stored value against `max`.
///
/// Only plain non-negative integers are accepted. Missing, non-integer and
/// negative values reset to `max`; values above `max` clamp to `max`.
pub fn parse_stored_quota(raw: Option<&str>, max: u32) -> StoredQuota {
    let reset = StoredQuota {
        remaining: max,
        needs_rewrite: true,
    };
    let Some(raw) = raw else {
        return reset;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return reset;
    }
    match trimmed.parse::<u64>() {
        Ok(n) if n > u64::from(max) => StoredQuota {
            remaining: max,
            needs_rewrite: true,
        },
        Ok(n) => StoredQuota {
            remaining: n as u32,
            needs_rewrite: trimmed != raw,
        },
        // Overflowing digit strings are far above any max.
        Err(_) => StoredQuota {
            remaining: max,
            needs_rewrite: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_plain_integers() {
        assert_eq!(
            parse_stored_quota(Some("12"), 30),
            StoredQuota {
                remaining: 12,
                needs_rewrite: false
            }
        );
        assert_eq!(parse_stored_quota(Some("0"), 30).remaining, 0);
    }

    #[test]
    fn parse_resets_invalid_values_to_max() {
        for raw in [None, Some(""), Some("abc"), Some("-5"), Some("3.5"), Some("+4")] {
            let parsed = parse_stored_quota(raw, 30);
            assert_eq!(parsed.remaining, 30, "raw={raw:?}");
            assert!(parsed.needs_rewrite, "raw={raw:?}");
        }
    }

    #[test]
    fn parse_clamps_above_max() {
        let parsed = parse_stored_quota(Some("45"), 30);
        assert_eq!(parsed.remaining, 30);
        assert!(parsed.needs_rewrite);

        let huge = parse_stored_quota(Some("99999999999999999999999"), 30);
        assert_eq!(huge.remaining, 30);
    }

    #[test]
    fn parse_normalizes_whitespace() {
        let parsed = parse_stored_quota(Some(" 7\n"), 30);
        assert_eq!(parsed.remaining, 7);
        assert!(parsed.needs_rewrite);
    }

    #[test]
    fn memory_store_clones_share_state() {
        let store = MemoryQuotaStore::new();
        let handle = store.clone();
        store.set("k", "3").unwrap();
        assert_eq!(handle.get("k").unwrap().as_deref(), Some("3"));
        assert_eq!(handle.get("missing").unwrap(), None);
    }

    #[test]
    fn file_store_round_trips_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("quota.json");
        let store = FileQuotaStore::new(&path);

        assert_eq!(store.get("chefEvaQuota").unwrap(), None);
        store.set("chefEvaQuota", "29").unwrap();
        store.set("other", "x").unwrap();

        let reopened = FileQuotaStore::new(&path);
        assert_eq!(reopened.get("chefEvaQuota").unwrap().as_deref(), Some("29"));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("x"));
        assert!(!dir.path().join("nested").join("quota.json.tmp").exists());
    }

    #[test]
    fn file_store_reports_corrupt_file_and_recovers_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quota.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileQuotaStore::new(&path);

        assert!(matches!(
            store.get("chefEvaQuota"),
            Err(QuotaStoreError::Corrupt(_))
        ));
        store.set("chefEvaQuota", "30").unwrap();
        assert_eq!(store.get("chefEvaQuota").unwrap().as_deref(), Some("30"));
    }
}
