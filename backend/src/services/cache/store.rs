use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::models::ProfileReport;

pub const DEFAULT_TTL_HOURS: u64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    fingerprint: String,
    timestamp: i64,
    result: ProfileReport,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    path: PathBuf,
    timestamp: SystemTime,
}

/// Two-tier cache: an in-memory `DashMap` index backed by one JSON file per
/// fingerprint under `directory`. The index is the source of truth for
/// "does this fingerprint exist"; the file is the source of truth for
/// content. A missing file at lookup time is treated as a miss and the
/// index entry is dropped, never resurrected.
pub struct CacheStore {
    directory: PathBuf,
    ttl: Duration,
    index: DashMap<String, IndexEntry>,
}

impl CacheStore {
    pub fn new(directory: impl Into<PathBuf>, ttl_hours: u64) -> Self {
        Self { directory: directory.into(), ttl: Duration::from_secs(ttl_hours * 3600), index: DashMap::new() }
    }

    /// Scans `directory` for existing cache files and loads valid,
    /// not-yet-expired entries into the index. Corrupted files or files
    /// whose mtime can't be read are skipped, not treated as fatal.
    pub fn load_existing(&self) -> std::io::Result<usize> {
        std::fs::create_dir_all(&self.directory)?;
        let mut loaded = 0;
        for entry in std::fs::read_dir(&self.directory)? {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(fingerprint) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            let Ok(metadata) = entry.metadata() else { continue };
            let Ok(modified) = metadata.modified() else { continue };
            if is_expired(modified, self.ttl) {
                continue;
            }
            self.index.insert(fingerprint.to_string(), IndexEntry { path, timestamp: modified });
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Returns `Some(report)` on a hit within TTL; touches the file's mtime
    /// to mark it recently used. Any failure mode (missing file, corrupt
    /// JSON, expired entry) is treated as a miss: the file is removed if
    /// present and the index entry is evicted.
    pub fn lookup(&self, fingerprint: &str) -> Option<ProfileReport> {
        let entry = self.index.get(fingerprint)?.clone();
        if is_expired(entry.timestamp, self.ttl) {
            self.evict(fingerprint, &entry.path);
            return None;
        }

        match std::fs::read_to_string(&entry.path) {
            Ok(raw) => match serde_json::from_str::<CacheEntry>(&raw) {
                Ok(parsed) => {
                    touch(&entry.path);
                    Some(parsed.result)
                }
                Err(err) => {
                    tracing::warn!(fingerprint, error = %err, "cache entry failed to parse, evicting");
                    self.evict(fingerprint, &entry.path);
                    None
                }
            },
            Err(err) => {
                tracing::warn!(fingerprint, error = %err, "cache file missing or unreadable, evicting");
                self.evict(fingerprint, &entry.path);
                None
            }
        }
    }

    /// Writes the entry to disk and updates the index. Write failures are
    /// logged and reported as `false`; they never propagate to the caller.
    pub fn store(&self, fingerprint: &str, report: &ProfileReport, now_unix: i64) -> bool {
        let path = self.directory.join(format!("{fingerprint}.json"));
        let entry = CacheEntry { fingerprint: fingerprint.to_string(), timestamp: now_unix, result: report.clone() };

        let write_result = std::fs::create_dir_all(&self.directory)
            .and_then(|_| serde_json::to_vec(&entry).map_err(std::io::Error::other))
            .and_then(|bytes| std::fs::write(&path, bytes));

        match write_result {
            Ok(()) => {
                self.index.insert(fingerprint.to_string(), IndexEntry { path, timestamp: SystemTime::now() });
                true
            }
            Err(err) => {
                tracing::warn!(fingerprint, error = %err, "failed to write cache entry");
                false
            }
        }
    }

    /// Deletes every index entry (and its backing file) older than the TTL.
    /// Intended to be called on an hourly timer.
    pub fn sweep(&self) -> usize {
        let expired: Vec<(String, PathBuf)> = self
            .index
            .iter()
            .filter(|kv| is_expired(kv.value().timestamp, self.ttl))
            .map(|kv| (kv.key().clone(), kv.value().path.clone()))
            .collect();
        let count = expired.len();
        for (fingerprint, path) in expired {
            self.evict(&fingerprint, &path);
        }
        count
    }

    fn evict(&self, fingerprint: &str, path: &Path) {
        let _ = std::fs::remove_file(path);
        self.index.remove(fingerprint);
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }
}

fn is_expired(timestamp: SystemTime, ttl: Duration) -> bool {
    SystemTime::now().duration_since(timestamp).map(|age| age > ttl).unwrap_or(false)
}

fn touch(path: &Path) {
    if let Ok(file) = std::fs::File::options().write(true).open(path) {
        let _ = file.set_modified(SystemTime::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProcessingTime, Summary};
    use std::collections::HashMap;

    fn sample_report() -> ProfileReport {
        ProfileReport {
            summary: Summary {
                total_rows: 1,
                total_columns: 1,
                numeric_columns: 1,
                categorical_columns: 0,
                total_missing_values: 0,
                processing_time: ProcessingTime::new(1.0, 0.5, 0.5, 1, 1),
            },
            column_stats: HashMap::new(),
            correlations: Default::default(),
            insights: vec![],
        }
    }

    #[test]
    fn store_then_lookup_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), 24);
        let report = sample_report();
        assert!(store.store("abc123", &report, 1_700_000_000));
        let found = store.lookup("abc123").unwrap();
        assert_eq!(found.summary.total_rows, report.summary.total_rows);
    }

    #[test]
    fn missing_fingerprint_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), 24);
        assert!(store.lookup("nonexistent").is_none());
    }

    #[test]
    fn corrupted_file_is_evicted_as_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), 24);
        std::fs::write(dir.path().join("broken.json"), b"not json").unwrap();
        store.load_existing().unwrap();
        assert!(store.lookup("broken").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn sweep_evicts_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), 0);
        store.store("expired", &sample_report(), 1_700_000_000);
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(store.sweep(), 1);
        assert_eq!(store.len(), 0);
    }
}
