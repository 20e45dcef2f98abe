//! Disk layout, atomic writes, and advisory file locks (spec §4.1).
//!
//! This module owns every path under the configured root and contains no
//! domain logic: callers hand it a value to serialize or a closure to run
//! under a lock, never a team name to validate.

use fs2::FileExt;
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::StoreError;

/// Root-relative path helpers. All paths are joined onto the configured
/// root directory; nothing here touches `OPENCODE_TEAMS_ROOT` directly.
#[derive(Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn team_dir(&self, team: &str) -> PathBuf {
        self.root.join("teams").join(team)
    }

    pub fn team_config_path(&self, team: &str) -> PathBuf {
        self.team_dir(team).join("config.json")
    }

    pub fn team_config_lock_path(&self, team: &str) -> PathBuf {
        self.team_dir(team).join(".lock")
    }

    pub fn inboxes_dir(&self, team: &str) -> PathBuf {
        self.team_dir(team).join("inboxes")
    }

    pub fn inbox_path(&self, team: &str, agent: &str) -> PathBuf {
        self.inboxes_dir(team).join(format!("{agent}.json"))
    }

    pub fn inboxes_lock_path(&self, team: &str) -> PathBuf {
        self.inboxes_dir(team).join(".lock")
    }

    pub fn health_path(&self, team: &str) -> PathBuf {
        self.team_dir(team).join("health.json")
    }

    pub fn tasks_dir(&self, team: &str) -> PathBuf {
        self.root.join("tasks").join(team)
    }

    pub fn task_path(&self, team: &str, id: u64) -> PathBuf {
        self.tasks_dir(team).join(format!("{id}.json"))
    }

    pub fn tasks_lock_path(&self, team: &str) -> PathBuf {
        self.tasks_dir(team).join(".lock")
    }
}

/// A held advisory exclusive lock. Released on drop, on every exit path
/// including a panic unwind, per spec §4.1's "scoped acquisition" contract.
pub struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

const LOCK_MAX_RETRIES: u32 = 6;

/// Acquire an exclusive lock on `path`, creating the lock file if absent.
///
/// Retries with exponential backoff (50ms, 100ms, 200ms, ...) before giving
/// up with [`StoreError::LockTimeout`]. Callers must not perform subprocess
/// spawns or sleeps of their own while holding the returned guard.
pub fn acquire_lock(path: &Path) -> Result<LockGuard, StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    for attempt in 0..=LOCK_MAX_RETRIES {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(LockGuard { file }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if attempt < LOCK_MAX_RETRIES {
                    std::thread::sleep(Duration::from_millis(50 * (1u64 << attempt)));
                }
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }

    Err(StoreError::LockTimeout {
        path: path.to_path_buf(),
        retries: LOCK_MAX_RETRIES,
    })
}

/// Serialize `value` and write it to `path` atomically: write a sibling
/// temp file in the same directory, fsync it, then rename over the
/// destination. The temp file is unlinked if any step fails (spec §4.1).
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let parent = path.parent().ok_or_else(|| StoreError::InvalidPath {
        path: path.to_path_buf(),
    })?;
    fs::create_dir_all(parent).map_err(|source| StoreError::Io {
        path: parent.to_path_buf(),
        source,
    })?;

    let body = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("write"),
        std::process::id()
    ));

    let result = (|| -> Result<(), StoreError> {
        let mut tmp = File::create(&tmp_path).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        use std::io::Write as _;
        tmp.write_all(&body).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        tmp.sync_all().map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Read and deserialize `path`, with no locking — a best-effort snapshot
/// that is still safe to read concurrently with [`write_json`] because the
/// write is atomic (readers either see the old file or the new one).
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let bytes = fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Whether `path` exists on disk, per-file cheaper than a full read.
pub fn exists(path: &Path) -> bool {
    path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        value: u32,
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.json");
        write_json(&path, &Sample { value: 42 }).unwrap();
        let read: Sample = read_json(&path).unwrap();
        assert_eq!(read, Sample { value: 42 });
    }

    #[test]
    fn write_leaves_no_temp_file_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.json");
        write_json(&path, &Sample { value: 1 }).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json");
        let err = read_json::<Sample>(&path).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn lock_guard_releases_on_drop() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join(".lock");
        {
            let _guard = acquire_lock(&lock_path).unwrap();
        }
        let _guard2 = acquire_lock(&lock_path).unwrap();
    }

    #[test]
    fn lock_path_resolution_is_consistent() {
        let store = Store::new("/root/.opencode-teams");
        assert_eq!(
            store.team_config_path("demo"),
            PathBuf::from("/root/.opencode-teams/teams/demo/config.json")
        );
        assert_eq!(
            store.inbox_path("demo", "r1"),
            PathBuf::from("/root/.opencode-teams/teams/demo/inboxes/r1.json")
        );
        assert_eq!(
            store.task_path("demo", 7),
            PathBuf::from("/root/.opencode-teams/tasks/demo/7.json")
        );
        assert_eq!(
            store.team_config_lock_path("demo"),
            PathBuf::from("/root/.opencode-teams/teams/demo/.lock")
        );
    }
}
