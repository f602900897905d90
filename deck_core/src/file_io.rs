//! # File I/O Module
//!
//! Reading and writing study files and analysis results:
//! - **Atomic saves**: write to a `.tmp` sibling, read it back, rename
//! - **File locking**: keep two searches from overwriting the same study
//! - **Version validation**: refuse studies written by a newer schema
//!
//! ## File Format
//!
//! Studies are JSON documents, `.deck` by convention. A held lock is a
//! `.deck.lock` file naming its owner.
//!
//! ## Example
//!
//! ```rust,no_run
//! use deck_core::file_io::{load_study, save_study, FileLock};
//! use deck_core::study::Study;
//! use std::path::Path;
//!
//! let path = Path::new("deck_a.deck");
//! let lock = FileLock::acquire(path, "engineer@company.com")?;
//!
//! let mut study = Study::new("Deck A", "Engineer");
//! study.optimize().ok();
//! save_study(&study, path)?;
//!
//! drop(lock);
//! let reloaded = load_study(path)?;
//! # Ok::<(), deck_core::errors::DeckError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{DeckError, DeckResult};
use crate::study::{Study, SCHEMA_VERSION};

/// Locks older than this are taken over regardless of their owner
const STALE_LOCK_HOURS: i64 = 24;

fn file_error(operation: &str, path: &Path, err: impl ToString) -> DeckError {
    DeckError::file_error(operation, path.display().to_string(), err.to_string())
}

fn serialization_error(err: impl ToString) -> DeckError {
    DeckError::SerializationError {
        reason: err.to_string(),
    }
}

/// Who holds a study lock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    pub machine: String,
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }

    /// Whether the lock's owner has gone away or the lock has expired
    fn is_stale(&self) -> bool {
        if Utc::now() - self.locked_at > chrono::Duration::hours(STALE_LOCK_HOURS) {
            return true;
        }
        hostname().is_some_and(|ours| ours == self.machine) && !process_alive(self.pid)
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Exclusive lock on a study file, released on drop.
///
/// Combines an OS-level lock (fs2) on the lock file with the [`LockInfo`]
/// written inside it, so other users can see who holds the study.
pub struct FileLock {
    study_path: PathBuf,
    lock_path: PathBuf,
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire the lock on `path`.
    ///
    /// Fails with [`DeckError::FileLocked`] while another live process holds
    /// it; stale locks are taken over.
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> DeckResult<Self> {
        let lock_path = lock_path_for(path);
        if let Some(existing) = read_lock_info(&lock_path) {
            if !existing.is_stale() {
                return Err(DeckError::file_locked(
                    path.display().to_string(),
                    format!("{} ({})", existing.user_id, existing.machine),
                    existing.locked_at.to_rfc3339(),
                ));
            }
            warn!(
                path = %path.display(),
                owner = %existing.user_id,
                "taking over stale lock"
            );
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| file_error("create lock", &lock_path, e))?;

        lock_file.try_lock_exclusive().map_err(|_| {
            DeckError::file_locked(
                path.display().to_string(),
                "another process".to_string(),
                "unknown".to_string(),
            )
        })?;

        let info = LockInfo::new(user_id);
        let json = serde_json::to_string_pretty(&info).map_err(serialization_error)?;
        lock_file
            .write_all(json.as_bytes())
            .and_then(|_| lock_file.sync_all())
            .map_err(|e| file_error("write lock", &lock_path, e))?;

        debug!(path = %path.display(), user = %info.user_id, "acquired study lock");
        Ok(FileLock {
            study_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Current holder of the lock on `path`, if any.
    pub fn check(path: &Path) -> Option<LockInfo> {
        read_lock_info(&lock_path_for(path)).filter(|info| !info.is_stale())
    }

    pub fn study_path(&self) -> &Path {
        &self.study_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// `study.deck` -> `study.deck.lock`
fn lock_path_for(path: &Path) -> PathBuf {
    with_suffix(path, "lock")
}

/// Append `suffix` to the file's extension
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let extension = path
        .extension()
        .map(|e| format!("{}.{}", e.to_string_lossy(), suffix))
        .unwrap_or_else(|| suffix.to_string());
    path.with_extension(extension)
}

fn read_lock_info(lock_path: &Path) -> Option<LockInfo> {
    let contents = fs::read_to_string(lock_path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Write any serializable value as pretty JSON with atomic semantics.
///
/// 1. Write to `<path>.tmp` and fsync
/// 2. Read the temporary file back and check it is complete JSON
/// 3. Rename over `path`
///
/// An interrupted save leaves the previous file untouched.
pub fn write_json_atomic<T: Serialize>(value: &T, path: &Path) -> DeckResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(serialization_error)?;
    let tmp_path = with_suffix(path, "tmp");

    let result = (|| -> DeckResult<()> {
        let mut tmp_file =
            File::create(&tmp_path).map_err(|e| file_error("create temp file", &tmp_path, e))?;
        tmp_file
            .write_all(json.as_bytes())
            .and_then(|_| tmp_file.sync_all())
            .map_err(|e| file_error("write temp file", &tmp_path, e))?;

        let written =
            fs::read_to_string(&tmp_path).map_err(|e| file_error("verify", &tmp_path, e))?;
        serde_json::from_str::<serde_json::Value>(&written).map_err(|e| DeckError::SerializationError {
            reason: format!("temp file {} did not read back: {}", tmp_path.display(), e),
        })?;

        fs::rename(&tmp_path, path).map_err(|e| file_error("rename to final", path, e))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Read a JSON document of any deserializable type.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> DeckResult<T> {
    let contents = fs::read_to_string(path).map_err(|e| file_error("read", path, e))?;
    serde_json::from_str(&contents).map_err(|e| DeckError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })
}

/// Save a study with atomic write semantics.
///
/// # Example
///
/// ```rust,no_run
/// use deck_core::file_io::save_study;
/// use deck_core::study::Study;
/// use std::path::Path;
///
/// let study = Study::new("Deck A", "Engineer");
/// save_study(&study, Path::new("deck_a.deck"))?;
/// # Ok::<(), deck_core::errors::DeckError>(())
/// ```
pub fn save_study(study: &Study, path: &Path) -> DeckResult<()> {
    write_json_atomic(study, path)?;
    info!(path = %path.display(), name = %study.meta.name, "saved study");
    Ok(())
}

/// Load a study, rejecting files from an incompatible schema.
///
/// # Errors
///
/// * [`DeckError::VersionMismatch`] - the file's schema is not readable
/// * [`DeckError::SerializationError`] - the file is not a study
/// * [`DeckError::FileError`] - the file could not be read
pub fn load_study(path: &Path) -> DeckResult<Study> {
    let study: Study = read_json(path)?;
    validate_version(&study.meta.version)?;
    debug!(path = %path.display(), name = %study.meta.name, "loaded study");
    Ok(study)
}

/// Load a study along with whoever currently holds its lock.
pub fn load_study_with_lock_check(path: &Path) -> DeckResult<(Study, Option<LockInfo>)> {
    let study = load_study(path)?;
    Ok((study, FileLock::check(path)))
}

/// Same major version required; in 0.x a newer minor version is rejected.
fn validate_version(file_version: &str) -> DeckResult<()> {
    let parse = |v: &str| -> Vec<u32> { v.split('.').filter_map(|p| p.parse().ok()).collect() };
    let file = parse(file_version);
    let current = parse(SCHEMA_VERSION);

    let compatible = match (file.as_slice(), current.as_slice()) {
        ([fm, ..], [cm, ..]) if fm != cm => false,
        ([0, f_minor, ..], [0, c_minor, ..]) => f_minor <= c_minor,
        ([_, ..], [_, ..]) => true,
        _ => false,
    };
    if compatible {
        Ok(())
    } else {
        Err(DeckError::VersionMismatch {
            file_version: file_version.to_string(),
            expected_version: SCHEMA_VERSION.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::beam_analysis::DEFAULT_SPAN;
    use std::env::temp_dir;

    fn temp_study_path(name: &str) -> PathBuf {
        temp_dir().join(format!("deck_test_{}_{}.deck", name, std::process::id()))
    }

    #[test]
    fn test_sidecar_paths() {
        let path = Path::new("/path/to/study.deck");
        assert_eq!(lock_path_for(path), Path::new("/path/to/study.deck.lock"));
        assert_eq!(with_suffix(path, "tmp"), Path::new("/path/to/study.deck.tmp"));
        assert_eq!(lock_path_for(Path::new("study")), Path::new("study.lock"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_study_path("roundtrip");
        let study = Study::new("Roundtrip", "Test Engineer");
        save_study(&study, &path).unwrap();

        let loaded = load_study(&path).unwrap();
        assert_eq!(loaded.meta.name, "Roundtrip");
        assert_eq!(loaded.bridge, study.bridge);
        assert_eq!(loaded.bridge.span, DEFAULT_SPAN);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_atomic_save_leaves_no_tmp_file() {
        let path = temp_study_path("atomic");
        save_study(&Study::default(), &path).unwrap();
        assert!(path.exists());
        assert!(!with_suffix(&path, "tmp").exists());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let path = temp_study_path("garbage");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_study(&path),
            Err(DeckError::SerializationError { .. })
        ));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_newer_schema() {
        let path = temp_study_path("newer");
        let mut study = Study::default();
        study.meta.version = "0.9.0".to_string();
        save_study(&study, &path).unwrap();
        assert!(matches!(
            load_study(&path),
            Err(DeckError::VersionMismatch { .. })
        ));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file() {
        let result = load_study(&temp_study_path("does_not_exist"));
        assert!(matches!(result, Err(DeckError::FileError { .. })));
    }

    #[test]
    fn test_file_lock_acquire_and_release() {
        let path = temp_study_path("lock");
        File::create(&path).unwrap();

        let lock = FileLock::acquire(&path, "test@example.com").unwrap();
        assert_eq!(lock.info.user_id, "test@example.com");
        assert_eq!(lock.study_path(), path.as_path());
        let lock_path = lock_path_for(&path);
        assert!(lock_path.exists());

        drop(lock);
        assert!(!lock_path.exists());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_stale_lock_detection() {
        let mut info = LockInfo::new("old@example.com");
        info.locked_at = Utc::now() - chrono::Duration::hours(STALE_LOCK_HOURS + 1);
        assert!(info.is_stale());
        assert!(!LockInfo::new("now@example.com").is_stale());
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.7").is_ok());
        assert!(validate_version("0.0.3").is_ok());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("garbage").is_err());
    }

    #[test]
    fn test_load_with_lock_check() {
        let path = temp_study_path("lock_check");
        save_study(&Study::new("Checked", ""), &path).unwrap();

        let (loaded, holder) = load_study_with_lock_check(&path).unwrap();
        assert_eq!(loaded.meta.name, "Checked");
        assert!(holder.is_none());

        let _ = fs::remove_file(&path);
    }
}
