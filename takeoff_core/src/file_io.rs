//! # File I/O Module
//!
//! Persists the shape catalog and settings with safety features:
//! - **Atomic saves**: Write to .tmp, sync, rename over the target
//! - **File locking**: At most one writer per catalog file
//! - **Version validation**: Ensure schema compatibility
//!
//! ## File Format
//!
//! Catalogs are saved as `.shapes.json` documents:
//!
//! ```text
//! { "version": "0.1.0", "next_id": 42, "shapes": [ShapeRecord, ...] }
//! ```
//!
//! Lock files append `.lock` to the catalog file name and hold metadata
//! about who holds the lock.
//!
//! ## Example
//!
//! ```rust,no_run
//! use takeoff_core::file_io::{load_catalog, save_catalog, FileLock};
//! use std::path::Path;
//!
//! let path = Path::new("steel.shapes.json");
//! let lock = FileLock::acquire(path, "estimator@company.com").unwrap();
//!
//! let catalog = load_catalog(path).unwrap();
//! save_catalog(&catalog, path).unwrap();
//!
//! // Lock is released when dropped
//! drop(lock);
//! ```

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ShapeRecord};
use crate::errors::{TakeoffError, TakeoffResult};
use crate::settings::{TakeoffSettings, SCHEMA_VERSION};

/// Lock file metadata stored next to the locked file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    /// When the lock was acquired
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Create new lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
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

/// Exclusive writer lock on a catalog file, released on drop.
///
/// Holds an OS-level lock (fs2) on the `.lock` file and writes
/// [`LockInfo`] into it so other users can see who has the catalog open.
pub struct FileLock {
    target_path: PathBuf,
    lock_path: PathBuf,
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire an exclusive lock on `path`.
    ///
    /// A stale lock (dead process on this machine, or older than 24 hours)
    /// is taken over.
    ///
    /// # Returns
    ///
    /// * `Ok(FileLock)` - Lock acquired successfully
    /// * `Err(TakeoffError::FileLocked)` - Another process holds the lock
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> TakeoffResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if lock_path.exists() {
            if let Ok(existing) = read_lock_info(&lock_path) {
                if !is_lock_stale(&existing) {
                    return Err(TakeoffError::file_locked(
                        path.display().to_string(),
                        format!("{} ({})", existing.user_id, existing.machine),
                        existing.locked_at.to_rfc3339(),
                    ));
                }
                log::warn!(
                    "Taking over stale lock on {} held by {} (pid {})",
                    path.display(),
                    existing.user_id,
                    existing.pid
                );
            }
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| TakeoffError::file_error("create lock", lock_path.display().to_string(), e.to_string()))?;

        lock_file.try_lock_exclusive().map_err(|_| {
            TakeoffError::file_locked(
                path.display().to_string(),
                "another process".to_string(),
                "unknown".to_string(),
            )
        })?;

        let lock_json = serde_json::to_string_pretty(&info).map_err(TakeoffError::serialization)?;

        lock_file
            .write_all(lock_json.as_bytes())
            .map_err(|e| TakeoffError::file_error("write lock", lock_path.display().to_string(), e.to_string()))?;

        lock_file
            .sync_all()
            .map_err(|e| TakeoffError::file_error("sync lock", lock_path.display().to_string(), e.to_string()))?;

        log::debug!("Acquired lock {}", lock_path.display());

        Ok(FileLock {
            target_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Who holds the lock on `path`, if anyone (stale locks count as free)
    pub fn check(path: &Path) -> Option<LockInfo> {
        let lock_path = lock_path_for(path);
        if lock_path.exists() {
            if let Ok(info) = read_lock_info(&lock_path) {
                if !is_lock_stale(&info) {
                    return Some(info);
                }
            }
        }
        None
    }

    /// Path of the locked file
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// `name.ext` -> `name.ext.<suffix>`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("catalog"));
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn lock_path_for(path: &Path) -> PathBuf {
    sibling_path(path, "lock")
}

fn read_lock_info(lock_path: &Path) -> TakeoffResult<LockInfo> {
    let contents = read_to_string(lock_path, "read lock")?;
    serde_json::from_str(&contents).map_err(TakeoffError::serialization)
}

fn is_lock_stale(info: &LockInfo) -> bool {
    if let Some(our_machine) = hostname() {
        if info.machine == our_machine {
            #[cfg(windows)]
            {
                use std::process::Command;
                let output = Command::new("tasklist")
                    .args(["/FI", &format!("PID eq {}", info.pid), "/NH"])
                    .output();
                if let Ok(output) = output {
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    if stdout.contains("No tasks") || !stdout.contains(&info.pid.to_string()) {
                        return true;
                    }
                }
            }
            #[cfg(unix)]
            {
                if fs::metadata(format!("/proc/{}", info.pid)).is_err() {
                    return true;
                }
            }
        }
    }

    let age = Utc::now() - info.locked_at;
    age.num_hours() > 24
}

fn read_to_string(path: &Path, operation: &str) -> TakeoffResult<String> {
    let mut file =
        File::open(path).map_err(|e| TakeoffError::file_error(operation, path.display().to_string(), e.to_string()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| TakeoffError::file_error(operation, path.display().to_string(), e.to_string()))?;
    Ok(contents)
}

/// Write `bytes` to `path` so readers see either the old file or the new one.
///
/// 1. Write to `<path>.tmp`
/// 2. Sync to disk (fsync)
/// 3. Rename over `path` (atomic on most filesystems)
pub fn write_atomic(path: &Path, bytes: &[u8]) -> TakeoffResult<()> {
    let tmp_path = sibling_path(path, "tmp");

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        TakeoffError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(bytes).map_err(|e| {
        TakeoffError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        TakeoffError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        TakeoffError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    Ok(())
}

/// On-disk form of a [`Catalog`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub version: String,
    pub next_id: u32,
    pub shapes: Vec<ShapeRecord>,
}

impl CatalogDocument {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        CatalogDocument {
            version: SCHEMA_VERSION.to_string(),
            next_id: catalog.next_id(),
            shapes: catalog.iter().cloned().collect(),
        }
    }

    pub fn into_catalog(self) -> TakeoffResult<Catalog> {
        Catalog::from_records(self.shapes, self.next_id)
    }
}

/// Save the catalog atomically.
///
/// Callers sharing a catalog file should hold a [`FileLock`] across the
/// load-modify-save cycle.
pub fn save_catalog(catalog: &Catalog, path: &Path) -> TakeoffResult<()> {
    let json = serde_json::to_string_pretty(&CatalogDocument::from_catalog(catalog))
        .map_err(TakeoffError::serialization)?;
    write_atomic(path, json.as_bytes())?;
    log::info!("Saved {} shapes to {}", catalog.len(), path.display());
    Ok(())
}

/// Load a catalog; a missing file is an empty catalog.
///
/// # Returns
///
/// * `Err(TakeoffError::VersionMismatch)` - File version is incompatible
/// * `Err(TakeoffError::SerializationError)` - Invalid JSON or duplicate keys
/// * `Err(TakeoffError::FileError)` - I/O error
pub fn load_catalog(path: &Path) -> TakeoffResult<Catalog> {
    if !path.exists() {
        log::info!("No catalog at {}, starting empty", path.display());
        return Ok(Catalog::new());
    }

    let contents = read_to_string(path, "read")?;
    let document: CatalogDocument = serde_json::from_str(&contents)
        .map_err(|e| TakeoffError::serialization(format!("Invalid JSON in {}: {}", path.display(), e)))?;

    validate_version(&document.version)?;

    let catalog = document.into_catalog()?;
    log::info!("Loaded {} shapes from {}", catalog.len(), path.display());
    Ok(catalog)
}

/// Load a catalog along with the current lock holder, if any.
pub fn load_catalog_with_lock_check(path: &Path) -> TakeoffResult<(Catalog, Option<LockInfo>)> {
    let catalog = load_catalog(path)?;
    let lock_info = FileLock::check(path);
    Ok((catalog, lock_info))
}

/// Save settings atomically, stamped with the current schema version.
pub fn save_settings(settings: &TakeoffSettings, path: &Path) -> TakeoffResult<()> {
    let mut stamped = settings.clone();
    stamped.version = SCHEMA_VERSION.to_string();
    let json = serde_json::to_string_pretty(&stamped).map_err(TakeoffError::serialization)?;
    write_atomic(path, json.as_bytes())
}

/// Load settings; a missing file yields defaults.
pub fn load_settings(path: &Path) -> TakeoffResult<TakeoffSettings> {
    if !path.exists() {
        return Ok(TakeoffSettings::default());
    }

    let contents = read_to_string(path, "read")?;
    let settings: TakeoffSettings = serde_json::from_str(&contents)
        .map_err(|e| TakeoffError::serialization(format!("Invalid JSON in {}: {}", path.display(), e)))?;
    validate_version(&settings.version)?;
    Ok(settings)
}

/// Check a file's schema version against [`SCHEMA_VERSION`].
///
/// Major versions must match. While in 0.x, a file with a newer minor
/// version is rejected.
pub fn validate_version(file_version: &str) -> TakeoffResult<()> {
    let mismatch = || TakeoffError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file_parts: Vec<u32> = file_version.split('.').filter_map(|p| p.parse().ok()).collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION.split('.').filter_map(|p| p.parse().ok()).collect();

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(mismatch());
    }

    if file_parts[0] != current_parts[0] {
        return Err(mismatch());
    }

    if current_parts[0] == 0 && file_parts.len() > 1 && current_parts.len() > 1 && file_parts[1] > current_parts[1] {
        return Err(mismatch());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ShapeClass;
    use crate::quote::GroupingMode;

    fn sample_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        let id = catalog.upsert_shape("W14X90", "W14X90", "", ShapeClass::W).unwrap();
        catalog.upsert_property(id, "W", "90").unwrap();
        catalog.upsert_property(id, "d", "14.0").unwrap();
        let id = catalog
            .upsert_shape("HSS4X4X.250", "HSS4X4X1/4", "HSS4X4X.250", ShapeClass::HSS)
            .unwrap();
        catalog.upsert_property(id, "W", "12.21").unwrap();
        catalog
    }

    #[test]
    fn test_sibling_paths() {
        let path = Path::new("/path/to/steel.shapes.json");
        assert_eq!(lock_path_for(path), Path::new("/path/to/steel.shapes.json.lock"));
        assert_eq!(sibling_path(path, "tmp"), Path::new("/path/to/steel.shapes.json.tmp"));
    }

    #[test]
    fn test_lock_info_creation() {
        let info = LockInfo::new("test@example.com");
        assert_eq!(info.user_id, "test@example.com");
        assert!(info.pid > 0);
    }

    #[test]
    fn test_catalog_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steel.shapes.json");
        let catalog = sample_catalog();

        save_catalog(&catalog, &path).unwrap();
        let loaded = load_catalog(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.next_id(), catalog.next_id());
        let id = loaded.get_by_key("W14X90").unwrap().id;
        assert_eq!(loaded.property(id, "W"), 90.0);
        assert_eq!(loaded.property(id, "d"), 14.0);
        let hss = loaded.get_by_key("HSS4X4X.250").unwrap();
        assert_eq!(hss.primary_label, "HSS4X4X1/4");
        assert_eq!(hss.classification, ShapeClass::HSS);
    }

    #[test]
    fn test_missing_catalog_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = load_catalog(&dir.path().join("none.shapes.json")).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_atomic_save_leaves_no_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steel.shapes.json");

        save_catalog(&sample_catalog(), &path).unwrap();

        assert!(path.exists());
        assert!(!sibling_path(&path, "tmp").exists());
    }

    #[test]
    fn test_invalid_json_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.shapes.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_catalog(&path).unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_newer_catalog_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.shapes.json");
        fs::write(&path, r#"{"version": "0.9.0", "next_id": 1, "shapes": []}"#).unwrap();

        let err = load_catalog(&path).unwrap_err();
        assert!(matches!(err, TakeoffError::VersionMismatch { .. }));
    }

    #[test]
    fn test_file_lock_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steel.shapes.json");
        File::create(&path).unwrap();

        let lock = FileLock::acquire(&path, "test@example.com").unwrap();
        assert_eq!(lock.info.user_id, "test@example.com");
        assert_eq!(lock.target_path(), path.as_path());

        let lock_path = lock_path_for(&path);
        assert!(lock_path.exists());

        drop(lock);
        assert!(!lock_path.exists());
    }

    #[test]
    fn test_stale_lock_by_age() {
        let mut info = LockInfo::new("old@example.com");
        info.machine = "some-other-machine".to_string();
        info.locked_at = Utc::now() - chrono::Duration::hours(30);
        assert!(is_lock_stale(&info));

        info.locked_at = Utc::now();
        assert!(!is_lock_stale(&info));
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.0").is_ok());
        assert!(validate_version("0.1.5").is_ok());
        assert!(validate_version("0.0.9").is_ok());

        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("garbage").is_err());
    }

    #[test]
    fn test_settings_roundtrip_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("takeoff.settings.json");

        assert_eq!(load_settings(&path).unwrap(), TakeoffSettings::default());

        let mut settings = TakeoffSettings::default();
        settings.pricing.grouping = GroupingMode::Designation;
        settings.pricing.markup_percent = 12.0;
        settings.query_limit = 25;
        save_settings(&settings, &path).unwrap();

        assert_eq!(load_settings(&path).unwrap(), settings);
    }

    #[test]
    fn test_load_with_lock_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steel.shapes.json");
        save_catalog(&sample_catalog(), &path).unwrap();

        let (loaded, lock_info) = load_catalog_with_lock_check(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(lock_info.is_none());
    }
}
