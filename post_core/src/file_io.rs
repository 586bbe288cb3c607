//! # File I/O Module
//!
//! Shared file operations:
//! - **Atomic writes**: Write to .tmp, sync, rename to prevent truncated output
//! - **Versioned JSON**: Load archives and run configurations, checking the
//!   schema version
//!
//! ## Example
//!
//! ```rust,no_run
//! use post_core::file_io::write_atomic;
//! use std::path::Path;
//!
//! write_atomic(Path::new("table.csv"), b"Set,Value\n1,2.5\n")?;
//! # Ok::<(), post_core::errors::PostError>(())
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::errors::{PostError, PostResult};

/// Schema version of results archives and run configurations
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Temp path used while writing `path`
fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write bytes to a file with atomic write semantics.
///
/// 1. Write to a temporary file next to the target
/// 2. Sync to disk (fsync)
/// 3. Rename over the target
///
/// A reader never observes a partially written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> PostResult<()> {
    let tmp_path = tmp_path_for(path);

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        PostError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(contents).map_err(|e| {
        PostError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        PostError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        PostError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    Ok(())
}

/// Read and parse a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> PostResult<T> {
    let contents = fs::read_to_string(path)
        .map_err(|e| PostError::file_error("read", path.display().to_string(), e.to_string()))?;

    serde_json::from_str(&contents).map_err(|e| PostError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })
}

/// Validate that a file version is compatible with [`SCHEMA_VERSION`].
///
/// The major version must match. While the schema is 0.x, a file with a
/// newer minor version is rejected as well.
pub fn validate_version(file_version: &str) -> PostResult<()> {
    let mismatch = || PostError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file_parts: Vec<u32> = file_version
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(mismatch());
    }

    if file_parts[0] != current_parts[0] {
        return Err(mismatch());
    }

    if current_parts[0] == 0
        && file_parts.len() > 1
        && current_parts.len() > 1
        && file_parts[1] > current_parts[1]
    {
        return Err(mismatch());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    fn temp_path(name: &str) -> PathBuf {
        temp_dir().join(format!("postline_file_io_{}", name))
    }

    #[test]
    fn test_tmp_path_generation() {
        let tmp = tmp_path_for(Path::new("/out/Static - Joint_Reactions.csv"));
        assert_eq!(tmp, Path::new("/out/Static - Joint_Reactions.csv.tmp"));
    }

    #[test]
    fn test_atomic_write_creates_no_tmp_file() {
        let path = temp_path("atomic.csv");
        write_atomic(&path, b"a,b\n1,2\n").unwrap();

        assert!(!tmp_path_for(&path).exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a,b\n1,2\n");

        // Overwrite keeps only the new contents
        write_atomic(&path, b"c\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "c\n");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_read_json_errors() {
        let missing = read_json::<serde_json::Value>(&temp_path("does_not_exist.json")).unwrap_err();
        assert_eq!(missing.error_code(), "FILE_ERROR");

        let path = temp_path("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let bad = read_json::<serde_json::Value>(&path).unwrap_err();
        assert_eq!(bad.error_code(), "SERIALIZATION_ERROR");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.0").is_ok());
        assert!(validate_version("0.1.7").is_ok());
        assert!(validate_version("0.0.9").is_ok());

        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("").is_err());
    }
}
