//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))
}

/// Remove a file or dangling symlink if anything exists at `path`.
///
/// Returns whether something was removed.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    if fs::symlink_metadata(path).is_err() {
        return Ok(false);
    }
    fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
    Ok(true)
}

/// Path an artifact is moved to when it fails verification:
/// `<stem>_failed<extension>`, with only the last extension split off.
pub fn quarantine_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let new_name = match file_name.rfind('.') {
        Some(idx) if idx > 0 => format!("{}_failed{}", &file_name[..idx], &file_name[idx..]),
        _ => format!("{}_failed", file_name),
    };

    path.with_file_name(new_name)
}

/// Move `path` out of the way to its quarantine name, replacing any
/// previous quarantined file. Returns the new location.
pub fn quarantine(path: &Path) -> Result<PathBuf> {
    let target = quarantine_path(path);
    remove_file_if_exists(&target)?;
    fs::rename(path, &target).with_context(|| {
        format!("failed to rename {} to {}", path.display(), target.display())
    })?;
    Ok(target)
}

/// List files in `dir` matching a glob pattern such as `*.h`, sorted.
///
/// A missing or unreadable directory simply yields no files.
pub fn glob_in(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let full = format!("{}/{}", escaped, pattern);

    let mut results: Vec<PathBuf> = match glob(&full) {
        Ok(paths) => paths
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                    None
                }
            })
            .filter(|p| p.is_file())
            .collect(),
        Err(e) => {
            tracing::warn!("invalid glob pattern {}: {}", full, e);
            Vec::new()
        }
    };

    results.sort();
    results
}

/// Canonicalize a path, but don't fail if it doesn't exist yet.
/// Returns the path as-is if canonicalization fails.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Make `path` absolute against the current directory without touching
/// the filesystem.
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
