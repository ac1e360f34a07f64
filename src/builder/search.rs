//! Locating headers, libraries and module sources.
//!
//! Lookups answer "which extra directory would a caller need to add":
//! `Some([])` means the file is in a standard directory and nothing needs
//! adding, `Some([dir])` names the one extra directory it was found in, and
//! `None` means it wasn't found at all.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::builder::toolchain::Toolchain;
use crate::core::platform::PlatformProfile;
use crate::util::fs::absolute;

/// A library was found in a directory the caller never asked about.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("internal error: `{}` is in neither the standard nor the extra directories", found.display())]
    Inconsistent { found: PathBuf },
}

/// Find the directory holding `filename`.
///
/// Standard directories are checked first and win even when the file also
/// exists under an extra directory. Directories are not deduplicated.
pub fn find_file(
    platform: &PlatformProfile,
    filename: &str,
    std_dirs: &[String],
    extra_dirs: &[String],
) -> Option<Vec<String>> {
    if std_dirs
        .iter()
        .any(|dir| platform.sdk_dir(dir).join(filename).exists())
    {
        return Some(Vec::new());
    }

    extra_dirs
        .iter()
        .find(|dir| platform.sdk_dir(dir).join(filename).exists())
        .map(|dir| vec![dir.clone()])
}

/// Find a library through the toolchain and classify where it was found.
pub fn find_library_file(
    toolchain: &dyn Toolchain,
    platform: &PlatformProfile,
    lib: &str,
    std_dirs: &[String],
    extra_dirs: &[String],
) -> Result<Option<Vec<String>>, SearchError> {
    let mut dirs = std_dirs.to_vec();
    dirs.extend(extra_dirs.iter().cloned());

    let Some(found) = toolchain.find_library_file(&dirs, lib) else {
        return Ok(None);
    };
    let dirname = found.parent().unwrap_or_else(|| Path::new(""));

    let matches = |dir: &String| {
        let dir = dir.trim_end_matches('/');
        platform.sdk_dir(dir) == dirname || Path::new(dir) == dirname
    };

    if std_dirs.iter().any(matches) {
        return Ok(Some(Vec::new()));
    }
    if let Some(dir) = extra_dirs.iter().find(|d| matches(d)) {
        return Ok(Some(vec![dir.trim_end_matches('/').to_string()]));
    }

    Err(SearchError::Inconsistent { found })
}

/// Resolve a module source or dependency name against `roots`.
///
/// Returns the absolute path under the first root holding the file, or the
/// name unchanged when no root does.
pub fn find_module_file(module: &str, roots: &[PathBuf]) -> String {
    match roots.iter().find(|root| root.join(module).exists()) {
        Some(root) => absolute(&root.join(module)).to_string_lossy().into_owned(),
        None => module.to_string(),
    }
}

/// Whether any header in `headers` mentions `needle`.
///
/// Unreadable headers count as not mentioning it.
pub fn grep_headers_for(needle: &str, headers: &[PathBuf]) -> bool {
    headers.iter().any(|header| match std::fs::read(header) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).contains(needle),
        Err(e) => {
            tracing::debug!("could not read {}: {}", header.display(), e);
            false
        }
    })
}
