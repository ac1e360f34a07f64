//! Toolchain abstraction for the C compiler that realizes candidates.
//!
//! Detection never compiles anything. It only asks the toolchain where a
//! library lives and what an existing binary links against. After
//! detection, the toolchain turns each selected candidate into a loadable
//! artifact.
//!
//! Toolchain detection priority:
//! 1. The `CC` environment variable
//! 2. The config store's `CC`
//! 3. Auto-detection (searching PATH for common compilers)

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::builder::env_flags::CompilerDirs;
use crate::core::candidate::ModuleCandidate;
use crate::core::platform::PlatformProfile;
use crate::util::context::BuildLayout;

mod detect;
mod gcc;

pub use detect::{compiler_command, detect_compiler_family, detect_toolchain};
pub use gcc::GccToolchain;

/// A compile or link failure for one candidate.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("module has no sources")]
    NoSources,

    #[error("compiling `{source_file}` failed:\n{stderr}")]
    Compile { source_file: String, stderr: String },

    #[error("linking `{}` failed:\n{stderr}", artifact.display())]
    Link { artifact: PathBuf, stderr: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The family of a toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainPlatform {
    /// GCC (GNU Compiler Collection)
    Gcc,
    /// Clang/LLVM
    Clang,
    /// Apple Clang (macOS)
    AppleClang,
}

impl ToolchainPlatform {
    /// Get the platform name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainPlatform::Gcc => "gcc",
            ToolchainPlatform::Clang => "clang",
            ToolchainPlatform::AppleClang => "apple-clang",
        }
    }
}

/// The toolchain collaborator.
pub trait Toolchain: Send + Sync {
    /// Get the toolchain family.
    fn platform(&self) -> ToolchainPlatform;

    /// Get the C compiler path.
    fn compiler_path(&self) -> &Path;

    /// Find the file `lib` would link against when searching `dirs`.
    fn find_library_file(&self, dirs: &[String], lib: &str) -> Option<PathBuf>;

    /// Compile and link a candidate into a loadable artifact.
    ///
    /// `dirs` are the compiler-wide directories every candidate sees.
    fn build(
        &self,
        candidate: &ModuleCandidate,
        dirs: &CompilerDirs,
        layout: &BuildLayout,
    ) -> Result<PathBuf, BuildError>;

    /// Lines describing the dynamic dependencies a library declares.
    ///
    /// `None` when the information can't be obtained.
    fn needed_libraries(&self, library: &Path, scratch: &Path) -> Option<Vec<String>>;

    /// The CPU architectures a binary was built for.
    fn architectures(&self, binary: &Path, scratch: &Path) -> Option<Vec<String>>;
}

/// Library filename suffixes tried in each directory, in order.
pub const LIBRARY_SUFFIXES: &[&str] = &[".so", ".dylib", ".tbd", ".a"];

/// Search `dirs` for `lib<name>` with each known suffix.
///
/// On the apple-like platform, SDK directories are searched under the SDK
/// root and the returned path points there.
pub fn find_library_in_dirs(
    dirs: &[String],
    lib: &str,
    platform: &PlatformProfile,
) -> Option<PathBuf> {
    for dir in dirs {
        let dir = platform.sdk_dir(dir.trim_end_matches('/'));
        for suffix in LIBRARY_SUFFIXES {
            let candidate = dir.join(format!("lib{}{}", lib, suffix));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_library_in_dirs_order() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();
        std::fs::write(first.join("libz.a"), "").unwrap();
        std::fs::write(second.join("libz.so"), "").unwrap();

        let dirs = vec![
            first.to_string_lossy().into_owned(),
            second.to_string_lossy().into_owned(),
        ];
        let platform = PlatformProfile::new("linux");

        assert_eq!(
            find_library_in_dirs(&dirs, "z", &platform),
            Some(first.join("libz.a"))
        );
        assert_eq!(find_library_in_dirs(&dirs, "bz2", &platform), None);
    }

    #[test]
    fn test_find_library_in_sdk() {
        let tmp = TempDir::new().unwrap();
        let sdk = tmp.path().join("MacOSX.sdk");
        std::fs::create_dir_all(sdk.join("usr/lib")).unwrap();
        std::fs::write(sdk.join("usr/lib/libedit.tbd"), "").unwrap();

        let platform = PlatformProfile::new("darwin").with_sdk(&sdk, true);

        assert_eq!(
            find_library_in_dirs(&["/usr/lib".to_string()], "edit", &platform),
            Some(sdk.join("usr/lib/libedit.tbd"))
        );
    }

    #[test]
    fn test_platform_names() {
        assert_eq!(ToolchainPlatform::Gcc.as_str(), "gcc");
        assert_eq!(ToolchainPlatform::AppleClang.as_str(), "apple-clang");
    }
}
