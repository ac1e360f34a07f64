//! Test utilities and fakes for Berth unit tests.
//!
//! Detection and verification both talk to the outside world through the
//! [`Toolchain`] and [`Loader`] collaborators. The fakes here answer from
//! canned data so tests never run a compiler or load a real library.
//!
//! # Example
//!
//! ```rust,ignore
//! use berth::test_support::{FakeToolchain, HermeticHost};
//!
//! #[test]
//! fn test_example() {
//!     let host = HermeticHost::new();
//!     host.add_library("z");
//!
//!     let platform = PlatformProfile::new("linux");
//!     let toolchain = FakeToolchain::new(platform.clone()).failing("_broken");
//!     let mut ctx = host.context(&platform, &host.config(), &env, &toolchain);
//!     // run detectors against ctx...
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::builder::env_flags::CompilerDirs;
use crate::builder::toolchain::{find_library_in_dirs, BuildError, Toolchain, ToolchainPlatform};
use crate::core::candidate::ModuleCandidate;
use crate::core::platform::PlatformProfile;
use crate::ops::verify::{LoadError, Loader};
use crate::util::context::BuildLayout;

// Re-export fixtures for convenience
pub use fixtures::*;

/// Toolchain that never runs a compiler.
///
/// Library lookup searches the given directories on the real filesystem
/// (tests point them at a temporary tree) unless a library was registered
/// explicitly. Builds write a small placeholder artifact.
#[derive(Debug)]
pub struct FakeToolchain {
    platform: PlatformProfile,
    compiler: PathBuf,
    libraries: HashMap<String, PathBuf>,
    failing: Vec<String>,
    needed: Option<Vec<String>>,
    architectures: Option<Vec<String>>,
    log: Mutex<Vec<String>>,
}

impl FakeToolchain {
    pub fn new(platform: PlatformProfile) -> Self {
        FakeToolchain {
            platform,
            compiler: PathBuf::from("/nonexistent/cc"),
            libraries: HashMap::new(),
            failing: Vec::new(),
            needed: None,
            architectures: None,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Answer lookups for `lib` with `path`, wherever the caller searches.
    pub fn with_library(mut self, lib: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.libraries.insert(lib.into(), path.into());
        self
    }

    /// Make building `module` fail.
    pub fn failing(mut self, module: impl Into<String>) -> Self {
        self.failing.push(module.into());
        self
    }

    /// Canned dynamic-dependency listing for every library.
    pub fn with_needed_libraries<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.needed = Some(lines.into_iter().map(Into::into).collect());
        self
    }

    /// Canned architecture listing for every binary.
    pub fn with_architectures<I, S>(mut self, archs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.architectures = Some(archs.into_iter().map(Into::into).collect());
        self
    }

    /// Names of the modules built so far, in completion order.
    pub fn build_log(&self) -> Vec<String> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }
}

impl Toolchain for FakeToolchain {
    fn platform(&self) -> ToolchainPlatform {
        ToolchainPlatform::Gcc
    }

    fn compiler_path(&self) -> &Path {
        &self.compiler
    }

    fn find_library_file(&self, dirs: &[String], lib: &str) -> Option<PathBuf> {
        if let Some(path) = self.libraries.get(lib) {
            return Some(path.clone());
        }
        find_library_in_dirs(dirs, lib, &self.platform)
    }

    fn build(
        &self,
        candidate: &ModuleCandidate,
        _dirs: &CompilerDirs,
        layout: &BuildLayout,
    ) -> Result<PathBuf, BuildError> {
        if self.failing.contains(&candidate.name) {
            return Err(BuildError::Compile {
                source_file: candidate.sources.first().cloned().unwrap_or_default(),
                stderr: "error: scripted failure".to_string(),
            });
        }

        let artifact = layout.artifact_path(&candidate.name);
        if let Some(parent) = artifact.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::Other(e.into()))?;
        }
        std::fs::write(&artifact, b"\x7fELF").map_err(|e| BuildError::Other(e.into()))?;

        if let Ok(mut log) = self.log.lock() {
            log.push(candidate.name.clone());
        }
        Ok(artifact)
    }

    fn needed_libraries(&self, _library: &Path, _scratch: &Path) -> Option<Vec<String>> {
        self.needed.clone()
    }

    fn architectures(&self, _binary: &Path, _scratch: &Path) -> Option<Vec<String>> {
        self.architectures.clone()
    }
}

/// Loader with scripted outcomes per module.
#[derive(Debug, Default)]
pub struct FakeLoader {
    import_failures: Vec<String>,
    other_failures: Vec<String>,
    loaded: Mutex<Vec<String>>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make loading `module` fail as an import error.
    pub fn failing_import(mut self, module: impl Into<String>) -> Self {
        self.import_failures.push(module.into());
        self
    }

    /// Make loading `module` fail with an unexpected error.
    pub fn failing_other(mut self, module: impl Into<String>) -> Self {
        self.other_failures.push(module.into());
        self
    }

    /// Modules a load was attempted for.
    pub fn attempts(&self) -> Vec<String> {
        self.loaded.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl Loader for FakeLoader {
    fn load(&self, module: &str, _artifact: &Path) -> Result<(), LoadError> {
        if let Ok(mut loaded) = self.loaded.lock() {
            loaded.push(module.to_string());
        }
        if self.import_failures.iter().any(|m| m == module) {
            return Err(LoadError::Import(format!("undefined symbol in {}", module)));
        }
        if self.other_failures.iter().any(|m| m == module) {
            return Err(LoadError::Other(anyhow::anyhow!("loader crashed on {}", module)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fake_toolchain_writes_artifact() {
        let tmp = TempDir::new().unwrap();
        let layout = BuildLayout::new(tmp.path(), tmp.path(), tmp.path().join("build"));
        let toolchain = FakeToolchain::new(PlatformProfile::new("linux"));
        let candidate = ModuleCandidate::new("math", ["mathmodule.c"]);

        let artifact = toolchain
            .build(&candidate, &CompilerDirs::default(), &layout)
            .unwrap();

        assert!(artifact.exists());
        assert_eq!(toolchain.build_log(), ["math"]);
    }

    #[test]
    fn test_fake_loader_outcomes() {
        let loader = FakeLoader::new().failing_import("a").failing_other("b");
        assert!(matches!(loader.load("a", Path::new("a.so")), Err(LoadError::Import(_))));
        assert!(matches!(loader.load("b", Path::new("b.so")), Err(LoadError::Other(_))));
        assert!(loader.load("c", Path::new("c.so")).is_ok());
        assert_eq!(loader.attempts(), ["a", "b", "c"]);
    }
}
