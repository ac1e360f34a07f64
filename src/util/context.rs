//! Paths for a single build invocation.
//!
//! Provides centralized access to the source root, the build output
//! directories, and the artifact naming rule.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::ConfigStore;
use crate::util::diagnostic::ConfigError;
use crate::util::fs::absolute;

/// Default suffix of a built add-on module when the store doesn't say.
#[cfg(target_os = "windows")]
pub const DEFAULT_EXT_SUFFIX: &str = ".dll";
#[cfg(not(target_os = "windows"))]
pub const DEFAULT_EXT_SUFFIX: &str = ".so";

/// Directory layout of a build.
#[derive(Debug, Clone)]
pub struct BuildLayout {
    /// Absolute source root (the store's `srcdir`)
    srcdir: PathBuf,

    /// Working directory; the second source root
    cwd: PathBuf,

    /// Where built artifacts go
    build_lib: PathBuf,

    /// Scratch space for objects and probe output
    build_temp: PathBuf,

    /// Artifact filename suffix, e.g. `.x86_64-linux-gnu.so`
    ext_suffix: String,
}

impl BuildLayout {
    /// Resolve the layout from the config store.
    ///
    /// A missing `srcdir` is fatal. `build_lib` and `build_temp` default to
    /// `build/lib` and `build/temp` under the working directory.
    pub fn resolve(
        config: &ConfigStore,
        build_lib: Option<PathBuf>,
        build_temp: Option<PathBuf>,
    ) -> Result<Self> {
        let srcdir = config.get_nonempty("srcdir").ok_or(ConfigError::NoSourceRoot)?;
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        Ok(BuildLayout {
            srcdir: absolute(Path::new(&srcdir)),
            build_lib: build_lib.unwrap_or_else(|| cwd.join("build").join("lib")),
            build_temp: build_temp.unwrap_or_else(|| cwd.join("build").join("temp")),
            ext_suffix: config
                .get_nonempty("EXT_SUFFIX")
                .unwrap_or_else(|| DEFAULT_EXT_SUFFIX.to_string()),
            cwd,
        })
    }

    /// Create a layout from explicit directories.
    pub fn new(srcdir: impl Into<PathBuf>, cwd: impl Into<PathBuf>, out: impl AsRef<Path>) -> Self {
        let out = out.as_ref();
        BuildLayout {
            srcdir: srcdir.into(),
            cwd: cwd.into(),
            build_lib: out.join("lib"),
            build_temp: out.join("temp"),
            ext_suffix: DEFAULT_EXT_SUFFIX.to_string(),
        }
    }

    /// Use a different artifact suffix.
    pub fn with_ext_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.ext_suffix = suffix.into();
        self
    }

    /// Get the source root.
    pub fn srcdir(&self) -> &Path {
        &self.srcdir
    }

    /// Get the working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the artifact output directory.
    pub fn build_lib(&self) -> &Path {
        &self.build_lib
    }

    /// Get the scratch directory.
    pub fn build_temp(&self) -> &Path {
        &self.build_temp
    }

    /// Get the artifact suffix.
    pub fn ext_suffix(&self) -> &str {
        &self.ext_suffix
    }

    /// Directories module sources and dependencies are resolved against:
    /// `<srcdir>/Modules`, then the working directory.
    pub fn source_roots(&self) -> Vec<PathBuf> {
        vec![self.srcdir.join("Modules"), self.cwd.clone()]
    }

    /// Path of the artifact built for a module. Dotted names become
    /// subdirectories.
    pub fn artifact_path(&self, module: &str) -> PathBuf {
        let mut parts: Vec<&str> = module.split('.').collect();
        let last = parts.pop().unwrap_or(module);

        let mut path = self.build_lib.clone();
        for part in parts {
            path.push(part);
        }
        path.join(format!("{}{}", last, self.ext_suffix))
    }

    /// Scratch directory for one module's objects.
    pub fn object_dir(&self, module: &str) -> PathBuf {
        self.build_temp.join(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_requires_srcdir() {
        let config = ConfigStore::new();
        let err = BuildLayout::resolve(&config, None, None).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_resolve_defaults() {
        let mut config = ConfigStore::new();
        config.set_str("srcdir", "/src/runtime");
        config.set_str("EXT_SUFFIX", ".abi3.so");

        let layout = BuildLayout::resolve(&config, None, None).unwrap();

        assert_eq!(layout.srcdir(), Path::new("/src/runtime"));
        assert_eq!(layout.ext_suffix(), ".abi3.so");
        assert!(layout.build_lib().ends_with("build/lib"));
        assert_eq!(layout.source_roots()[0], Path::new("/src/runtime/Modules"));
    }

    #[test]
    fn test_artifact_path() {
        let layout = BuildLayout::new("/src", "/work", "/out");
        assert_eq!(
            layout.artifact_path("math"),
            PathBuf::from(format!("/out/lib/math{}", DEFAULT_EXT_SUFFIX))
        );
        assert_eq!(
            layout.artifact_path("pkg.sub"),
            PathBuf::from(format!("/out/lib/pkg/sub{}", DEFAULT_EXT_SUFFIX))
        );
    }
}
