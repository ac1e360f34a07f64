//! Hermetic build-machine trees.
//!
//! A [`HermeticHost`] is a temporary directory laid out like a small Unix
//! system: `usr/lib`, `usr/include`, a local prefix and a runtime source
//! tree. Detection contexts built from it never look at the real host's
//! libraries or headers, and never probe a compiler.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::builder::env_flags::{ConfigHeader, SearchDirs, SearchRoots};
use crate::builder::toolchain::Toolchain;
use crate::core::platform::PlatformProfile;
use crate::detect::DetectionContext;
use crate::util::config::{ConfigStore, HostEnv};
use crate::util::context::BuildLayout;

const CONFIG_H: &str = "runtime_config.h";

/// A fake build machine in a temporary directory.
#[derive(Debug)]
pub struct HermeticHost {
    tmp: TempDir,
}

impl HermeticHost {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("failed to create temp dir");
        for dir in ["usr/lib", "usr/include", "local", "srcdir/Modules", "scratch"] {
            std::fs::create_dir_all(tmp.path().join(dir)).expect("failed to create fixture dir");
        }
        HermeticHost { tmp }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    /// The system library directory.
    pub fn lib_dir(&self) -> String {
        self.root().join("usr/lib").to_string_lossy().into_owned()
    }

    /// The system include directory.
    pub fn include_dir(&self) -> String {
        self.root().join("usr/include").to_string_lossy().into_owned()
    }

    pub fn srcdir(&self) -> PathBuf {
        self.root().join("srcdir")
    }

    /// Create an empty file at `rel`, with parent directories.
    pub fn add_file(&self, rel: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        std::fs::write(&path, "").expect("failed to write fixture file");
        path
    }

    /// Install `lib<name>.so` in the system library directory.
    pub fn add_library(&self, name: &str) -> PathBuf {
        self.add_library_in("usr/lib", name)
    }

    /// Install `lib<name>.so` in `rel_dir`.
    pub fn add_library_in(&self, rel_dir: &str, name: &str) -> PathBuf {
        self.add_file(&format!("{}/lib{}.so", rel_dir, name))
    }

    /// Install a header under the system include directory.
    pub fn add_header(&self, rel: &str) -> PathBuf {
        self.add_file(&format!("usr/include/{}", rel))
    }

    /// Add a file under the runtime's `Modules` directory.
    pub fn add_source(&self, rel: &str) -> PathBuf {
        self.add_file(&format!("srcdir/Modules/{}", rel))
    }

    /// Write the runtime's configuration header.
    pub fn write_config_h(&self, text: &str) -> PathBuf {
        let path = self.root().join(CONFIG_H);
        std::fs::write(&path, text).expect("failed to write config header");
        path
    }

    /// Search roots confined to the temporary tree.
    pub fn roots(&self) -> SearchRoots {
        SearchRoots {
            local_prefix: self.root().join("local").to_string_lossy().into_owned(),
            system_lib_dirs: vec![self.lib_dir()],
            system_include_dirs: vec![self.include_dir()],
            probe_compiler: false,
        }
    }

    /// A config store pointing at the fixture source tree. The compiler
    /// does not exist, so nothing can accidentally run it.
    pub fn config(&self) -> ConfigStore {
        let mut config = ConfigStore::new();
        config
            .set_str("srcdir", self.srcdir().to_string_lossy())
            .set_str("CC", "/nonexistent/cc");
        config
    }

    /// Output layout under `build/`.
    pub fn layout(&self) -> BuildLayout {
        BuildLayout::new(self.srcdir(), self.root(), self.root().join("build"))
    }

    /// A detection context over this tree.
    ///
    /// The configuration header is read from the fixture when one was
    /// written.
    pub fn context<'a>(
        &self,
        platform: &'a PlatformProfile,
        config: &'a ConfigStore,
        env: &'a HostEnv,
        toolchain: &'a dyn Toolchain,
    ) -> DetectionContext<'a> {
        let scratch = self.root().join("scratch");
        let dirs = SearchDirs::resolve(config, env, platform, &self.roots(), &scratch);

        let config_h_path = self.root().join(CONFIG_H);
        let config_h = if config_h_path.exists() {
            ConfigHeader::load(&config_h_path).expect("failed to read config header")
        } else {
            ConfigHeader::default()
        };

        DetectionContext::new(platform, config, env, toolchain, dirs, config_h, scratch)
    }
}

impl Default for HermeticHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeToolchain;

    #[test]
    fn test_context_sees_only_fixture_dirs() {
        let host = HermeticHost::new();
        let platform = PlatformProfile::new("linux");
        let config = host.config();
        let env = HostEnv::default();
        let toolchain = FakeToolchain::new(platform.clone());

        let ctx = host.context(&platform, &config, &env, &toolchain);

        assert_eq!(ctx.dirs.lib_dirs, [host.lib_dir()]);
        assert_eq!(ctx.dirs.inc_dirs, [host.include_dir()]);
    }

    #[test]
    fn test_config_h_is_loaded() {
        let host = HermeticHost::new();
        host.write_config_h("#define HAVE_GETSPNAM 1\n");
        let platform = PlatformProfile::new("linux");
        let config = host.config();
        let env = HostEnv::default();
        let toolchain = FakeToolchain::new(platform.clone());

        let ctx = host.context(&platform, &config, &env, &toolchain);

        assert!(ctx.config_h.flag("HAVE_GETSPNAM"));
    }
}
