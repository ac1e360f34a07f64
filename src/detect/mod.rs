//! Detector routines.
//!
//! Each detector decides, for one module or module family, whether it can
//! be built on this machine and with which options. Detectors run strictly
//! in [`DETECTORS`] order against a single [`DetectionContext`]: later
//! detectors may rely on what earlier ones left in it.
//!
//! A detector never compiles anything. It reads config-store facts, probes
//! the filesystem through the search helpers and the toolchain, and leaves
//! exactly one record per module in the registry: a selected candidate, a
//! missing module, or (silently) a module that doesn't apply here.

use std::path::{Path, PathBuf};

use crate::builder::env_flags::{ConfigHeader, SearchDirs};
use crate::builder::search;
use crate::builder::toolchain::Toolchain;
use crate::core::candidate::ModuleCandidate;
use crate::core::platform::PlatformProfile;
use crate::core::registry::Registry;
use crate::util::config::{ConfigStore, HostEnv};
use crate::util::diagnostic::ConfigError;

pub mod compress;
pub mod ctypes;
pub mod curses;
pub mod dbm;
pub mod multiprocessing;
pub mod nis;
pub mod openssl;
pub mod stdlib;
pub mod tkinter;

/// A detector routine.
pub type Detector = fn(&mut DetectionContext<'_>) -> Result<(), ConfigError>;

/// Every detector, in the order they run.
pub const DETECTORS: &[(&str, Detector)] = &[
    ("simple", stdlib::detect_simple),
    ("test", stdlib::detect_test),
    ("readline/curses", curses::detect_readline_curses),
    ("crypt", stdlib::detect_crypt),
    ("socket", stdlib::detect_socket),
    ("openssl", openssl::detect_openssl_hashlib),
    ("hash builtins", stdlib::detect_hash_builtins),
    ("dbm", dbm::detect_dbm_gdbm),
    ("sqlite", stdlib::detect_sqlite),
    ("platform specific", stdlib::detect_platform_specific),
    ("nis", nis::detect_nis),
    ("compression", compress::detect_compress),
    ("expat", stdlib::detect_expat_elementtree),
    ("cjk codecs", stdlib::detect_multibytecodecs),
    ("decimal", stdlib::detect_decimal),
    ("ctypes", ctypes::detect_ctypes),
    ("multiprocessing", multiprocessing::detect_multiprocessing),
    ("tkinter", tkinter::detect_tkinter),
    ("uuid", stdlib::detect_uuid),
    ("limited api", stdlib::detect_limited_api),
];

/// Every module name a detector can produce.
pub const KNOWN_MODULES: &[&str] = &[
    "_struct", "array", "_contextvars", "math", "cmath", "_datetime", "_zoneinfo",
    "_random", "_bisect", "_heapq", "_pickle", "_json", "_lsprof", "unicodedata",
    "_opcode", "_asyncio", "_queue", "_statistics", "_typing", "fcntl", "grp", "spwd",
    "select", "mmap", "syslog", "_xxsubinterpreters", "audioop", "_csv",
    "_posixsubprocess", "_testcapi", "_testinternalcapi", "_testbuffer",
    "_testimportmultiple", "_testmultiphase", "_xxtestfuzz", "readline", "_curses",
    "_curses_panel", "_crypt", "_socket", "_ssl", "_hashlib", "_md5", "_sha1",
    "_sha256", "_sha512", "_sha3", "_blake2", "_dbm", "_gdbm", "_sqlite3", "termios",
    "resource", "ossaudiodev", "_scproxy", "nis", "zlib", "binascii", "_bz2", "_lzma",
    "pyexpat", "_elementtree", "_multibytecodec", "_codecs_kr", "_codecs_jp",
    "_codecs_cn", "_codecs_tw", "_codecs_hk", "_codecs_iso2022", "_decimal",
    "_ctypes", "_ctypes_test", "_multiprocessing", "_posixshmem", "_tkinter", "_uuid",
    "xxlimited", "xxlimited_35",
];

/// Shared state threaded through every detector.
pub struct DetectionContext<'a> {
    pub platform: &'a PlatformProfile,
    pub config: &'a ConfigStore,
    pub env: &'a HostEnv,
    pub toolchain: &'a dyn Toolchain,
    /// Facts from the runtime's configuration header
    pub config_h: ConfigHeader,
    /// Compiler directories and the header/library search lists
    pub dirs: SearchDirs,
    /// Scratch directory for probe output
    pub scratch: PathBuf,
    pub registry: Registry,
}

impl<'a> DetectionContext<'a> {
    pub fn new(
        platform: &'a PlatformProfile,
        config: &'a ConfigStore,
        env: &'a HostEnv,
        toolchain: &'a dyn Toolchain,
        dirs: SearchDirs,
        config_h: ConfigHeader,
        scratch: impl Into<PathBuf>,
    ) -> Self {
        DetectionContext {
            platform,
            config,
            env,
            toolchain,
            config_h,
            dirs,
            scratch: scratch.into(),
            registry: Registry::new(),
        }
    }

    /// Register a candidate as is.
    pub fn add(&mut self, candidate: ModuleCandidate) {
        self.registry.register(candidate);
    }

    /// Register a candidate through its config-store override.
    pub fn add_ext(&mut self, candidate: ModuleCandidate) -> Result<(), ConfigError> {
        self.registry.add_ext(candidate, self.config)
    }

    /// Record a module whose prerequisites are absent.
    pub fn missing(&mut self, name: &str) {
        self.registry.mark_missing(name);
    }

    /// Record a module that does not apply to this platform.
    pub fn not_applicable(&mut self, name: &str) {
        self.registry.mark_not_applicable(name);
    }

    /// Find `lib` in the library search list.
    pub fn find_library(&self, lib: &str) -> Option<PathBuf> {
        self.toolchain.find_library_file(&self.dirs.lib_dirs, lib)
    }

    /// Find `lib` in arbitrary directories.
    pub fn find_library_in(&self, dirs: &[String], lib: &str) -> Option<PathBuf> {
        self.toolchain.find_library_file(dirs, lib)
    }

    /// Find a header: the standard include list first, then `extra`.
    pub fn find_header(&self, filename: &str, extra: &[String]) -> Option<Vec<String>> {
        search::find_file(self.platform, filename, &self.dirs.inc_dirs, extra)
    }

    /// Whether `path` exists, seen through the SDK root on the apple-like
    /// platform.
    pub fn exists(&self, path: &Path) -> bool {
        self.platform.sdk_dir(&path.to_string_lossy()).exists()
    }
}

/// Run every detector in order.
pub fn detect_modules(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    for (name, detector) in DETECTORS {
        tracing::debug!("running {} detector", name);
        detector(ctx)?;
    }
    tracing::info!("detected {} module(s)", ctx.registry.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::candidate::Disposition;
    use crate::test_support::{FakeToolchain, HermeticHost};

    #[test]
    fn test_known_modules_unique() {
        let mut names = KNOWN_MODULES.to_vec();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), KNOWN_MODULES.len());
    }

    #[test]
    fn test_every_detected_name_is_known() {
        let host = HermeticHost::new();
        host.add_library("m");
        let platform = PlatformProfile::new("linux");
        let config = host.config();
        let env = HostEnv::default();
        let toolchain = FakeToolchain::new(platform.clone());
        let mut ctx = host.context(&platform, &config, &env, &toolchain);

        detect_modules(&mut ctx).unwrap();

        for candidate in ctx.registry.iter() {
            assert!(
                KNOWN_MODULES.contains(&candidate.name.as_str()),
                "unknown module {}",
                candidate.name
            );
        }
    }

    #[test]
    fn test_minimal_host_end_to_end() {
        let host = HermeticHost::new();
        host.add_library("m");
        let platform = PlatformProfile::new("linux");
        let config = host.config();
        let env = HostEnv::default();
        let toolchain = FakeToolchain::new(platform.clone());
        let mut ctx = host.context(&platform, &config, &env, &toolchain);

        detect_modules(&mut ctx).unwrap();

        let math = ctx.registry.get("math").unwrap();
        assert!(math.is_selected());
        assert_eq!(math.libraries, ["m"]);
        assert_eq!(
            ctx.registry.get("zlib").unwrap().disposition,
            Disposition::MissingDependency
        );
        assert!(ctx
            .registry
            .names_with(Disposition::MissingDependency)
            .contains(&"zlib".to_string()));
    }
}
