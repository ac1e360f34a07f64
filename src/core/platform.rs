//! Platform profile.
//!
//! Resolved once per run and read-only afterward. Detectors consult it for
//! the host platform tag, the OS family, whether this is a cross build and,
//! on the apple-like platform, the SDK root that replaces system paths.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::util::config::{ConfigStore, HostEnv};
use crate::util::process::{Capture, ProcessBuilder};

/// The active SDK on the apple-like platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkRoot {
    /// Root directory of the SDK (`/` when headers are installed natively)
    pub root: PathBuf,
    /// Whether the SDK was explicitly selected with `-isysroot`
    pub specified: bool,
}

/// Immutable facts about the platform being built for.
#[derive(Debug, Clone)]
pub struct PlatformProfile {
    host_platform: String,
    cross_compiling: bool,
    sdk: Option<SdkRoot>,
    os_release: Option<u32>,
}

impl PlatformProfile {
    /// Profile for a native build on `host_platform`.
    pub fn new(host_platform: impl Into<String>) -> Self {
        PlatformProfile {
            host_platform: host_platform.into(),
            cross_compiling: false,
            sdk: None,
            os_release: None,
        }
    }

    /// Mark the profile as a cross build.
    pub fn cross(mut self) -> Self {
        self.cross_compiling = true;
        self
    }

    /// Set the SDK root (apple-like platform only).
    pub fn with_sdk(mut self, root: impl Into<PathBuf>, specified: bool) -> Self {
        self.sdk = Some(SdkRoot {
            root: root.into(),
            specified,
        });
        self
    }

    /// Set the OS release major number.
    pub fn with_os_release(mut self, release: u32) -> Self {
        self.os_release = Some(release);
        self
    }

    /// Resolve the profile for this run.
    ///
    /// `BERTH_HOST_PLATFORM` both names the platform and marks a cross
    /// build. On the apple-like platform the SDK root and OS release are
    /// probed; `scratch` receives temporary probe output.
    pub fn resolve(env: &HostEnv, config: &ConfigStore, scratch: &Path) -> Self {
        let (host_platform, cross_compiling) = match env.host_platform.as_deref() {
            Some(platform) if !platform.is_empty() => (platform.to_string(), true),
            _ => (native_platform_tag().to_string(), false),
        };

        let mut profile = PlatformProfile {
            host_platform,
            cross_compiling,
            sdk: None,
            os_release: None,
        };

        if profile.is_apple() {
            let cc = env
                .cc
                .clone()
                .or_else(|| config.get_nonempty("CC"))
                .unwrap_or_else(|| "cc".to_string());
            profile.sdk = Some(resolve_sdk_root(&config.get_str_or_empty("CFLAGS"), &cc, scratch));
            profile.os_release = resolve_os_release(config, scratch);
        }

        tracing::debug!(
            "platform: {} (cross: {}, sdk: {:?})",
            profile.host_platform,
            profile.cross_compiling,
            profile.sdk
        );

        profile
    }

    /// Get the host platform tag (e.g. `linux`, `darwin`, `win32`).
    pub fn host_platform(&self) -> &str {
        &self.host_platform
    }

    /// Check whether this is a cross build.
    pub fn is_cross(&self) -> bool {
        self.cross_compiling
    }

    pub fn is_windows(&self) -> bool {
        self.host_platform == "win32"
    }

    pub fn is_cygwin(&self) -> bool {
        self.host_platform == "cygwin"
    }

    pub fn is_apple(&self) -> bool {
        self.host_platform == "darwin"
    }

    pub fn is_aix(&self) -> bool {
        self.host_platform.starts_with("aix")
    }

    pub fn is_vxworks(&self) -> bool {
        self.host_platform.contains("vxworks")
    }

    /// `freebsd*`, `openbsd*` and friends.
    pub fn is_bsd(&self) -> bool {
        self.host_platform.to_lowercase().contains("bsd")
    }

    /// OS release major number, when known (apple-like platform only).
    pub fn os_release(&self) -> Option<u32> {
        self.os_release
    }

    /// The SDK root, `/` when none is active.
    pub fn sdk_root(&self) -> &Path {
        self.sdk
            .as_ref()
            .map(|sdk| sdk.root.as_path())
            .unwrap_or_else(|| Path::new("/"))
    }

    /// Whether an SDK was explicitly selected.
    pub fn sdk_specified(&self) -> bool {
        self.sdk.as_ref().is_some_and(|sdk| sdk.specified)
    }

    /// Whether `dir` lives inside the system SDK layout.
    pub fn is_sdk_path(dir: &str) -> bool {
        (dir.starts_with("/usr/") && !dir.starts_with("/usr/local"))
            || dir.starts_with("/System/Library")
            || dir.starts_with("/System/iOSSupport")
    }

    /// Where `dir` really is on disk: on the apple-like platform, SDK paths
    /// are moved under the SDK root. Elsewhere the directory is unchanged.
    pub fn sdk_dir(&self, dir: &str) -> PathBuf {
        if self.is_apple() && Self::is_sdk_path(dir) {
            self.sdk_root().join(dir.trim_start_matches('/'))
        } else {
            PathBuf::from(dir)
        }
    }
}

/// Platform tag of the machine running the build.
pub fn native_platform_tag() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        "solaris" | "illumos" => "sunos5",
        os => os,
    }
}

fn resolve_sdk_root(cflags: &str, cc: &str, scratch: &Path) -> SdkRoot {
    let isysroot = Regex::new(r"-isysroot\s*(\S+)").ok();
    if let Some(caps) = isysroot.as_ref().and_then(|re| re.captures(cflags)) {
        let root = caps[1].to_string();
        return SdkRoot {
            specified: root != "/",
            root: PathBuf::from(root),
        };
    }

    let root = ProcessBuilder::from_command_line(cc)
        .map(|pb| pb.args(["-E", "-v", "-"]).stdin_null())
        .and_then(|pb| pb.probe(scratch, Capture::Stderr))
        .and_then(|out| default_sysroot_from_search_list(&out))
        .unwrap_or_else(|| PathBuf::from("/"));

    SdkRoot {
        root,
        specified: false,
    }
}

/// Pick the SDK out of a compiler's verbose include search list.
pub fn default_sysroot_from_search_list(output: &str) -> Option<PathBuf> {
    let mut in_incdirs = false;
    let mut sysroot = None;

    for line in output.lines() {
        if line.starts_with("#include <...>") {
            in_incdirs = true;
        } else if line.starts_with("End of search list") {
            in_incdirs = false;
        } else if in_incdirs {
            let line = line.trim();
            if line == "/usr/include" {
                sysroot = Some(PathBuf::from("/"));
            } else if let Some(root) = line.strip_suffix("/usr/include") {
                if root.ends_with(".sdk") {
                    sysroot = Some(PathBuf::from(root));
                }
            }
        }
    }

    sysroot
}

fn resolve_os_release(config: &ConfigStore, scratch: &Path) -> Option<u32> {
    if let Some(target) = config.get_nonempty("MACOSX_DEPLOYMENT_TARGET") {
        if let Some(version) = parse_version_flexible(&target) {
            if (version.major, version.minor) < (10, 5) {
                return Some(8);
            }
        }
    }

    ProcessBuilder::new("uname")
        .arg("-r")
        .probe(scratch, Capture::Stdout)
        .and_then(|out| parse_version_flexible(&out))
        .and_then(|v| u32::try_from(v.major).ok())
}

/// Parse a version string into semver::Version, handling incomplete versions.
///
/// Handles versions like "21.6.0", "10.4" or "8".
pub fn parse_version_flexible(version_str: &str) -> Option<semver::Version> {
    let clean_version = version_str
        .trim()
        .split(|c: char| !c.is_ascii_digit() && c != '.')
        .next()
        .unwrap_or(version_str);

    if let Ok(v) = clean_version.parse() {
        return Some(v);
    }

    let parts: Vec<&str> = clean_version.split('.').collect();
    let major = parts.first().and_then(|s| s.parse().ok())?;
    let minor = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
    let patch = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);

    Some(semver::Version::new(major, minor, patch))
}
