//! Toolchain detection functions.

use std::path::{Path, PathBuf};

use crate::core::flags::split_words;
use crate::core::platform::PlatformProfile;
use crate::util::config::{ConfigStore, HostEnv};
use crate::util::process::{find_c_compiler, find_executable, ProcessBuilder};

use super::{GccToolchain, Toolchain, ToolchainPlatform};

/// Detect the toolchain used to build candidates.
///
/// Tries to find a C compiler with the following priority:
/// 1. `CC` from the host environment
/// 2. `CC` from the config store
/// 3. cc/gcc/clang on PATH
///
/// Never fails: with nothing found, `cc` is assumed and any build simply
/// reports a failure per module.
pub fn detect_toolchain(
    config: &ConfigStore,
    env: &HostEnv,
    platform: &PlatformProfile,
) -> Box<dyn Toolchain> {
    let command = compiler_command(config, env);

    let mut words = split_words(&command)
        .unwrap_or_else(|| command.split_whitespace().map(str::to_string).collect())
        .into_iter();
    let program = words.next().unwrap_or_else(|| "cc".to_string());
    let cc_args: Vec<String> = words.collect();

    let cc = find_executable(&program).unwrap_or_else(|| PathBuf::from(&program));
    let family = detect_compiler_family(&cc);

    let mut compile_flags = config_words(config, "CCSHARED");
    compile_flags.extend(config_words(config, "CFLAGS"));
    let link_flags = config_words(config, "LDSHARED_FLAGS");

    tracing::debug!(
        "using {} toolchain: {} {}",
        family.as_str(),
        cc.display(),
        cc_args.join(" ")
    );

    let readelf = config
        .get_nonempty("READELF")
        .unwrap_or_else(|| "readelf".to_string());

    Box::new(
        GccToolchain::new(cc, family, platform.clone())
            .with_cc_args(cc_args)
            .with_flags(compile_flags, link_flags)
            .with_readelf(readelf),
    )
}

/// The compiler command line, in detection priority order.
pub fn compiler_command(config: &ConfigStore, env: &HostEnv) -> String {
    env.cc
        .clone()
        .filter(|cc| !cc.trim().is_empty())
        .or_else(|| config.get_nonempty("CC"))
        .or_else(|| find_c_compiler().map(|p| p.display().to_string()))
        .unwrap_or_else(|| "cc".to_string())
}

fn config_words(config: &ConfigStore, key: &str) -> Vec<String> {
    config
        .get_str_or_empty(key)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Detect the compiler family from its name, then from `--version`.
pub fn detect_compiler_family(cc: &Path) -> ToolchainPlatform {
    // Check binary name first
    let name = cc
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();

    if name.contains("clang") {
        return detect_clang_variant(cc);
    } else if name.contains("gcc") {
        return ToolchainPlatform::Gcc;
    }

    if let Some(version) = version_output(cc) {
        if version.contains("clang") {
            return if version.contains("apple") {
                ToolchainPlatform::AppleClang
            } else {
                ToolchainPlatform::Clang
            };
        }
    }

    // Default to GCC
    ToolchainPlatform::Gcc
}

/// Detect if Clang is Apple Clang or regular Clang.
fn detect_clang_variant(cc: &Path) -> ToolchainPlatform {
    match version_output(cc) {
        Some(version) if version.contains("apple") => ToolchainPlatform::AppleClang,
        _ => ToolchainPlatform::Clang,
    }
}

fn version_output(cc: &Path) -> Option<String> {
    let output = ProcessBuilder::new(cc).arg("--version").exec().ok()?;
    Some(String::from_utf8_lossy(&output.stdout).to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_name() {
        assert_eq!(
            detect_compiler_family(Path::new("/nonexistent/x86_64-linux-gnu-gcc")),
            ToolchainPlatform::Gcc
        );
        assert_eq!(
            detect_compiler_family(Path::new("/nonexistent/clang")),
            ToolchainPlatform::Clang
        );
        assert_eq!(
            detect_compiler_family(Path::new("/nonexistent/cc")),
            ToolchainPlatform::Gcc
        );
    }

    #[test]
    fn test_detect_prefers_env_cc() {
        let mut config = ConfigStore::new();
        config.set_str("CC", "/nonexistent/config-cc");
        let env = HostEnv {
            cc: Some("/nonexistent/env-gcc -pthread".to_string()),
            ..Default::default()
        };

        let toolchain = detect_toolchain(&config, &env, &PlatformProfile::new("linux"));

        assert_eq!(toolchain.compiler_path(), Path::new("/nonexistent/env-gcc"));
        assert_eq!(toolchain.platform(), ToolchainPlatform::Gcc);
    }

    #[test]
    fn test_detect_falls_back_to_config_cc() {
        let mut config = ConfigStore::new();
        config.set_str("CC", "/nonexistent/cc");

        let toolchain =
            detect_toolchain(&config, &HostEnv::default(), &PlatformProfile::new("linux"));

        assert_eq!(toolchain.compiler_path(), Path::new("/nonexistent/cc"));
    }
}
