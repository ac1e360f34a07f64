//! TLS and OpenSSL-backed hashing: `_ssl` and `_hashlib`.
//!
//! Configure already ran the OpenSSL probe, so the flags come from the
//! config store: `OPENSSL_INCLUDES` holds `-I` options only,
//! `OPENSSL_LDFLAGS` only `-L` and `OPENSSL_LIBS` only `-l`.

use crate::core::candidate::ModuleCandidate;
use crate::core::flags::split_on_flag;
use crate::util::diagnostic::ConfigError;

use super::DetectionContext;

/// Value of the link-mode environment switch selecting static OpenSSL.
pub const STATIC_BUILD: &str = "static";

pub fn detect_openssl_hashlib(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    let includes = split_on_flag(&ctx.config.get_str_or_empty("OPENSSL_INCLUDES"), "-I");
    let libdirs = split_on_flag(&ctx.config.get_str_or_empty("OPENSSL_LDFLAGS"), "-L");
    let libs = split_on_flag(&ctx.config.get_str_or_empty("OPENSSL_LIBS"), "-l");

    if libs.is_empty() {
        tracing::debug!("configure found no OpenSSL libraries");
        ctx.missing("_ssl");
        ctx.missing("_hashlib");
        return Ok(());
    }

    if ctx.find_header("openssl/ssl.h", &includes).is_none() {
        tracing::debug!("openssl/ssl.h not found");
        ctx.missing("_ssl");
        ctx.missing("_hashlib");
        return Ok(());
    }

    let runtime_dirs = match ctx.config.get_nonempty("OPENSSL_RPATH").as_deref() {
        Some("auto") => libdirs.clone(),
        Some(rpath) => vec![rpath.to_string()],
        None => Vec::new(),
    };

    let is_static = ctx.env.openssl_build.as_deref() == Some(STATIC_BUILD);
    let openssl_options = |candidate: ModuleCandidate| {
        let candidate = candidate
            .include_dirs(includes.iter().cloned())
            .library_dirs(libdirs.iter().cloned())
            .runtime_library_dirs(runtime_dirs.iter().cloned());

        if is_static {
            // Unsupported mode: link the archives and keep their symbols
            // private; zlib covers compression-enabled builds.
            let link_args = libs.iter().flat_map(|lib| {
                [
                    format!("-l:lib{}.a", lib),
                    format!("-Wl,--exclude-libs,lib{}.a", lib),
                ]
            });
            candidate.link_args(link_args).library("z")
        } else {
            candidate.libraries(libs.iter().cloned())
        }
    };

    ctx.add(openssl_options(ModuleCandidate::new("_ssl", ["_ssl.c"])));
    ctx.add(openssl_options(ModuleCandidate::new(
        "_hashlib",
        ["_hashopenssl.c"],
    )));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::candidate::Disposition;
    use crate::core::platform::PlatformProfile;
    use crate::test_support::{FakeToolchain, HermeticHost};
    use crate::util::config::HostEnv;

    #[test]
    fn test_no_libs_means_both_missing() {
        let host = HermeticHost::new();
        host.add_header("openssl/ssl.h");
        let platform = PlatformProfile::new("linux");
        let config = host.config();
        let env = HostEnv::default();
        let toolchain = FakeToolchain::new(platform.clone());
        let mut ctx = host.context(&platform, &config, &env, &toolchain);

        detect_openssl_hashlib(&mut ctx).unwrap();

        assert_eq!(
            ctx.registry.names_with(Disposition::MissingDependency),
            ["_ssl", "_hashlib"]
        );
    }

    #[test]
    fn test_no_header_means_both_missing() {
        let host = HermeticHost::new();
        let platform = PlatformProfile::new("linux");
        let mut config = host.config();
        config.set_str("OPENSSL_LIBS", "-lssl -lcrypto");
        let env = HostEnv::default();
        let toolchain = FakeToolchain::new(platform.clone());
        let mut ctx = host.context(&platform, &config, &env, &toolchain);

        detect_openssl_hashlib(&mut ctx).unwrap();

        assert_eq!(ctx.registry.selected().count(), 0);
        assert_eq!(ctx.registry.len(), 2);
    }

    #[test]
    fn test_custom_prefix_with_auto_rpath() {
        let host = HermeticHost::new();
        let inc = host.add_file("opt/ssl/include/openssl/ssl.h");
        let inc = inc.parent().unwrap().parent().unwrap().to_string_lossy().into_owned();
        let platform = PlatformProfile::new("linux");
        let mut config = host.config();
        config.set_str("OPENSSL_INCLUDES", format!("-I{}", inc));
        config.set_str("OPENSSL_LDFLAGS", "-L/opt/ssl/lib");
        config.set_str("OPENSSL_LIBS", "-lssl -lcrypto");
        config.set_str("OPENSSL_RPATH", "auto");
        let env = HostEnv::default();
        let toolchain = FakeToolchain::new(platform.clone());
        let mut ctx = host.context(&platform, &config, &env, &toolchain);

        detect_openssl_hashlib(&mut ctx).unwrap();

        let ssl = ctx.registry.get("_ssl").unwrap();
        assert!(ssl.is_selected());
        assert_eq!(ssl.include_dirs, [inc.clone()]);
        assert_eq!(ssl.libraries, ["ssl", "crypto"]);
        assert_eq!(ssl.runtime_library_dirs, ["/opt/ssl/lib"]);
        assert_eq!(ctx.registry.get("_hashlib").unwrap().sources, ["_hashopenssl.c"]);
    }

    #[test]
    fn test_static_link_mode() {
        let host = HermeticHost::new();
        host.add_header("openssl/ssl.h");
        let platform = PlatformProfile::new("linux");
        let mut config = host.config();
        config.set_str("OPENSSL_LIBS", "-lssl -lcrypto");
        let env = HostEnv {
            openssl_build: Some(STATIC_BUILD.to_string()),
            ..Default::default()
        };
        let toolchain = FakeToolchain::new(platform.clone());
        let mut ctx = host.context(&platform, &config, &env, &toolchain);

        detect_openssl_hashlib(&mut ctx).unwrap();

        let hashlib = ctx.registry.get("_hashlib").unwrap();
        assert_eq!(hashlib.libraries, ["z"]);
        assert_eq!(
            hashlib.extra_link_args,
            [
                "-l:libssl.a",
                "-Wl,--exclude-libs,libssl.a",
                "-l:libcrypto.a",
                "-Wl,--exclude-libs,libcrypto.a"
            ]
        );
        assert!(hashlib.runtime_library_dirs.is_empty());
    }
}
