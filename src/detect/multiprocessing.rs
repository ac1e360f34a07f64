//! Process-based parallelism: `_multiprocessing` and `_posixshmem`.

use crate::core::candidate::ModuleCandidate;
use crate::util::diagnostic::ConfigError;

use super::DetectionContext;

const INCLUDE_DIR: &str = "Modules/_multiprocessing";

pub fn detect_multiprocessing(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    let config = ctx.config;
    let windows = ctx.platform.is_windows();

    let mut sources = vec!["_multiprocessing/multiprocessing.c"];
    if windows
        || (config.flag("HAVE_SEM_OPEN") && !config.flag("POSIX_SEMAPHORES_NOT_ENABLED"))
    {
        sources.push("_multiprocessing/semaphore.c");
    }
    ctx.add(ModuleCandidate::new("_multiprocessing", sources).include_dirs([INCLUDE_DIR]));

    if !windows && config.flag("HAVE_SHM_OPEN") && config.flag("HAVE_SHM_UNLINK") {
        let mut shmem = ModuleCandidate::new("_posixshmem", ["_multiprocessing/posixshmem.c"])
            .include_dirs([INCLUDE_DIR]);
        if config.flag("SHM_NEEDS_LIBRT") {
            shmem = shmem.library("rt");
        }
        ctx.add(shmem);
    } else {
        ctx.missing("_posixshmem");
    }

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
    fn test_posix_semaphores_and_shm() {
        let host = HermeticHost::new();
        let mut config = host.config();
        config.set_flag("HAVE_SEM_OPEN", true);
        config.set_flag("HAVE_SHM_OPEN", true);
        config.set_flag("HAVE_SHM_UNLINK", true);
        config.set_flag("SHM_NEEDS_LIBRT", true);
        let platform = PlatformProfile::new("linux");
        let env = HostEnv::default();
        let toolchain = FakeToolchain::new(platform.clone());
        let mut ctx = host.context(&platform, &config, &env, &toolchain);

        detect_multiprocessing(&mut ctx).unwrap();

        let mp = ctx.registry.get("_multiprocessing").unwrap();
        assert_eq!(
            mp.sources,
            ["_multiprocessing/multiprocessing.c", "_multiprocessing/semaphore.c"]
        );
        assert_eq!(mp.include_dirs, [INCLUDE_DIR]);
        assert_eq!(ctx.registry.get("_posixshmem").unwrap().libraries, ["rt"]);
    }

    #[test]
    fn test_semaphores_disabled() {
        let host = HermeticHost::new();
        let mut config = host.config();
        config.set_flag("HAVE_SEM_OPEN", true);
        config.set_flag("POSIX_SEMAPHORES_NOT_ENABLED", true);
        let platform = PlatformProfile::new("linux");
        let env = HostEnv::default();
        let toolchain = FakeToolchain::new(platform.clone());
        let mut ctx = host.context(&platform, &config, &env, &toolchain);

        detect_multiprocessing(&mut ctx).unwrap();

        assert_eq!(
            ctx.registry.get("_multiprocessing").unwrap().sources,
            ["_multiprocessing/multiprocessing.c"]
        );
        assert_eq!(
            ctx.registry.get("_posixshmem").unwrap().disposition,
            Disposition::MissingDependency
        );
    }
}
