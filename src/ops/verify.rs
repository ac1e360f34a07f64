//! Import verification of built artifacts.
//!
//! Every artifact the toolchain produced is loaded once in isolation. An
//! artifact that can't be loaded is renamed out of the way so the runtime
//! never picks it up; the module is reported as import-failed.

use std::path::{Path, PathBuf};

use anyhow::Context;
use thiserror::Error;

use crate::core::candidate::{Disposition, ModuleCandidate};
use crate::core::platform::PlatformProfile;
use crate::core::registry::Registry;
use crate::util::config::ConfigStore;
use crate::util::fs::quarantine;

/// Why an artifact could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The loader rejected the artifact (unresolved symbols, bad format,
    /// missing init entry point).
    #[error("{0}")]
    Import(String),

    /// Something unrelated to the artifact itself went wrong.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Loads a built artifact to prove it is usable.
pub trait Loader: Sync {
    fn load(&self, module: &str, artifact: &Path) -> Result<(), LoadError>;
}

/// Loader backed by the platform's dynamic linker.
#[derive(Debug, Clone, Default)]
pub struct DylibLoader {
    init_symbol_prefix: Option<String>,
}

impl DylibLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also require the `<prefix><last name component>` entry point.
    pub fn with_init_symbol_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.init_symbol_prefix = Some(prefix.into());
        self
    }

    /// Configure from the store's `INIT_SYMBOL_PREFIX`.
    pub fn from_config(config: &ConfigStore) -> Self {
        DylibLoader {
            init_symbol_prefix: config.get_nonempty("INIT_SYMBOL_PREFIX"),
        }
    }

    /// The entry point symbol required for `module`, if any.
    pub fn init_symbol(&self, module: &str) -> Option<String> {
        let prefix = self.init_symbol_prefix.as_deref()?;
        let last = module.rsplit('.').next().unwrap_or(module);
        Some(format!("{}{}", prefix, last))
    }
}

impl Loader for DylibLoader {
    fn load(&self, module: &str, artifact: &Path) -> Result<(), LoadError> {
        std::fs::metadata(artifact)
            .with_context(|| format!("failed to stat artifact `{}`", artifact.display()))?;

        // SAFETY: the artifact was just built from the runtime's own module
        // sources; its initializers are the ones the runtime would run.
        let library = unsafe { libloading::Library::new(artifact) }
            .map_err(|e| LoadError::Import(e.to_string()))?;

        if let Some(symbol) = self.init_symbol(module) {
            // SAFETY: the symbol is only looked up, never called.
            let found = unsafe { library.get::<*const ()>(symbol.as_bytes()) };
            if let Err(e) = found {
                return Err(LoadError::Import(format!(
                    "missing entry point `{}`: {}",
                    symbol, e
                )));
            }
        }

        library
            .close()
            .map_err(|e| LoadError::Other(anyhow::anyhow!("failed to unload `{}`: {}", module, e)))
    }
}

/// What the verifier decided.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyOutcome {
    /// Loaded fine
    pub verified: Vec<String>,
    /// Not checked
    pub skipped: Vec<String>,
    /// Load failed; artifact quarantined
    pub import_failed: Vec<String>,
    /// Unexpected failure during load; artifact left in place
    pub failed: Vec<String>,
}

/// Why a module's import check is skipped, if it is.
fn skip_reason(candidate: &ModuleCandidate, platform: &PlatformProfile) -> Option<&'static str> {
    if candidate.disposition == Disposition::BuildFailed {
        return Some("it failed to build");
    }
    if candidate.extra_link_args.iter().any(|a| a == "Carbon") {
        return Some("it links the Carbon framework");
    }
    if platform.is_apple() && targets_foreign_arch(&candidate.extra_link_args) {
        return Some("it was built for another architecture");
    }
    if platform.is_cygwin() {
        return Some("loading is unreliable on cygwin");
    }
    None
}

/// Whether link args name an `-arch` other than the running process's.
fn targets_foreign_arch(link_args: &[String]) -> bool {
    let running = match std::env::consts::ARCH {
        "aarch64" => "arm64",
        other => other,
    };
    link_args
        .windows(2)
        .any(|pair| pair[0] == "-arch" && pair[1] != running)
}

/// Load every built artifact and reclassify the modules that fail.
///
/// `built` pairs module names with the artifacts the toolchain produced.
/// On a cross build nothing can be loaded and every module is skipped.
pub fn verify_imports(
    registry: &mut Registry,
    built: &[(String, PathBuf)],
    platform: &PlatformProfile,
    loader: &dyn Loader,
) -> anyhow::Result<VerifyOutcome> {
    let mut outcome = VerifyOutcome::default();

    for (name, artifact) in built {
        let Some(candidate) = registry.get_mut(name) else {
            continue;
        };

        if platform.is_cross() {
            outcome.skipped.push(name.clone());
            continue;
        }
        if let Some(reason) = skip_reason(candidate, platform) {
            tracing::warn!("skipping import check for `{}`: {}", name, reason);
            outcome.skipped.push(name.clone());
            continue;
        }

        match loader.load(name, artifact) {
            Ok(()) => {
                tracing::debug!("module `{}` imports", name);
                outcome.verified.push(name.clone());
            }
            Err(LoadError::Import(message)) => {
                tracing::warn!("module `{}` built but can't be imported: {}", name, message);
                let moved = quarantine(artifact)?;
                tracing::warn!("renamed {} to {}", artifact.display(), moved.display());
                candidate.disposition = Disposition::ImportFailed;
                outcome.import_failed.push(name.clone());
            }
            Err(LoadError::Other(e)) => {
                tracing::warn!("import check of `{}` failed: {:#}", name, e);
                candidate.disposition = Disposition::BuildFailed;
                outcome.failed.push(name.clone());
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeLoader;
    use crate::util::fs::quarantine_path;
    use tempfile::TempDir;

    fn built(tmp: &TempDir, registry: &mut Registry, names: &[&str]) -> Vec<(String, PathBuf)> {
        names
            .iter()
            .map(|name| {
                registry.register(ModuleCandidate::new(*name, [format!("{}.c", name)]));
                let artifact = tmp.path().join(format!("{}.so", name));
                std::fs::write(&artifact, "").unwrap();
                (name.to_string(), artifact)
            })
            .collect()
    }

    #[test]
    fn test_import_failure_quarantines_artifact() {
        let tmp = TempDir::new().unwrap();
        let mut registry = Registry::new();
        let built = built(&tmp, &mut registry, &["math", "_broken"]);
        let stale = quarantine_path(&built[1].1);
        std::fs::write(&stale, "previous").unwrap();
        let loader = FakeLoader::new().failing_import("_broken");

        let outcome =
            verify_imports(&mut registry, &built, &PlatformProfile::new("linux"), &loader).unwrap();

        assert_eq!(outcome.verified, ["math"]);
        assert_eq!(outcome.import_failed, ["_broken"]);
        assert!(!built[1].1.exists());
        assert!(stale.exists());
        assert_eq!(std::fs::read_to_string(&stale).unwrap(), "");
        assert_eq!(
            registry.get("_broken").unwrap().disposition,
            Disposition::ImportFailed
        );
    }

    #[test]
    fn test_other_failure_keeps_artifact() {
        let tmp = TempDir::new().unwrap();
        let mut registry = Registry::new();
        let built = built(&tmp, &mut registry, &["_odd"]);
        let loader = FakeLoader::new().failing_other("_odd");

        let outcome =
            verify_imports(&mut registry, &built, &PlatformProfile::new("linux"), &loader).unwrap();

        assert_eq!(outcome.failed, ["_odd"]);
        assert!(built[0].1.exists());
        assert_eq!(registry.get("_odd").unwrap().disposition, Disposition::BuildFailed);
    }

    #[test]
    fn test_cross_build_loads_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut registry = Registry::new();
        let built = built(&tmp, &mut registry, &["math"]);
        let loader = FakeLoader::new();

        let outcome = verify_imports(
            &mut registry,
            &built,
            &PlatformProfile::new("linux").cross(),
            &loader,
        )
        .unwrap();

        assert_eq!(outcome.skipped, ["math"]);
        assert!(loader.attempts().is_empty());
    }

    #[test]
    fn test_cygwin_and_carbon_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let mut registry = Registry::new();
        let built = built(&tmp, &mut registry, &["math", "_tkinter"]);
        registry.get_mut("_tkinter").unwrap().extra_link_args =
            vec!["-framework".to_string(), "Carbon".to_string()];
        let loader = FakeLoader::new();

        let outcome =
            verify_imports(&mut registry, &built, &PlatformProfile::new("darwin"), &loader).unwrap();
        assert_eq!(outcome.skipped, ["_tkinter"]);
        assert_eq!(loader.attempts(), ["math"]);

        let loader = FakeLoader::new();
        let outcome =
            verify_imports(&mut registry, &built, &PlatformProfile::new("cygwin"), &loader).unwrap();
        assert_eq!(outcome.skipped, ["math", "_tkinter"]);
        assert!(loader.attempts().is_empty());
    }

    #[test]
    fn test_foreign_arch_detection() {
        let args = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert!(targets_foreign_arch(&args(&["-arch", "ppc"])));
        assert!(!targets_foreign_arch(&args(&["-framework", "Tk"])));
    }

    #[test]
    fn test_init_symbol_uses_last_component() {
        let loader = DylibLoader::new().with_init_symbol_prefix("modinit_");
        assert_eq!(loader.init_symbol("pkg._speedups").as_deref(), Some("modinit__speedups"));
        assert_eq!(DylibLoader::new().init_symbol("math"), None);
    }

    #[test]
    fn test_dylib_loader_rejects_garbage() {
        let tmp = TempDir::new().unwrap();
        let artifact = tmp.path().join("junk.so");
        std::fs::write(&artifact, "not a shared object").unwrap();

        let result = DylibLoader::new().load("junk", &artifact);
        assert!(matches!(result, Err(LoadError::Import(_))));

        let missing = DylibLoader::new().load("gone", &tmp.path().join("gone.so"));
        assert!(matches!(missing, Err(LoadError::Other(_))));
    }
}
