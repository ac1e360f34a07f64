//! The whole run: detect, reconcile, build, verify, summarize.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::builder::compile::CompileDriver;
use crate::builder::env_flags::{CompilerDirs, ConfigHeader, SearchDirs, SearchRoots};
use crate::builder::toolchain::{detect_toolchain, Toolchain};
use crate::core::candidate::{Disposition, ModuleCandidate};
use crate::core::platform::PlatformProfile;
use crate::core::registry::Registry;
use crate::detect::{detect_modules, DetectionContext, KNOWN_MODULES};
use crate::ops::reconcile::{reconcile, BuildState};
use crate::ops::report::Summary;
use crate::ops::verify::{verify_imports, Loader};
use crate::util::config::{ConfigStore, HostEnv};
use crate::util::context::BuildLayout;
use crate::util::diagnostic::ConfigError;
use crate::util::fs::{ensure_dir, glob_in};

/// How far the run goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Detect, then build and verify
    Build,
    /// Detect only; the global blacklist is not applied
    List,
}

/// Directory overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub build_lib: Option<PathBuf>,
    pub build_temp: Option<PathBuf>,
}

/// Fail when `TZPATH` has a relative entry.
pub fn validate_tzpath(config: &ConfigStore) -> Result<(), ConfigError> {
    let Some(tzpath) = config.get_nonempty("TZPATH") else {
        return Ok(());
    };
    let paths: Vec<String> = tzpath.split(':').map(str::to_string).collect();
    let invalid: Vec<String> = paths
        .iter()
        .filter(|p| !Path::new(p).is_absolute())
        .cloned()
        .collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::RelativeTzPath { paths, invalid })
    }
}

/// The runtime's headers every candidate depends on: the configuration
/// header plus every header in the runtime include directory and its
/// immediate subdirectories.
pub fn runtime_headers(config: &ConfigStore) -> Vec<String> {
    let mut headers: Vec<String> = config.get_nonempty("CONFIG_H").into_iter().collect();
    if let Some(include) = config.get_nonempty("RUNTIME_INCLUDE_DIR") {
        let include = Path::new(&include);
        headers.extend(
            glob_in(include, "*.h")
                .into_iter()
                .chain(glob_in(include, "*/*.h"))
                .map(|p| p.to_string_lossy().into_owned()),
        );
    }
    headers
}

/// Result of the detection phase.
#[derive(Debug)]
pub struct Detection {
    pub registry: Registry,
    /// Directories every candidate is compiled with
    pub compiler: CompilerDirs,
}

impl Detection {
    /// Names for list mode: the compile set, then the missing modules.
    pub fn list(&self) -> Vec<String> {
        self.registry
            .selected()
            .map(|c| c.name.clone())
            .chain(self.registry.names_with(Disposition::MissingDependency))
            .collect()
    }
}

/// JSON build plan.
#[derive(Debug, Serialize)]
pub struct Plan<'a> {
    pub host_platform: &'a str,
    pub cross_compiling: bool,
    pub build_lib: &'a Path,
    pub ext_suffix: &'a str,
    pub compiler: &'a CompilerDirs,
    pub modules: &'a [ModuleCandidate],
}

/// One run against a config store.
pub struct Pipeline {
    config: ConfigStore,
    env: HostEnv,
    platform: PlatformProfile,
    layout: BuildLayout,
    roots: SearchRoots,
    toolchain: Box<dyn Toolchain>,
}

impl Pipeline {
    /// Validate the store and resolve the platform, layout and toolchain.
    pub fn new(config: ConfigStore, env: HostEnv, options: &PipelineOptions) -> Result<Self> {
        validate_tzpath(&config)?;
        let layout = BuildLayout::resolve(&config, options.build_lib.clone(), options.build_temp.clone())?;
        ensure_dir(layout.build_temp())?;

        let platform = PlatformProfile::resolve(&env, &config, layout.build_temp());
        let toolchain = detect_toolchain(&config, &env, &platform);

        Ok(Self::from_parts(config, env, platform, layout, toolchain, SearchRoots::default()))
    }

    /// Assemble a pipeline from already-resolved parts.
    pub fn from_parts(
        mut config: ConfigStore,
        env: HostEnv,
        platform: PlatformProfile,
        layout: BuildLayout,
        toolchain: Box<dyn Toolchain>,
        roots: SearchRoots,
    ) -> Self {
        config.validate_modules(KNOWN_MODULES.iter().copied());
        Pipeline {
            config,
            env,
            platform,
            layout,
            roots,
            toolchain,
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn env(&self) -> &HostEnv {
        &self.env
    }

    pub fn platform(&self) -> &PlatformProfile {
        &self.platform
    }

    pub fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    pub fn toolchain(&self) -> &dyn Toolchain {
        self.toolchain.as_ref()
    }

    /// Run every detector and finalize the registry.
    pub fn detect(&self, mode: Mode) -> Result<Detection> {
        let scratch = self.layout.build_temp();
        ensure_dir(scratch)?;

        let dirs = SearchDirs::resolve(&self.config, &self.env, &self.platform, &self.roots, scratch);
        let config_h = match self.config.get_nonempty("CONFIG_H") {
            Some(path) => ConfigHeader::load(Path::new(&path))?,
            None => ConfigHeader::default(),
        };

        let mut ctx = DetectionContext::new(
            &self.platform,
            &self.config,
            &self.env,
            self.toolchain.as_ref(),
            dirs,
            config_h,
            scratch,
        );
        detect_modules(&mut ctx)?;

        let compiler = ctx.dirs.compiler.clone();
        let mut registry = ctx.registry;

        let disabled = if mode == Mode::List {
            Vec::new()
        } else {
            self.config.get_list("DISABLED_MODULES")
        };
        registry.exclude_disabled_by_name(&disabled);
        registry.rewrite_paths(
            &self.layout.source_roots(),
            &runtime_headers(&self.config),
            &self.config,
        );

        Ok(Detection { registry, compiler })
    }

    /// The build plan for a detection result.
    pub fn plan<'a>(&'a self, detection: &'a Detection) -> Plan<'a> {
        Plan {
            host_platform: self.platform.host_platform(),
            cross_compiling: self.platform.is_cross(),
            build_lib: self.layout.build_lib(),
            ext_suffix: self.layout.ext_suffix(),
            compiler: &detection.compiler,
            modules: detection.registry.as_slice(),
        }
    }

    /// Reconcile, compile and verify, and summarize the outcome.
    pub fn build(&self, detection: Detection, loader: &dyn Loader, progress: bool) -> Result<Summary> {
        let Detection {
            mut registry,
            compiler,
        } = detection;

        let state = BuildState::from_config(&self.config);
        let reconciled = reconcile(&mut registry, &state, &self.layout)?;
        ensure_dir(self.layout.build_lib())?;

        let outcome = {
            let compile_set: Vec<&ModuleCandidate> = registry.selected().collect();
            tracing::info!("building {} module(s)", compile_set.len());
            CompileDriver::new(self.toolchain.as_ref(), &compiler, &self.layout)
                .parallel(self.env.parallel())
                .progress(progress)
                .run(&compile_set)
        };

        for name in &outcome.failed {
            if let Some(candidate) = registry.get_mut(name) {
                candidate.disposition = Disposition::BuildFailed;
            }
        }

        verify_imports(&mut registry, &outcome.built, &self.platform, loader)
            .context("failed to verify built modules")?;

        Ok(Summary::collect(&registry, &reconciled, &self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeLoader, FakeToolchain, HermeticHost};

    fn pipeline(host: &HermeticHost, config: ConfigStore, toolchain: FakeToolchain) -> Pipeline {
        Pipeline::from_parts(
            config,
            HostEnv::default(),
            PlatformProfile::new("linux"),
            host.layout(),
            Box::new(toolchain),
            host.roots(),
        )
    }

    #[test]
    fn test_tzpath_must_be_absolute() {
        let mut config = ConfigStore::new();
        config.set_str("TZPATH", "/usr/share/zoneinfo:zoneinfo");
        match validate_tzpath(&config) {
            Err(ConfigError::RelativeTzPath { invalid, .. }) => assert_eq!(invalid, ["zoneinfo"]),
            other => panic!("unexpected {:?}", other),
        }

        config.set_str("TZPATH", "/usr/share/zoneinfo:/etc/zoneinfo");
        assert!(validate_tzpath(&config).is_ok());
    }

    #[test]
    fn test_missing_srcdir_is_fatal() {
        let result = Pipeline::new(ConfigStore::new(), HostEnv::default(), &PipelineOptions::default());
        let err = match result {
            Ok(_) => panic!("pipeline without srcdir"),
            Err(e) => e,
        };
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NoSourceRoot)
        ));
    }

    #[test]
    fn test_minimal_host_end_to_end() {
        let host = HermeticHost::new();
        host.add_library("m");
        host.add_source("mathmodule.c");
        let platform = PlatformProfile::new("linux");
        let pipeline = pipeline(&host, host.config(), FakeToolchain::new(platform));

        let detection = pipeline.detect(Mode::Build).unwrap();
        let math = detection.registry.get("math").unwrap();
        assert!(math.is_selected());
        assert_eq!(math.libraries, ["m"]);
        assert_eq!(
            math.sources,
            [host.srcdir().join("Modules/mathmodule.c").to_string_lossy().into_owned()]
        );

        let summary = pipeline.build(detection, &FakeLoader::new(), false).unwrap();

        assert!(summary.missing.contains(&"zlib".to_string()));
        assert!(!summary.missing.contains(&"math".to_string()));
        assert!(summary.failed.is_empty());
        assert!(host.layout().artifact_path("math").exists());
    }

    #[test]
    fn test_build_failures_and_import_failures_are_reported() {
        let host = HermeticHost::new();
        let platform = PlatformProfile::new("linux");
        let toolchain = FakeToolchain::new(platform).failing("cmath");
        let pipeline = pipeline(&host, host.config(), toolchain);
        let loader = FakeLoader::new().failing_import("_struct");

        let detection = pipeline.detect(Mode::Build).unwrap();
        let summary = pipeline.build(detection, &loader, false).unwrap();

        assert_eq!(summary.failed, ["cmath"]);
        assert_eq!(summary.import_failed, ["_struct"]);
        assert!(!loader.attempts().contains(&"cmath".to_string()));
    }

    #[test]
    fn test_disabled_modules_only_apply_to_builds() {
        let host = HermeticHost::new();
        let mut config = host.config();
        config.set_str("DISABLED_MODULES", "math array");
        let platform = PlatformProfile::new("linux");
        let pipeline = pipeline(&host, config, FakeToolchain::new(platform));

        let built = pipeline.detect(Mode::Build).unwrap();
        assert!(!built.registry.contains("math"));

        let listed = pipeline.detect(Mode::List).unwrap();
        assert!(listed.list().contains(&"math".to_string()));
    }

    #[test]
    fn test_list_puts_missing_after_compile_set() {
        let host = HermeticHost::new();
        let platform = PlatformProfile::new("linux");
        let pipeline = pipeline(&host, host.config(), FakeToolchain::new(platform));

        let detection = pipeline.detect(Mode::List).unwrap();
        let names = detection.list();

        let zlib = names.iter().position(|n| n == "zlib").unwrap();
        let math = names.iter().position(|n| n == "math").unwrap();
        assert!(math < zlib);
    }

    #[test]
    fn test_unknown_overrides_reach_the_summary() {
        let host = HermeticHost::new();
        let mut config = host.config();
        config.set_module("_nonexistent", Default::default());
        let platform = PlatformProfile::new("linux");
        let pipeline = pipeline(&host, config, FakeToolchain::new(platform));

        let detection = pipeline.detect(Mode::Build).unwrap();
        let summary = pipeline.build(detection, &FakeLoader::new(), false).unwrap();

        assert_eq!(summary.unknown_overrides, ["_nonexistent"]);
    }

    #[test]
    fn test_plan_serializes() {
        let host = HermeticHost::new();
        let platform = PlatformProfile::new("linux");
        let pipeline = pipeline(&host, host.config(), FakeToolchain::new(platform));

        let detection = pipeline.detect(Mode::List).unwrap();
        let json = serde_json::to_value(pipeline.plan(&detection)).unwrap();

        assert_eq!(json["host_platform"], "linux");
        assert!(json["modules"].as_array().unwrap().iter().any(|m| m["name"] == "math"));
    }
}
