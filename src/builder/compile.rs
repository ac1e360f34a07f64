//! Compile driver.
//!
//! Hands each selected candidate to the toolchain and collects the
//! artifacts. A failing candidate never stops the others. When the parent
//! make runs with `-j`, independent candidates build in parallel;
//! candidates tagged [`BuildOrder::Last`] still start only after every
//! other candidate finished.

use std::path::PathBuf;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::builder::env_flags::CompilerDirs;
use crate::builder::toolchain::{BuildError, Toolchain};
use crate::core::candidate::{BuildOrder, ModuleCandidate};
use crate::util::context::BuildLayout;

/// What came out of a compile run.
#[derive(Debug, Default)]
pub struct CompileOutcome {
    /// Built modules and their artifacts, in build order
    pub built: Vec<(String, PathBuf)>,
    /// Modules the toolchain could not build
    pub failed: Vec<String>,
}

/// Drives the toolchain over a compile set.
pub struct CompileDriver<'a> {
    toolchain: &'a dyn Toolchain,
    dirs: &'a CompilerDirs,
    layout: &'a BuildLayout,
    parallel: bool,
    progress: bool,
}

impl<'a> CompileDriver<'a> {
    pub fn new(toolchain: &'a dyn Toolchain, dirs: &'a CompilerDirs, layout: &'a BuildLayout) -> Self {
        CompileDriver {
            toolchain,
            dirs,
            layout,
            parallel: false,
            progress: false,
        }
    }

    /// Build independent candidates concurrently.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Show a progress bar on stderr.
    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Build every candidate.
    pub fn run(&self, candidates: &[&ModuleCandidate]) -> CompileOutcome {
        let start = Instant::now();
        let pb = self.progress_bar(candidates.len());

        let (first, last): (Vec<&ModuleCandidate>, Vec<&ModuleCandidate>) = candidates
            .iter()
            .copied()
            .partition(|c| c.order != BuildOrder::Last);

        let mut results = self.build_all(&first, pb.as_ref());
        results.extend(self.build_all(&last, pb.as_ref()));

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        let mut outcome = CompileOutcome::default();
        for (name, result) in results {
            match result {
                Ok(artifact) => outcome.built.push((name, artifact)),
                Err(e) => {
                    tracing::warn!("building module `{}` failed: {}", name, e);
                    outcome.failed.push(name);
                }
            }
        }

        tracing::info!(
            "built {} module(s), {} failed, in {:.2}s",
            outcome.built.len(),
            outcome.failed.len(),
            start.elapsed().as_secs_f64()
        );

        outcome
    }

    fn build_all(
        &self,
        candidates: &[&ModuleCandidate],
        pb: Option<&ProgressBar>,
    ) -> Vec<(String, Result<PathBuf, BuildError>)> {
        let build = |candidate: &&ModuleCandidate| {
            tracing::debug!("building module `{}`", candidate.name);
            let result = self.toolchain.build(candidate, self.dirs, self.layout);
            if let Some(pb) = pb {
                pb.set_message(candidate.name.clone());
                pb.inc(1);
            }
            (candidate.name.clone(), result)
        };

        if self.parallel {
            candidates.par_iter().map(build).collect()
        } else {
            candidates.iter().map(build).collect()
        }
    }

    fn progress_bar(&self, total: usize) -> Option<ProgressBar> {
        if !self.progress || total < 2 {
            return None;
        }

        let pb = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::PlatformProfile;
    use crate::test_support::FakeToolchain;
    use tempfile::TempDir;

    fn candidates() -> Vec<ModuleCandidate> {
        vec![
            ModuleCandidate::new("_ctypes", ["_ctypes/_ctypes.c"]).build_last(),
            ModuleCandidate::new("math", ["mathmodule.c"]),
            ModuleCandidate::new("_broken", ["broken.c"]),
            ModuleCandidate::new("array", ["arraymodule.c"]),
        ]
    }

    #[test]
    fn test_run_collects_failures() {
        let tmp = TempDir::new().unwrap();
        let layout = BuildLayout::new(tmp.path(), tmp.path(), tmp.path().join("build"));
        let toolchain = FakeToolchain::new(PlatformProfile::new("linux")).failing("_broken");
        let dirs = CompilerDirs::default();
        let all = candidates();
        let refs: Vec<&ModuleCandidate> = all.iter().collect();

        let outcome = CompileDriver::new(&toolchain, &dirs, &layout).run(&refs);

        let built: Vec<&str> = outcome.built.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(built, ["math", "array", "_ctypes"]);
        assert_eq!(outcome.failed, ["_broken"]);
        assert!(outcome.built.iter().all(|(_, path)| path.exists()));
    }

    #[test]
    fn test_parallel_keeps_last_after_rest() {
        let tmp = TempDir::new().unwrap();
        let layout = BuildLayout::new(tmp.path(), tmp.path(), tmp.path().join("build"));
        let toolchain = FakeToolchain::new(PlatformProfile::new("linux"));
        let dirs = CompilerDirs::default();
        let all = candidates();
        let refs: Vec<&ModuleCandidate> = all.iter().collect();

        let outcome = CompileDriver::new(&toolchain, &dirs, &layout)
            .parallel(true)
            .run(&refs);

        assert_eq!(outcome.built.len(), 4);
        assert_eq!(outcome.built.last().unwrap().0, "_ctypes");
        assert_eq!(toolchain.build_log().last().unwrap(), "_ctypes");
    }
}
