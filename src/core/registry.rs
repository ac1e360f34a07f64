//! The module registry.
//!
//! Detectors append candidates here in a fixed order. Once detection is
//! done the registry is filtered, stably reordered by [`BuildOrder`], and
//! has its source and dependency paths resolved.
//!
//! [`BuildOrder`]: crate::core::candidate::BuildOrder

use std::path::PathBuf;

use crate::builder::search::find_module_file;
use crate::core::candidate::{DisabledBy, Disposition, ModuleCandidate};
use crate::core::flags::{apply_compile_flags, apply_link_flags, split_words};
use crate::util::config::{ConfigStore, ModuleState};
use crate::util::diagnostic::ConfigError;

/// Ordered collection of every candidate produced during one run.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    candidates: Vec<ModuleCandidate>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate.
    ///
    /// A candidate whose name is already registered replaces the earlier
    /// one in place, with a warning.
    pub fn register(&mut self, candidate: ModuleCandidate) {
        if let Some(existing) = self.candidates.iter_mut().find(|c| c.name == candidate.name) {
            tracing::warn!(
                "module `{}` registered twice; the later registration wins",
                candidate.name
            );
            *existing = candidate;
        } else {
            self.candidates.push(candidate);
        }
    }

    /// Register a candidate through its config-store override.
    ///
    /// Override flags are merged first, then the override state decides
    /// the disposition: `yes` or no state selects it, `disabled` and
    /// `missing` record it as such, and `n/a` records it silently as not
    /// applicable.
    pub fn add_ext(
        &mut self,
        mut candidate: ModuleCandidate,
        config: &ConfigStore,
    ) -> Result<(), ConfigError> {
        let ov = config.module(&candidate.name);

        if let Some(cflags) = ov.and_then(|o| o.cflags.as_deref()) {
            let tokens = split_override(&candidate.name, "cflags", cflags)?;
            apply_compile_flags(&mut candidate, &tokens);
        }
        if let Some(ldflags) = ov.and_then(|o| o.ldflags.as_deref()) {
            let tokens = split_override(&candidate.name, "ldflags", ldflags)?;
            apply_link_flags(&mut candidate, &tokens);
        }

        candidate.disposition = match ov.and_then(|o| o.state) {
            None | Some(ModuleState::Yes) => Disposition::Selected,
            Some(ModuleState::Disabled) => Disposition::Disabled(DisabledBy::Configure),
            Some(ModuleState::Missing) => Disposition::MissingDependency,
            Some(ModuleState::NotAvailable) => Disposition::NotApplicable,
        };

        self.register(candidate);
        Ok(())
    }

    /// Record a module whose hard prerequisites are absent.
    pub fn mark_missing(&mut self, name: &str) {
        tracing::debug!("module `{}` is missing a prerequisite", name);
        self.register(ModuleCandidate::stub(name, Disposition::MissingDependency));
    }

    /// Record a module that does not apply to this platform.
    pub fn mark_not_applicable(&mut self, name: &str) {
        self.register(ModuleCandidate::stub(name, Disposition::NotApplicable));
    }

    /// Drop globally blacklisted modules, then stably move every candidate
    /// tagged [`BuildOrder::Last`] behind the rest.
    pub fn exclude_disabled_by_name(&mut self, names: &[String]) {
        self.candidates.retain(|c| {
            let keep = !names.contains(&c.name);
            if !keep {
                tracing::debug!("module `{}` is on the disabled list", c.name);
            }
            keep
        });
        self.candidates.sort_by_key(|c| c.order);
    }

    /// Resolve every selected candidate's sources and dependencies against
    /// `source_roots`, add dependencies from the module override, and
    /// append every runtime header to the dependency list.
    ///
    /// Names that exist under no root stay as written.
    pub fn rewrite_paths(&mut self, source_roots: &[PathBuf], headers: &[String], config: &ConfigStore) {
        for candidate in self.candidates.iter_mut().filter(|c| c.is_selected()) {
            candidate.sources = candidate
                .sources
                .iter()
                .map(|s| find_module_file(s, source_roots))
                .collect();

            if let Some(deps) = config.module(&candidate.name).and_then(|o| o.deps.as_deref()) {
                candidate
                    .depends
                    .extend(deps.split_whitespace().filter(|d| *d != "\\").map(str::to_string));
            }

            candidate.depends = candidate
                .depends
                .iter()
                .map(|d| find_module_file(d, source_roots))
                .collect();
            candidate.depends.extend(headers.iter().cloned());
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModuleCandidate> {
        self.candidates.iter().find(|c| c.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ModuleCandidate> {
        self.candidates.iter_mut().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleCandidate> {
        self.candidates.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ModuleCandidate> {
        self.candidates.iter_mut()
    }

    /// Candidates the toolchain should compile, in build order.
    pub fn selected(&self) -> impl Iterator<Item = &ModuleCandidate> {
        self.candidates.iter().filter(|c| c.is_selected())
    }

    /// Names of candidates with the given disposition, in registry order.
    pub fn names_with(&self, disposition: Disposition) -> Vec<String> {
        self.candidates
            .iter()
            .filter(|c| c.disposition == disposition)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn as_slice(&self) -> &[ModuleCandidate] {
        &self.candidates
    }
}

fn split_override(module: &str, field: &str, value: &str) -> Result<Vec<String>, ConfigError> {
    split_words(value).ok_or_else(|| ConfigError::UnterminatedQuote {
        key: format!("modules.{}.{}", module, field),
        value: value.to_string(),
    })
}
