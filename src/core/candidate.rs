//! Module candidates: a proposed add-on module and its build descriptor.

use serde::Serialize;

/// Why a module is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisabledBy {
    /// Listed in the store's `MODDISABLED_NAMES`
    Setup,
    /// Module override state `disabled`
    Configure,
}

/// Final classification of a candidate.
///
/// Exactly one holds at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Disposition {
    Selected,
    Disabled(DisabledBy),
    MissingDependency,
    NotApplicable,
    AlreadyBuilt,
    BuildFailed,
    ImportFailed,
}

impl Disposition {
    /// Whether this outcome shows up as a problem in the summary.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Disposition::MissingDependency | Disposition::BuildFailed | Disposition::ImportFailed
        )
    }
}

/// Position of a candidate in build order.
///
/// Candidates are stably sorted by this tag once detection is finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildOrder {
    #[default]
    Normal,
    /// Built after everything else (the foreign-function bridge)
    Last,
}

/// A proposed native add-on module with its build descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleCandidate {
    pub name: String,
    pub sources: Vec<String>,
    pub include_dirs: Vec<String>,
    pub library_dirs: Vec<String>,
    pub runtime_library_dirs: Vec<String>,
    pub libraries: Vec<String>,
    pub macros: Vec<(String, Option<String>)>,
    pub undef_macros: Vec<String>,
    pub extra_objects: Vec<String>,
    pub extra_compile_args: Vec<String>,
    pub extra_link_args: Vec<String>,
    pub depends: Vec<String>,
    pub order: BuildOrder,
    pub disposition: Disposition,
}

impl ModuleCandidate {
    /// Create a selected candidate built from `sources`.
    pub fn new<I, S>(name: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ModuleCandidate {
            name: name.into(),
            sources: sources.into_iter().map(Into::into).collect(),
            include_dirs: Vec::new(),
            library_dirs: Vec::new(),
            runtime_library_dirs: Vec::new(),
            libraries: Vec::new(),
            macros: Vec::new(),
            undef_macros: Vec::new(),
            extra_objects: Vec::new(),
            extra_compile_args: Vec::new(),
            extra_link_args: Vec::new(),
            depends: Vec::new(),
            order: BuildOrder::Normal,
            disposition: Disposition::Selected,
        }
    }

    /// A source-less record of a module that will not be built.
    pub fn stub(name: impl Into<String>, disposition: Disposition) -> Self {
        let mut candidate = ModuleCandidate::new(name, Vec::<String>::new());
        candidate.disposition = disposition;
        candidate
    }

    pub fn library(mut self, lib: impl Into<String>) -> Self {
        self.libraries.push(lib.into());
        self
    }

    pub fn libraries<I, S>(mut self, libs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.libraries.extend(libs.into_iter().map(Into::into));
        self
    }

    pub fn include_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn library_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.library_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn runtime_library_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runtime_library_dirs
            .extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Define `name` with no value (`-Dname`).
    pub fn define(mut self, name: impl Into<String>) -> Self {
        self.macros.push((name.into(), None));
        self
    }

    /// Define `name` to `value` (`-Dname=value`).
    pub fn define_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.macros.push((name.into(), Some(value.into())));
        self
    }

    pub fn compile_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_compile_args
            .extend(args.into_iter().map(Into::into));
        self
    }

    pub fn link_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_link_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn build_last(mut self) -> Self {
        self.order = BuildOrder::Last;
        self
    }

    /// Whether the toolchain should compile this candidate.
    pub fn is_selected(&self) -> bool {
        self.disposition == Disposition::Selected
    }

    /// Look up a macro definition.
    pub fn macro_value(&self, name: &str) -> Option<&Option<String>> {
        self.macros.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}
