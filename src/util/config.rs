//! The config store and the host environment snapshot.
//!
//! The config store is a pre-computed capability table written by whatever
//! configured the host runtime. It is a TOML document with two tables:
//!
//! ```toml
//! [vars]
//! srcdir = "/src/runtime"
//! HAVE_LIBZ = 1
//! CFLAGS = "-O2 -Wall"
//!
//! [modules._sqlite3]
//! state = "yes"
//! ldflags = "-lsqlite3"
//! ```
//!
//! `vars` holds flat platform facts; `modules` holds per-module overrides,
//! keyed by module name. Overrides are validated against the module catalog
//! once after loading, and unknown names are kept for the summary.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::util::diagnostic::ConfigError;

/// A single value in the `[vars]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl ConfigValue {
    /// Truthiness: booleans as-is, integers when non-zero, strings when
    /// non-empty and not `"0"`.
    pub fn is_truthy(&self) -> bool {
        match self {
            ConfigValue::Bool(b) => *b,
            ConfigValue::Int(i) => *i != 0,
            ConfigValue::Str(s) => !s.is_empty() && s != "0",
        }
    }

    /// String rendering used by flag parsers.
    pub fn as_string(&self) -> String {
        match self {
            ConfigValue::Bool(b) => u8::from(*b).to_string(),
            ConfigValue::Int(i) => i.to_string(),
            ConfigValue::Str(s) => s.clone(),
        }
    }
}

/// The build state a module override requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleState {
    /// Build the module.
    Yes,
    /// Disabled at configure time.
    Disabled,
    /// Configure found the prerequisites missing.
    Missing,
    /// Not available on this platform.
    #[serde(rename = "n/a")]
    NotAvailable,
}

/// Per-module override from the `[modules.<name>]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleOverride {
    /// Requested build state (absent = build it)
    pub state: Option<ModuleState>,

    /// Compiler flags: `-I`, `-D[=value]`, `-U`, anything else passes through
    pub cflags: Option<String>,

    /// Linker flags: `-L`, `-l`, object/archive filenames, passthrough
    pub ldflags: Option<String>,

    /// Extra dependency files, whitespace separated
    pub deps: Option<String>,
}

/// The config store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigStore {
    /// Flat platform facts
    pub vars: BTreeMap<String, ConfigValue>,

    /// Per-module overrides
    pub modules: BTreeMap<String, ModuleOverride>,

    /// Override keys that name no known module (filled by `validate_modules`)
    #[serde(skip)]
    unknown_overrides: Vec<String>,
}

impl ConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::UnreadableStore {
                path: path.to_path_buf(),
                source,
            })?;

        toml::from_str(&contents).map_err(|source| ConfigError::InvalidStore {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse the store from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Set a var, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: ConfigValue) -> &mut Self {
        self.vars.insert(key.into(), value);
        self
    }

    /// Set a string var.
    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.set(key, ConfigValue::Str(value.into()))
    }

    /// Set a boolean var.
    pub fn set_flag(&mut self, key: impl Into<String>, value: bool) -> &mut Self {
        self.set(key, ConfigValue::Bool(value))
    }

    /// Set a module override.
    pub fn set_module(&mut self, name: impl Into<String>, ov: ModuleOverride) -> &mut Self {
        self.modules.insert(name.into(), ov);
        self
    }

    /// Get a raw var.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.vars.get(key)
    }

    /// Get a var as a string. Missing vars are `None`.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.vars.get(key).map(ConfigValue::as_string)
    }

    /// Get a var as a string, treating missing vars as empty.
    pub fn get_str_or_empty(&self, key: &str) -> String {
        self.get_str(key).unwrap_or_default()
    }

    /// Get a var as a non-empty string.
    pub fn get_nonempty(&self, key: &str) -> Option<String> {
        self.get_str(key).filter(|s| !s.is_empty())
    }

    /// Check whether a var is set to a truthy value.
    pub fn flag(&self, key: &str) -> bool {
        self.vars.get(key).is_some_and(ConfigValue::is_truthy)
    }

    /// Get a whitespace-separated list var as a vector of names.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get_str_or_empty(key)
            .split_whitespace()
            .map(|s| s.to_string())
            .collect()
    }

    /// Look up the override for a module.
    pub fn module(&self, name: &str) -> Option<&ModuleOverride> {
        self.modules.get(name)
    }

    /// Validate override keys against the set of known module names.
    ///
    /// Unknown names are remembered (and logged) rather than ignored.
    pub fn validate_modules<'a>(&mut self, known: impl IntoIterator<Item = &'a str>) {
        let known: std::collections::HashSet<&str> = known.into_iter().collect();
        self.unknown_overrides = self
            .modules
            .keys()
            .filter(|name| !known.contains(name.as_str()))
            .cloned()
            .collect();

        for name in &self.unknown_overrides {
            tracing::warn!("config store has an override for unknown module `{}`", name);
        }
    }

    /// Override keys that name no known module.
    pub fn unknown_overrides(&self) -> &[String] {
        &self.unknown_overrides
    }
}

/// Snapshot of the process environment variables the build consumes.
///
/// Captured once so detectors and the verifier never read the process
/// environment directly.
#[derive(Debug, Clone, Default)]
pub struct HostEnv {
    /// Cross-compile marker; also the host platform tag when set
    pub host_platform: Option<String>,
    /// Host C compiler override
    pub cc: Option<String>,
    /// Linker flags, used when the config store has none
    pub ldflags: Option<String>,
    /// Preprocessor flags, used when the config store has none
    pub cppflags: Option<String>,
    /// `static` selects the unsupported static OpenSSL link mode
    pub openssl_build: Option<String>,
    /// Escalate module failures to a failing run
    pub strict: bool,
    /// GUI toolkit include flags override
    pub tcltk_includes: Option<String>,
    /// GUI toolkit link flags override
    pub tcltk_libs: Option<String>,
    /// Parent make flags (`-j` enables parallel compilation)
    pub makeflags: Option<String>,
}

impl HostEnv {
    /// Capture the current process environment.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok();
        HostEnv {
            host_platform: var("BERTH_HOST_PLATFORM"),
            cc: var("CC"),
            ldflags: var("LDFLAGS"),
            cppflags: var("CPPFLAGS"),
            openssl_build: var("BERTH_UNSUPPORTED_OPENSSL_BUILD"),
            strict: var("BERTH_STRICT_BUILD").is_some_and(|v| !v.is_empty()),
            tcltk_includes: var("TCLTK_INCLUDES"),
            tcltk_libs: var("TCLTK_LIBS"),
            makeflags: var("MAKEFLAGS"),
        }
    }

    /// Whether the parent make runs with parallel jobs.
    pub fn parallel(&self) -> bool {
        self.makeflags.as_deref().is_some_and(|f| f.contains("-j"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_store() {
        let store = ConfigStore::from_toml_str(
            r#"
            [vars]
            srcdir = "/src"
            HAVE_LIBZ = 1
            HAVE_LIBBZ2 = 0
            WITH_EDITLINE = false
            CONFIG_ARGS = "'--prefix=/usr'"

            [modules._sqlite3]
            state = "yes"
            ldflags = "-lsqlite3"

            [modules.ossaudiodev]
            state = "n/a"
            "#,
        )
        .unwrap();

        assert_eq!(store.get_str("srcdir").as_deref(), Some("/src"));
        assert!(store.flag("HAVE_LIBZ"));
        assert!(!store.flag("HAVE_LIBBZ2"));
        assert!(!store.flag("WITH_EDITLINE"));
        assert!(!store.flag("NOT_THERE"));
        assert_eq!(
            store.module("_sqlite3").unwrap().state,
            Some(ModuleState::Yes)
        );
        assert_eq!(
            store.module("ossaudiodev").unwrap().state,
            Some(ModuleState::NotAvailable)
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(ConfigValue::Str("yes".into()).is_truthy());
        assert!(!ConfigValue::Str("".into()).is_truthy());
        assert!(!ConfigValue::Str("0".into()).is_truthy());
        assert!(ConfigValue::Int(2).is_truthy());
        assert!(!ConfigValue::Bool(false).is_truthy());
    }

    #[test]
    fn test_get_list() {
        let mut store = ConfigStore::new();
        store.set_str("MODBUILT_NAMES", "posix  _io\terrno");
        assert_eq!(store.get_list("MODBUILT_NAMES"), ["posix", "_io", "errno"]);
        assert!(store.get_list("MODSHARED_NAMES").is_empty());
    }

    #[test]
    fn test_validate_modules_reports_unknown() {
        let mut store = ConfigStore::new();
        store.set_module("math", ModuleOverride::default());
        store.set_module("_no_such_thing", ModuleOverride::default());

        store.validate_modules(["math", "zlib"]);

        assert_eq!(store.unknown_overrides(), ["_no_such_thing"]);
    }

    #[test]
    fn test_parallel_from_makeflags() {
        let env = HostEnv {
            makeflags: Some(" -j8 --no-print-directory".to_string()),
            ..Default::default()
        };
        assert!(env.parallel());
        assert!(!HostEnv::default().parallel());
    }
}
