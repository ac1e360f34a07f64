//! Error types surfaced to the user.
//!
//! Only configuration errors are fatal. Everything a single module can get
//! wrong (missing prerequisites, build or import failures) is accumulated
//! and shown in the summary instead.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// A fatal configuration error. Aborts the whole run.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ConfigError {
    #[error("no source directory; cannot proceed")]
    #[diagnostic(code(berth::config::no_srcdir), help("set `srcdir` in the [vars] table of the config store"))]
    NoSourceRoot,

    #[error("TZPATH must contain only absolute paths, found {paths:?} with invalid paths {invalid:?}")]
    #[diagnostic(code(berth::config::tzpath))]
    RelativeTzPath {
        paths: Vec<String>,
        invalid: Vec<String>,
    },

    #[error("failed to read configuration header `{}`", path.display())]
    #[diagnostic(code(berth::config::config_h))]
    UnreadableConfigHeader {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unterminated quote in flag string for `{key}`: {value}")]
    #[diagnostic(code(berth::config::flags), help("check the quoting of the flag string in the config store"))]
    UnterminatedQuote { key: String, value: String },

    #[error("failed to read config store `{}`", path.display())]
    #[diagnostic(code(berth::config::read))]
    UnreadableStore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config store `{}`", path.display())]
    #[diagnostic(code(berth::config::parse))]
    InvalidStore {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Strict mode escalation of module failures.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("failed to build some modules: {}", modules.join(", "))]
#[diagnostic(code(berth::strict), help("unset BERTH_STRICT_BUILD to report failures without failing the run"))]
pub struct StrictBuildError {
    /// Every module that went missing or failed, sorted.
    pub modules: Vec<String>,
}
