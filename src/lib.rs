//! Berth - build-time detection of optional native add-on modules
//!
//! This crate probes the build machine for libraries, headers, frameworks
//! and platform quirks, and turns the results into one build descriptor per
//! add-on module of a host runtime. It then reconciles the descriptors with
//! out-of-band build state, hands the survivors to a toolchain, verifies the
//! produced artifacts load, and summarizes the outcome.

pub mod builder;
pub mod core;
pub mod detect;
pub mod ops;
pub mod util;

/// Test utilities and fakes for Berth unit tests.
///
/// Only compiled for `cargo test`. Provides a fake toolchain, a fake loader
/// and hermetic fixture trees so detectors never see the real host.
#[cfg(test)]
pub mod test_support;

pub use core::{
    candidate::{Disposition, ModuleCandidate},
    platform::PlatformProfile,
    registry::Registry,
    search_path::SearchPath,
};

pub use detect::DetectionContext;
pub use util::config::ConfigStore;
