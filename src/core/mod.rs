//! Core data structures for Berth.
//!
//! This module contains the foundational types used throughout Berth:
//! - The platform profile, resolved once per run
//! - Module candidates and their dispositions
//! - Ordered search paths
//! - The registry detectors append to
//! - Flag-string parsing for module overrides

pub mod candidate;
pub mod flags;
pub mod platform;
pub mod registry;
pub mod search_path;

pub use candidate::{BuildOrder, DisabledBy, Disposition, ModuleCandidate};
pub use platform::PlatformProfile;
pub use registry::Registry;
pub use search_path::SearchPath;
