//! Build support: search context, path lookup, toolchain and compile driver.
//!
//! Detection uses [`env_flags`] and [`search`] to decide what can be built;
//! the [`compile`] driver then hands the selected candidates to a
//! [`Toolchain`].

pub mod compile;
pub mod env_flags;
pub mod search;
pub mod toolchain;

pub use compile::{CompileDriver, CompileOutcome};
pub use env_flags::{CompilerDirs, ConfigHeader, SearchDirs, SearchRoots};
pub use toolchain::{detect_toolchain, BuildError, GccToolchain, Toolchain, ToolchainPlatform};
