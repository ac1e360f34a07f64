//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Berth - build-time detection of optional native add-on modules
#[derive(Parser)]
#[command(name = "berth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Path to the config store
    #[arg(long, global = true, env = "BERTH_CONFIG", default_value = "berth.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect, build and verify every module, then print a summary
    Build(BuildArgs),

    /// Detect modules and show the build plan
    Detect(DetectArgs),

    /// Print the names of buildable modules, then missing ones
    List(DirArgs),

    /// Show the toolchain and search directories
    Toolchain,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Build directory overrides.
#[derive(Args, Clone, Default)]
pub struct DirArgs {
    /// Where built artifacts go (default: build/lib)
    #[arg(long)]
    pub build_lib: Option<PathBuf>,

    /// Scratch directory (default: build/temp)
    #[arg(long)]
    pub build_temp: Option<PathBuf>,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub dirs: DirArgs,

    /// Don't show a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Args)]
pub struct DetectArgs {
    #[command(flatten)]
    pub dirs: DirArgs,

    /// Emit the build plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
