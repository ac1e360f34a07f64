//! `berth toolchain` command

use anyhow::Result;

use crate::cli::{DirArgs, GlobalArgs};
use berth::builder::env_flags::{SearchDirs, SearchRoots};

pub fn execute(global: &GlobalArgs) -> Result<()> {
    let pipeline = super::pipeline(global, &DirArgs::default())?;
    let toolchain = pipeline.toolchain();
    let platform = pipeline.platform();

    println!("Toolchain:");
    println!();
    println!("  CC:       {}", toolchain.compiler_path().display());
    println!("  Family:   {}", toolchain.platform().as_str());
    println!();
    println!("  Platform: {}", platform.host_platform());
    println!("  Cross:    {}", platform.is_cross());
    if platform.is_apple() {
        println!("  SDK:      {}", platform.sdk_root().display());
    }
    println!();

    let dirs = SearchDirs::resolve(
        pipeline.config(),
        pipeline.env(),
        platform,
        &SearchRoots::default(),
        pipeline.layout().build_temp(),
    );

    println!("Library search list:");
    for dir in &dirs.lib_dirs {
        println!("  {}", dir);
    }
    println!();
    println!("Include search list:");
    for dir in &dirs.inc_dirs {
        println!("  {}", dir);
    }

    Ok(())
}
