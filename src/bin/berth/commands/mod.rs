//! Command implementations

pub mod build;
pub mod completions;
pub mod detect;
pub mod list;
pub mod toolchain;

use anyhow::Result;

use crate::cli::{DirArgs, GlobalArgs};
use berth::ops::{Pipeline, PipelineOptions};
use berth::util::config::{ConfigStore, HostEnv};

/// Load the config store and set up a pipeline.
pub fn pipeline(global: &GlobalArgs, dirs: &DirArgs) -> Result<Pipeline> {
    let config = ConfigStore::load(&global.config)?;
    let options = PipelineOptions {
        build_lib: dirs.build_lib.clone(),
        build_temp: dirs.build_temp.clone(),
    };
    Pipeline::new(config, HostEnv::from_env(), &options)
}
