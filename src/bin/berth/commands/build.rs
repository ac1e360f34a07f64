//! `berth build` command

use anyhow::Result;

use crate::cli::{BuildArgs, GlobalArgs};
use berth::ops::{DylibLoader, Mode};

pub fn execute(global: &GlobalArgs, args: BuildArgs) -> Result<()> {
    let pipeline = super::pipeline(global, &args.dirs)?;

    let detection = pipeline.detect(Mode::Build)?;
    let loader = DylibLoader::from_config(pipeline.config());
    let summary = pipeline.build(detection, &loader, !args.no_progress)?;

    print!("{}", summary.render());

    summary.check_strict(pipeline.env().strict)?;
    Ok(())
}
