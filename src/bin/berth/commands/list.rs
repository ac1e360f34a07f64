//! `berth list` command

use anyhow::Result;

use crate::cli::{DirArgs, GlobalArgs};
use berth::ops::Mode;

pub fn execute(global: &GlobalArgs, args: DirArgs) -> Result<()> {
    let pipeline = super::pipeline(global, &args)?;
    let detection = pipeline.detect(Mode::List)?;

    for name in detection.list() {
        println!("{}", name);
    }

    Ok(())
}
