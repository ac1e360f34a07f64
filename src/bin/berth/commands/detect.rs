//! `berth detect` command

use anyhow::{Context, Result};

use crate::cli::{DetectArgs, GlobalArgs};
use berth::core::candidate::{DisabledBy, Disposition};
use berth::ops::Mode;

pub fn execute(global: &GlobalArgs, args: DetectArgs) -> Result<()> {
    let pipeline = super::pipeline(global, &args.dirs)?;
    let detection = pipeline.detect(Mode::Build)?;

    if args.json {
        let json = serde_json::to_string_pretty(&pipeline.plan(&detection))
            .context("failed to serialize build plan")?;
        println!("{}", json);
        return Ok(());
    }

    let width = detection
        .registry
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0);

    for candidate in detection.registry.iter() {
        if candidate.disposition == Disposition::NotApplicable {
            continue;
        }
        let libs = if candidate.libraries.is_empty() {
            String::new()
        } else {
            format!("  [{}]", candidate.libraries.join(" "))
        };
        println!(
            "{:<width$}  {}{}",
            candidate.name,
            label(candidate.disposition),
            libs,
            width = width
        );
    }

    Ok(())
}

fn label(disposition: Disposition) -> &'static str {
    match disposition {
        Disposition::Selected => "selected",
        Disposition::Disabled(DisabledBy::Setup) => "disabled (setup)",
        Disposition::Disabled(DisabledBy::Configure) => "disabled (configure)",
        Disposition::MissingDependency => "missing",
        Disposition::NotApplicable => "n/a",
        Disposition::AlreadyBuilt => "already built",
        Disposition::BuildFailed => "failed",
        Disposition::ImportFailed => "import failed",
    }
}
