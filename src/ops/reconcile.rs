//! Reconciling detected candidates with out-of-band build state.
//!
//! The runtime's own makefile may already link some modules statically,
//! build them itself, or have them disabled. Those candidates leave the
//! compile set, and artifacts a previous run produced for them are removed
//! so stale output is never picked up.

use std::collections::BTreeSet;

use anyhow::Result;

use crate::core::candidate::{DisabledBy, Disposition};
use crate::core::registry::Registry;
use crate::util::config::ConfigStore;
use crate::util::context::BuildLayout;
use crate::util::fs::remove_file_if_exists;

/// Module name sets from the config store.
#[derive(Debug, Clone, Default)]
pub struct BuildState {
    /// `MODBUILT_NAMES`: built by the makefile
    pub built: BTreeSet<String>,
    /// `MODSHARED_NAMES`: built by the makefile as shared objects
    pub shared: BTreeSet<String>,
    /// `MODDISABLED_NAMES`: disabled in the makefile setup
    pub disabled: BTreeSet<String>,
}

impl BuildState {
    pub fn from_config(config: &ConfigStore) -> Self {
        let set = |key: &str| config.get_list(key).into_iter().collect();
        BuildState {
            built: set("MODBUILT_NAMES"),
            shared: set("MODSHARED_NAMES"),
            disabled: set("MODDISABLED_NAMES"),
        }
    }
}

/// Names taken out of the compile set, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub built: Vec<String>,
    pub disabled: Vec<String>,
}

/// Flip every selected candidate the makefile already handles, and delete
/// stale artifacts of the ones it doesn't build as shared objects.
pub fn reconcile(
    registry: &mut Registry,
    state: &BuildState,
    layout: &BuildLayout,
) -> Result<Reconciled> {
    let mut outcome = Reconciled::default();

    for candidate in registry.iter_mut().filter(|c| c.is_selected()) {
        let built = state.built.contains(&candidate.name);
        let disabled = state.disabled.contains(&candidate.name);
        if !built && !disabled {
            continue;
        }

        if built {
            outcome.built.push(candidate.name.clone());
        }
        if disabled {
            outcome.disabled.push(candidate.name.clone());
        }
        candidate.disposition = if built {
            Disposition::AlreadyBuilt
        } else {
            Disposition::Disabled(DisabledBy::Setup)
        };

        if !state.shared.contains(&candidate.name) {
            let artifact = layout.artifact_path(&candidate.name);
            if remove_file_if_exists(&artifact)? {
                tracing::debug!("removed stale artifact {}", artifact.display());
            }
        }
    }

    Ok(outcome)
}
