//! The end-of-run summary.
//!
//! Each non-empty category is printed as a sorted three-column table. The
//! summary is plain text for stdout; log output goes elsewhere.

use crate::core::candidate::{DisabledBy, Disposition};
use crate::core::registry::Registry;
use crate::ops::reconcile::Reconciled;
use crate::util::config::ConfigStore;
use crate::util::diagnostic::StrictBuildError;

/// Module name of the TLS bindings.
const TLS_MODULE: &str = "_ssl";

/// Final per-category module lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub missing: Vec<String>,
    pub built_elsewhere: Vec<String>,
    pub disabled_setup: Vec<String>,
    pub disabled_configure: Vec<String>,
    pub failed: Vec<String>,
    pub import_failed: Vec<String>,
    /// `[modules.*]` keys no detector produces
    pub unknown_overrides: Vec<String>,
    /// Column width
    pub longest: usize,
    /// Whether custom OpenSSL linker flags were configured
    pub openssl_ldflags: bool,
}

impl Summary {
    /// Collect the categories from the final registry.
    pub fn collect(registry: &Registry, reconciled: &Reconciled, config: &ConfigStore) -> Self {
        let longest = registry
            .iter()
            .filter(|c| {
                matches!(
                    c.disposition,
                    Disposition::Selected | Disposition::BuildFailed | Disposition::ImportFailed
                )
            })
            .map(|c| c.name.len())
            .max()
            .unwrap_or(0);

        Summary {
            missing: registry.names_with(Disposition::MissingDependency),
            built_elsewhere: reconciled.built.clone(),
            disabled_setup: reconciled.disabled.clone(),
            disabled_configure: registry.names_with(Disposition::Disabled(DisabledBy::Configure)),
            failed: registry.names_with(Disposition::BuildFailed),
            import_failed: registry.names_with(Disposition::ImportFailed),
            unknown_overrides: config.unknown_overrides().to_vec(),
            longest,
            openssl_ldflags: config.get_nonempty("OPENSSL_LDFLAGS").is_some(),
        }
    }

    /// Whether the TLS module is missing or failed.
    pub fn tls_unavailable(&self) -> bool {
        [&self.missing, &self.failed, &self.import_failed]
            .iter()
            .any(|list| list.iter().any(|m| m == TLS_MODULE))
    }

    /// Render the summary.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if !self.missing.is_empty() {
            out.push('\n');
            out.push_str("Module build finished successfully!\n");
            out.push_str("The necessary bits to build these optional modules were not found:\n");
            self.columns(&mut out, &self.missing);
            out.push_str(
                "To find the necessary bits, run `berth detect --verbose` and look for the module's name.\n",
            );
            out.push('\n');
        }

        self.section(
            &mut out,
            "The following modules found by detection have been\n\
             built by the Makefile instead, as configured by the Setup files:",
            &self.built_elsewhere,
        );
        self.section(
            &mut out,
            "The following modules found by detection have not\n\
             been built, they are *disabled* in the Setup files:",
            &self.disabled_setup,
        );
        self.section(
            &mut out,
            "The following modules found by detection have not\n\
             been built, they are *disabled* by configure:",
            &self.disabled_configure,
        );
        self.section(&mut out, "Failed to build these modules:", &self.failed);
        self.section(
            &mut out,
            "Following modules built successfully but were removed because they could not be imported:",
            &self.import_failed,
        );
        self.section(
            &mut out,
            "The config store has overrides for these unknown modules:",
            &self.unknown_overrides,
        );

        if self.tls_unavailable() {
            out.push('\n');
            out.push_str("Could not build the ssl module!\n");
            out.push_str("The runtime requires OpenSSL 1.1.1 or newer\n");
            if self.openssl_ldflags {
                out.push_str("Custom linker flags may require --with-openssl-rpath=auto\n");
            }
            out.push('\n');
        }

        out
    }

    /// Fail when strict mode is on and anything went missing or failed.
    pub fn check_strict(&self, strict: bool) -> Result<(), StrictBuildError> {
        if !strict {
            return Ok(());
        }
        let mut modules: Vec<String> = self
            .missing
            .iter()
            .chain(&self.failed)
            .chain(&self.import_failed)
            .cloned()
            .collect();
        if modules.is_empty() {
            return Ok(());
        }
        modules.sort();
        modules.dedup();
        Err(StrictBuildError { modules })
    }

    fn section(&self, out: &mut String, heading: &str, names: &[String]) {
        if names.is_empty() {
            return;
        }
        out.push('\n');
        out.push_str(heading);
        out.push('\n');
        self.columns(out, names);
        out.push('\n');
    }

    fn columns(&self, out: &mut String, names: &[String]) {
        let mut names: Vec<&str> = names.iter().map(String::as_str).collect();
        names.sort_by_key(|n| n.to_lowercase());
        while names.len() % 3 != 0 {
            names.push("");
        }
        let width = self.longest;
        for row in names.chunks(3) {
            out.push_str(&format!(
                "{:<width$}   {:<width$}   {:<width$}\n",
                row[0],
                row[1],
                row[2],
                width = width
            ));
        }
    }
}
