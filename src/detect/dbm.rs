//! Persistent dictionaries: `_dbm` and `_gdbm`.

use crate::core::candidate::ModuleCandidate;
use crate::util::diagnostic::ConfigError;

use super::DetectionContext;

const DEFAULT_ORDER: &str = "ndbm:gdbm:bdb";
const ORDER_OPTION: &str = "--with-dbmliborder=";

/// The backend preference list from configure's arguments.
///
/// The last `--with-dbmliborder=` wins; without one the default order
/// applies.
pub fn dbm_order(config_args: &str) -> Vec<String> {
    let order = config_args
        .split_whitespace()
        .map(|arg| arg.trim_matches('\''))
        .filter(|arg| arg.starts_with(ORDER_OPTION))
        .filter_map(|arg| arg.rsplit('=').next())
        .last()
        .unwrap_or(DEFAULT_ORDER);

    order.split(':').map(str::to_string).collect()
}

pub fn detect_dbm_gdbm(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    let order = if ctx.platform.is_cygwin() {
        vec!["gdbm".to_string()]
    } else {
        let order = dbm_order(&ctx.config.get_str_or_empty("CONFIG_ARGS"));
        match select_backend(ctx, &order) {
            Some(dbm) => ctx.add(dbm),
            None => ctx.missing("_dbm"),
        }
        order
    };

    if order.iter().any(|o| o == "gdbm") && ctx.config.flag("HAVE_LIBGDBM") {
        ctx.add(ModuleCandidate::new("_gdbm", ["_gdbmmodule.c"]).library("gdbm"));
    } else {
        ctx.missing("_gdbm");
    }

    Ok(())
}

/// The `_dbm` candidate for the first backend in `order` whose
/// prerequisites configure found.
fn select_backend(ctx: &DetectionContext<'_>, order: &[String]) -> Option<ModuleCandidate> {
    let config = ctx.config;

    for backend in order {
        let dbm = ModuleCandidate::new("_dbm", ["_dbmmodule.c"]);
        match backend.as_str() {
            "ndbm" if config.flag("HAVE_NDBM_H") => {
                // -lndbm, -lgdbm_compat, or nothing at all
                let dbm = if config.flag("HAVE_LIBNDBM") {
                    dbm.library("ndbm")
                } else if config.flag("HAVE_LIBGDBM_COMPAT") {
                    dbm.library("gdbm_compat")
                } else {
                    dbm
                };
                tracing::debug!("building _dbm using ndbm");
                return Some(dbm.define("USE_NDBM"));
            }
            "gdbm"
                if config.flag("HAVE_LIBGDBM_COMPAT")
                    && (config.flag("HAVE_GDBM_NDBM_H")
                        || config.flag("HAVE_GDBM_DASH_NDBM_H")) =>
            {
                tracing::debug!("building _dbm using gdbm");
                return Some(dbm.define("USE_GDBM_COMPAT").library("gdbm_compat"));
            }
            "bdb" if config.flag("HAVE_LIBDB") => {
                tracing::debug!("building _dbm using bdb");
                return Some(dbm.define("USE_BERKDB").library("db"));
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::candidate::Disposition;
    use crate::core::platform::PlatformProfile;
    use crate::test_support::{FakeToolchain, HermeticHost};
    use crate::util::config::{ConfigStore, HostEnv};

    fn run(platform: &str, config: ConfigStore) -> crate::core::registry::Registry {
        let host = HermeticHost::new();
        let platform = PlatformProfile::new(platform);
        let env = HostEnv::default();
        let toolchain = FakeToolchain::new(platform.clone());
        let mut ctx = host.context(&platform, &config, &env, &toolchain);
        detect_dbm_gdbm(&mut ctx).unwrap();
        ctx.registry
    }

    #[test]
    fn test_dbm_order() {
        assert_eq!(dbm_order(""), ["ndbm", "gdbm", "bdb"]);
        assert_eq!(
            dbm_order("'--prefix=/usr' '--with-dbmliborder=bdb' '--with-dbmliborder=gdbm:ndbm'"),
            ["gdbm", "ndbm"]
        );
    }

    #[test]
    fn test_falls_through_to_first_satisfied_backend() {
        let mut config = ConfigStore::new();
        config.set_str("CONFIG_ARGS", "'--with-dbmliborder=gdbm:ndbm'");
        config.set_flag("HAVE_NDBM_H", true);

        let registry = run("linux", config);

        let dbm = registry.get("_dbm").unwrap();
        assert_eq!(dbm.macro_value("USE_NDBM"), Some(&None));
        assert!(dbm.libraries.is_empty());
        assert_eq!(
            registry.get("_gdbm").unwrap().disposition,
            Disposition::MissingDependency
        );
    }

    #[test]
    fn test_gdbm_compat_backend() {
        let mut config = ConfigStore::new();
        config.set_flag("HAVE_LIBGDBM_COMPAT", true);
        config.set_flag("HAVE_GDBM_DASH_NDBM_H", true);
        config.set_flag("HAVE_LIBGDBM", true);

        let registry = run("linux", config);

        let dbm = registry.get("_dbm").unwrap();
        assert_eq!(dbm.macro_value("USE_GDBM_COMPAT"), Some(&None));
        assert_eq!(dbm.libraries, ["gdbm_compat"]);
        assert_eq!(registry.get("_gdbm").unwrap().libraries, ["gdbm"]);
    }

    #[test]
    fn test_gdbm_not_in_order() {
        let mut config = ConfigStore::new();
        config.set_str("CONFIG_ARGS", "--with-dbmliborder=bdb");
        config.set_flag("HAVE_LIBDB", true);
        config.set_flag("HAVE_LIBGDBM", true);

        let registry = run("linux", config);

        assert_eq!(registry.get("_dbm").unwrap().libraries, ["db"]);
        assert!(!registry.get("_gdbm").unwrap().is_selected());
    }

    #[test]
    fn test_cygwin_skips_dbm() {
        let mut config = ConfigStore::new();
        config.set_flag("HAVE_LIBGDBM", true);

        let registry = run("cygwin", config);

        assert!(registry.get("_dbm").is_none());
        assert!(registry.get("_gdbm").unwrap().is_selected());
    }

    #[test]
    fn test_nothing_found() {
        let registry = run("linux", ConfigStore::new());
        assert_eq!(
            registry.names_with(Disposition::MissingDependency),
            ["_dbm", "_gdbm"]
        );
    }
}
