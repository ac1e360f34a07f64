//! The Sun RPC based `nis` module.
//!
//! Newer C libraries dropped Sun RPC; the headers and libraries then come
//! from libtirpc and libnsl, which install into `tirpc/` and `nsl/`
//! subdirectories.

use crate::builder::search;
use crate::core::candidate::ModuleCandidate;
use crate::util::diagnostic::ConfigError;

use super::DetectionContext;

fn subdirs(dirs: &[String], name: &str) -> Vec<String> {
    dirs.iter()
        .map(|dir| format!("{}/{}", dir.trim_end_matches('/'), name))
        .collect()
}

pub fn detect_nis(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    if ctx.platform.is_windows() || ctx.platform.is_cygwin() || ctx.platform.host_platform() == "qnx6"
    {
        ctx.missing("nis");
        return Ok(());
    }

    let rpcsvc_inc = ctx.find_header("rpcsvc/yp_prot.h", &subdirs(&ctx.dirs.inc_dirs, "nsl"));
    let rpc_inc = ctx.find_header("rpc/rpc.h", &subdirs(&ctx.dirs.inc_dirs, "tirpc"));
    let (Some(rpcsvc_inc), Some(rpc_inc)) = (rpcsvc_inc, rpc_inc) else {
        ctx.missing("nis");
        return Ok(());
    };

    let mut include_dirs = rpcsvc_inc;
    include_dirs.extend(rpc_inc);

    let mut libs = Vec::new();
    let mut library_dirs = Vec::new();

    if ctx.find_library("nsl").is_some() {
        libs.push("nsl".to_string());
    } else {
        let nsl_dirs = subdirs(&ctx.dirs.lib_dirs, "nsl");
        match search::find_library_file(ctx.toolchain, ctx.platform, "nsl", &[], &nsl_dirs) {
            Ok(Some(dirs)) => {
                library_dirs.extend(dirs);
                libs.push("nsl".to_string());
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("{}", e),
        }
    }

    if ctx.find_library("tirpc").is_some() {
        libs.push("tirpc".to_string());
    }

    ctx.add(
        ModuleCandidate::new("nis", ["nismodule.c"])
            .libraries(libs)
            .library_dirs(library_dirs)
            .include_dirs(include_dirs),
    );
    Ok(())
}
