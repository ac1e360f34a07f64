//! The Tcl/Tk binding `_tkinter`.
//!
//! Three strategies are tried in turn and the first success wins: explicit
//! flags from the environment, Tcl and Tk framework bundles on the
//! apple-like platform, and finally a search of the usual Unix library and
//! header locations.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::core::candidate::ModuleCandidate;
use crate::util::diagnostic::ConfigError;

use super::DetectionContext;

const SOURCES: [&str; 2] = ["_tkinter.c", "tkappinit.c"];

/// Tcl/Tk versions tried by the Unix search, newest first. Undotted names
/// are what BSD and cygwin installs use.
const VERSIONS: &[&str] = &[
    "8.6", "86", "8.5", "85", "8.4", "84", "8.3", "83", "8.2", "82", "8.1", "81", "8.0", "80",
];

pub fn detect_tkinter(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    let found = {
        let view: &DetectionContext<'_> = ctx;
        from_env(view)
            .or_else(|| {
                if view.platform.is_apple() {
                    from_frameworks(view)
                } else {
                    None
                }
            })
            .or_else(|| from_unix_search(view))
    };

    match found {
        Some(tkinter) => ctx.add(tkinter),
        None => {
            tracing::info!("can't locate Tcl/Tk libs and/or headers");
            ctx.missing("_tkinter");
        }
    }
    Ok(())
}

fn base_candidate() -> ModuleCandidate {
    ModuleCandidate::new("_tkinter", SOURCES).define_value("WITH_APPINIT", "1")
}

/// Explicit compile and link flags, usually found by pkg-config at
/// configure time. Both must be present.
fn from_env(ctx: &DetectionContext<'_>) -> Option<ModuleCandidate> {
    let includes = ctx.env.tcltk_includes.as_deref().filter(|s| !s.is_empty())?;
    let libs = ctx.env.tcltk_libs.as_deref().filter(|s| !s.is_empty())?;

    Some(
        base_candidate()
            .compile_args(includes.split_whitespace())
            .link_args(libs.split_whitespace()),
    )
}

/// The directories searched for `Tcl.framework` and `Tk.framework`.
///
/// With an explicit SDK only the SDK is searched; otherwise the local
/// `/Library/Frameworks` comes first, then the SDK's system frameworks.
pub fn framework_dirs(sdk_root: &Path, sdk_specified: bool) -> Vec<PathBuf> {
    let system = sdk_root.join("System/Library/Frameworks");
    if sdk_specified {
        vec![sdk_root.join("Library/Frameworks"), system]
    } else {
        vec![PathBuf::from("/Library/Frameworks"), system]
    }
}

/// The `-arch` values in a compiler flag string.
pub fn requested_archs(cflags: &str) -> Vec<String> {
    let Ok(pattern) = Regex::new(r"-arch\s+(\w+)") else {
        return Vec::new();
    };
    pattern
        .captures_iter(cflags)
        .map(|caps| caps[1].to_string())
        .collect()
}

fn from_frameworks(ctx: &DetectionContext<'_>) -> Option<ModuleCandidate> {
    let dirs = framework_dirs(ctx.platform.sdk_root(), ctx.platform.sdk_specified());
    let frameworks = dirs
        .into_iter()
        .find(|dir| dir.join("Tcl.framework").exists() && dir.join("Tk.framework").exists())?;
    let fw = frameworks.to_string_lossy().into_owned();

    let include_dirs = ["Tcl", "Tk"].map(|name| {
        frameworks
            .join(format!("{}.framework", name))
            .join("Headers")
            .to_string_lossy()
            .into_owned()
    });

    // Only build for architectures this Tk was built with.
    let cflags = ctx.config.get_str_or_empty("CFLAGS");
    let wanted = requested_archs(&cflags);
    let detected = ctx
        .toolchain
        .architectures(&frameworks.join("Tk.framework/Tk"), &ctx.scratch)
        .unwrap_or_default();
    let arch_args: Vec<String> = detected
        .into_iter()
        .filter(|arch| wanted.contains(arch))
        .flat_map(|arch| ["-arch".to_string(), arch])
        .collect();

    let mut compile_args = vec!["-F".to_string(), fw.clone()];
    compile_args.extend(arch_args.iter().cloned());
    // Tk's bundled X11 headers trigger prototype warnings
    if cflags.split_whitespace().any(|f| f == "-Wstrict-prototypes") {
        compile_args.push("-Wno-strict-prototypes".to_string());
    }

    let mut link_args = vec![format!("-Wl,-F,{},-framework,Tcl,-framework,Tk", fw)];
    link_args.extend(arch_args);

    Some(
        base_candidate()
            .include_dirs(include_dirs)
            .compile_args(compile_args)
            .link_args(link_args),
    )
}

/// X11 include and library directories; the first layout present wins.
fn x11_dirs(platform: &str) -> (&'static str, &'static [&'static str]) {
    if platform == "sunos5" {
        ("/usr/openwin/include", &["/usr/openwin/lib"][..])
    } else if Path::new("/usr/X11R6/include").exists() {
        ("/usr/X11R6/include", &["/usr/X11R6/lib64", "/usr/X11R6/lib"][..])
    } else if Path::new("/usr/X11R5/include").exists() {
        ("/usr/X11R5/include", &["/usr/X11R5/lib"][..])
    } else {
        ("/usr/X11/include", &["/usr/X11/lib"][..])
    }
}

/// `83` becomes `8.3`; dotted versions pass through.
fn dotted(version: &str) -> String {
    if version.contains('.') || version.len() < 2 {
        return version.to_string();
    }
    let (major, minor) = version.split_at(version.len() - 1);
    format!("{}.{}", major, minor)
}

fn from_unix_search(ctx: &DetectionContext<'_>) -> Option<ModuleCandidate> {
    let version = VERSIONS.iter().copied().find(|v| {
        ctx.find_library(&format!("tk{}", v)).is_some()
            && ctx.find_library(&format!("tcl{}", v)).is_some()
    })?;

    // Debian and the BSDs keep headers in include/{tcl,tk}X.Y
    let dotversion = if ctx.platform.is_bsd() {
        dotted(version)
    } else {
        version.to_string()
    };
    let sub = |prefix: &str| -> Vec<String> {
        ctx.dirs
            .inc_dirs
            .iter()
            .map(|dir| format!("{}/{}{}", dir, prefix, dotversion))
            .collect()
    };
    let tcl_sub = sub("tcl");
    let mut tk_sub = sub("tk");
    tk_sub.extend(tcl_sub.iter().cloned());

    let tcl_includes = ctx.find_header("tcl.h", &tcl_sub)?;
    let tk_includes = ctx.find_header("tk.h", &tk_sub)?;

    let mut include_dirs: Vec<String> = Vec::new();
    for dir in tcl_includes.into_iter().chain(tk_includes) {
        if !include_dirs.contains(&dir) {
            include_dirs.push(dir);
        }
    }

    let (x11_include, x11_libs) = x11_dirs(ctx.platform.host_platform());
    include_dirs.push(x11_include.to_string());
    let added_lib_dirs: Vec<String> = x11_libs.iter().map(|d| d.to_string()).collect();

    if ctx.platform.is_cygwin()
        && crate::builder::search::find_file(ctx.platform, "X11/Xlib.h", &[], &include_dirs)
            .is_none()
    {
        return None;
    }

    let mut tkinter = base_candidate();

    let mut blt_dirs = ctx.dirs.lib_dirs.clone();
    blt_dirs.extend(added_lib_dirs.iter().cloned());
    if let Some(blt) = ["BLT8.0", "BLT"]
        .into_iter()
        .find(|lib| ctx.find_library_in(&blt_dirs, lib).is_some())
    {
        tkinter = tkinter.define_value("WITH_BLT", "1").library(blt);
    }

    tkinter = tkinter
        .library(format!("tk{}", version))
        .library(format!("tcl{}", version));
    if !ctx.platform.is_cygwin() {
        tkinter = tkinter.library("X11");
    }

    Some(
        tkinter
            .include_dirs(include_dirs)
            .library_dirs(added_lib_dirs),
    )
}
