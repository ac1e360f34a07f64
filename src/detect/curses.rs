//! Line editing and terminal handling: `readline`, `_curses`, `_curses_panel`.
//!
//! The readline library often links against a curses flavor already. When
//! it does, the same flavor has to be used for `_curses`, or the process
//! ends up with two incompatible terminal libraries loaded.

use regex::Regex;

use crate::core::candidate::ModuleCandidate;
use crate::util::diagnostic::ConfigError;

use super::DetectionContext;

const TERMCAP_DIR: &str = "/usr/lib/termcap";

/// The curses flavor readline declared as a dynamic dependency.
///
/// `lines` is the dependency listing the toolchain reported. The first line
/// naming curses wins; a line naming `tinfo` yields `tinfo`.
pub fn termcap_from_needed(lines: &[String]) -> Option<String> {
    let pattern = Regex::new(r".*lib(n?cursesw?)\.so.*").ok();

    for line in lines {
        if line.contains("curses") {
            let flavor = pattern
                .as_ref()
                .and_then(|re| re.captures(line))
                .map(|caps| caps[1].to_string())
                .unwrap_or_else(|| line.trim_end().to_string());
            return Some(flavor);
        }
        if line.contains("tinfo") {
            return Some("tinfo".to_string());
        }
    }
    None
}

pub fn detect_readline_curses(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    let mut readline_lib = None;
    let mut termcap_lib = None;

    if ctx.config.flag("HAVE_LIBREADLINE") {
        let lib = if ctx.config.flag("WITH_EDITLINE") {
            "edit"
        } else {
            "readline"
        };
        if let Some(path) = ctx.find_library(lib) {
            termcap_lib = ctx
                .toolchain
                .needed_libraries(&path, &ctx.scratch)
                .as_deref()
                .and_then(termcap_from_needed);
            readline_lib = Some(lib);
        }
    }

    let curses_library = if termcap_lib.as_deref().is_some_and(|t| t.contains("curses")) {
        termcap_lib.clone().unwrap_or_default()
    } else if ctx.find_library("ncursesw").is_some() {
        "ncursesw".to_string()
    } else if ctx.platform.is_aix() && ctx.find_library("curses").is_some() {
        // AIX ships a wide-character curses under the plain name
        "curses".to_string()
    } else if ctx.find_library("ncurses").is_some() {
        "ncurses".to_string()
    } else if ctx.find_library("curses").is_some() {
        "curses".to_string()
    } else {
        String::new()
    };

    // Readline before 4.2 lacks the headers needed to build the module
    // against the system copy on old apple releases.
    if ctx.platform.is_apple()
        && ctx.platform.os_release().is_some_and(|r| r < 9)
        && ctx.find_header("readline/rlconf.h", &[]).is_none()
    {
        readline_lib = None;
    }

    match readline_lib {
        Some(lib) => {
            let mut libs = vec![lib.to_string()];
            if termcap_lib.is_none() {
                if !curses_library.is_empty() {
                    libs.push(curses_library.clone());
                } else {
                    let mut dirs = ctx.dirs.lib_dirs.clone();
                    dirs.push(TERMCAP_DIR.to_string());
                    if ctx.find_library_in(&dirs, "termcap").is_some() {
                        libs.push("termcap".to_string());
                    }
                }
            }
            ctx.add(
                ModuleCandidate::new("readline", ["readline.c"])
                    .library_dirs([TERMCAP_DIR])
                    .libraries(libs),
            );
        }
        None => ctx.missing("readline"),
    }

    let mut curses_defines: Vec<(String, Option<String>)> = Vec::new();
    let mut curses_includes: Vec<String> = Vec::new();
    let mut panel_library = "panel";

    if curses_library == "ncursesw" {
        curses_defines.push(("HAVE_NCURSESW".to_string(), Some("1".to_string())));
        if !ctx.platform.is_cross() {
            curses_includes.push("/usr/include/ncursesw".to_string());
        }
        panel_library = "panelw";
        if ctx.platform.is_apple() {
            // wide-character prototypes are hidden behind this on apple
            curses_defines.push(("_XOPEN_SOURCE_EXTENDED".to_string(), Some("1".to_string())));
        }
    } else if ctx.platform.is_apple() && curses_library == "ncurses" {
        curses_defines.push(("HAVE_NCURSESW".to_string(), Some("1".to_string())));
        curses_defines.push(("_XOPEN_SOURCE_EXTENDED".to_string(), Some("1".to_string())));
    }

    let with_curses_options = |candidate: ModuleCandidate| {
        let mut candidate = candidate.include_dirs(curses_includes.iter().cloned());
        candidate.macros.extend(curses_defines.iter().cloned());
        candidate
    };

    let mut curses_enabled = true;
    let mut curses_libs: Vec<String> = Vec::new();

    if curses_library.starts_with("ncurses") {
        curses_libs.push(curses_library.clone());
        ctx.add(with_curses_options(
            ModuleCandidate::new("_curses", ["_cursesmodule.c"]).libraries(curses_libs.clone()),
        ));
    } else if curses_library == "curses" && !ctx.platform.is_apple() {
        // Bare curses may need terminfo or termcap on the link line
        if ctx.find_library("terminfo").is_some() {
            curses_libs = vec!["curses".to_string(), "terminfo".to_string()];
        } else if ctx.find_library("termcap").is_some() {
            curses_libs = vec!["curses".to_string(), "termcap".to_string()];
        } else {
            curses_libs = vec!["curses".to_string()];
        }
        ctx.add(with_curses_options(
            ModuleCandidate::new("_curses", ["_cursesmodule.c"]).libraries(curses_libs.clone()),
        ));
    } else {
        curses_enabled = false;
        ctx.missing("_curses");
    }

    if ctx.platform.is_aix() {
        ctx.not_applicable("_curses_panel");
    } else if curses_enabled && ctx.find_library(panel_library).is_some() {
        let mut libs = vec![panel_library.to_string()];
        libs.extend(curses_libs.iter().cloned());
        ctx.add(with_curses_options(
            ModuleCandidate::new("_curses_panel", ["_curses_panel.c"]).libraries(libs),
        ));
    } else {
        ctx.missing("_curses_panel");
    }

    Ok(())
}
