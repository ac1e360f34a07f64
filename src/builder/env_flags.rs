//! Search context setup.
//!
//! Folds externally supplied flag strings and the compiler's own reported
//! search paths into the compiler-wide include/library directory lists,
//! then derives the lists detectors search for headers and libraries.
//! Every compiler probe is optional: a probe that fails contributes nothing.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use regex::Regex;
use serde::Serialize;

use crate::builder::toolchain::compiler_command;
use crate::core::platform::PlatformProfile;
use crate::core::search_path::SearchPath;
use crate::util::config::{ConfigStore, HostEnv};
use crate::util::diagnostic::ConfigError;
use crate::util::process::{find_executable, Capture, ProcessBuilder};

/// Directories every candidate is compiled and linked with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompilerDirs {
    pub include_dirs: SearchPath,
    pub library_dirs: SearchPath,
    pub runtime_library_dirs: SearchPath,
}

/// Fixed roots of the build machine's filesystem layout.
///
/// Tests point these at a temporary tree and turn compiler probing off so
/// detection never sees the real host.
#[derive(Debug, Clone)]
pub struct SearchRoots {
    /// Installation prefix of locally built software
    pub local_prefix: String,
    pub system_lib_dirs: Vec<String>,
    pub system_include_dirs: Vec<String>,
    /// Ask the compiler (and `dpkg-architecture`) for extra search paths
    pub probe_compiler: bool,
}

impl Default for SearchRoots {
    fn default() -> Self {
        SearchRoots {
            local_prefix: "/usr/local".to_string(),
            system_lib_dirs: ["/lib64", "/usr/lib64", "/lib", "/usr/lib"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            system_include_dirs: vec!["/usr/include".to_string()],
            probe_compiler: true,
        }
    }
}

/// The search context detectors start from.
#[derive(Debug, Clone, Default)]
pub struct SearchDirs {
    pub compiler: CompilerDirs,
    /// Where library lookups search; a hit here needs no `-L`
    pub lib_dirs: Vec<String>,
    /// Where header lookups search; a hit here needs no `-I`
    pub inc_dirs: Vec<String>,
}

impl SearchDirs {
    /// Set up the compiler directories and derive the search lists.
    pub fn resolve(
        config: &ConfigStore,
        env: &HostEnv,
        platform: &PlatformProfile,
        roots: &SearchRoots,
        scratch: &Path,
    ) -> Self {
        let mut compiler = CompilerDirs::default();
        configure_compiler(&mut compiler, config, env, platform, roots, scratch);
        let (lib_dirs, inc_dirs) = search_lists(&mut compiler, config, env, platform, roots);

        tracing::debug!("library search list: {:?}", lib_dirs);
        tracing::debug!("include search list: {:?}", inc_dirs);

        SearchDirs {
            compiler,
            lib_dirs,
            inc_dirs,
        }
    }
}

/// A linker or preprocessor flag string: the config store's value, or the
/// environment's when the store has none.
pub fn flag_string(config: &ConfigStore, env: &HostEnv, key: &str) -> String {
    let from_env = match key {
        "LDFLAGS" => env.ldflags.clone(),
        "CPPFLAGS" => env.cppflags.clone(),
        _ => None,
    };
    config
        .get_nonempty(key)
        .or(from_env)
        .unwrap_or_default()
}

/// Fill the compiler-wide directories.
pub fn configure_compiler(
    dirs: &mut CompilerDirs,
    config: &ConfigStore,
    env: &HostEnv,
    platform: &PlatformProfile,
    roots: &SearchRoots,
    scratch: &Path,
) {
    if !platform.is_cross() {
        let prefix = Path::new(&roots.local_prefix);
        dirs.library_dirs.insert(&prefix.join("lib").to_string_lossy());
        dirs.include_dirs.insert(&prefix.join("include").to_string_lossy());
    }

    if roots.probe_compiler {
        let cc = compiler_command(config, env);
        if platform.is_cross() {
            add_cross_compiling_paths(dirs, &cc, platform, scratch);
        }
        add_multiarch_paths(dirs, &cc, config, platform, scratch);
    }

    add_flag_dirs(
        &mut dirs.runtime_library_dirs,
        &flag_string(config, env, "LDFLAGS"),
        'R',
    );
    add_flag_dirs(
        &mut dirs.library_dirs,
        &flag_string(config, env, "LDFLAGS"),
        'L',
    );
    add_flag_dirs(
        &mut dirs.include_dirs,
        &flag_string(config, env, "CPPFLAGS"),
        'I',
    );
}

/// Derive the header and library search lists.
pub fn search_lists(
    dirs: &mut CompilerDirs,
    config: &ConfigStore,
    env: &HostEnv,
    platform: &PlatformProfile,
    roots: &SearchRoots,
) -> (Vec<String>, Vec<String>) {
    let prefix_is_usr = config
        .get_nonempty("prefix")
        .is_some_and(|p| normalize_lexical(&p) == "/usr");
    if !platform.is_cross() && !prefix_is_usr && !config.flag("FRAMEWORK") {
        if let Some(libdir) = config.get_nonempty("LIBDIR") {
            dirs.library_dirs.insert(&libdir);
        }
        if let Some(includedir) = config.get_nonempty("INCLUDEDIR") {
            dirs.include_dirs.insert(&includedir);
        }
    }

    let mut lib_dirs = dirs.library_dirs.as_slice().to_vec();
    let mut inc_dirs = dirs.include_dirs.as_slice().to_vec();

    if platform.is_cross() {
        let ldflags = flag_string(config, env, "LDFLAGS");
        let cppflags = flag_string(config, env, "CPPFLAGS");
        let cc = config.get_str("CC");
        let cflags = config.get_str("CFLAGS");

        lib_dirs.extend(sysroot_paths(
            &[Some(ldflags), cc.clone()],
            &roots.system_lib_dirs,
        ));
        inc_dirs.extend(sysroot_paths(
            &[Some(cppflags), cflags, cc],
            &roots.system_include_dirs,
        ));
    } else {
        lib_dirs.extend(roots.system_lib_dirs.iter().cloned());
        inc_dirs.extend(roots.system_include_dirs.iter().cloned());
    }

    match platform.host_platform() {
        "osf1" | "unixware7" | "openunix8" => lib_dirs.push("/usr/ccs/lib".to_string()),
        "hp-ux11" => {
            lib_dirs.push("/usr/lib/hpux64".to_string());
            lib_dirs.push("/usr/lib/hpux32".to_string());
        }
        _ => {}
    }

    if platform.is_apple() {
        for item in config.get_str_or_empty("CFLAGS").split_whitespace() {
            if let Some(dir) = item.strip_prefix("-I") {
                inc_dirs.push(dir.to_string());
            }
        }
        for item in flag_string(config, env, "LDFLAGS").split_whitespace() {
            if let Some(dir) = item.strip_prefix("-L") {
                lib_dirs.push(dir.to_string());
            }
        }
    }

    (lib_dirs, inc_dirs)
}

/// Pull the arguments of one single-letter option (`-L`, `-R`, `-I`) out
/// of a flag string.
///
/// Other options are ignored, `--long` ones included. Both `-L/dir` and
/// `-L /dir` are recognized.
pub fn extract_dirs(flags: &str, option: char) -> Vec<String> {
    let mut dirs = Vec::new();
    let mut tokens = flags.split_whitespace();

    while let Some(token) = tokens.next() {
        let Some(rest) = token.strip_prefix('-') else {
            continue;
        };
        let Some(value) = rest.strip_prefix(option) else {
            continue;
        };
        if !value.is_empty() {
            dirs.push(value.strip_prefix('=').unwrap_or(value).to_string());
        } else if let Some(next) = tokens.next() {
            if !next.starts_with('-') {
                dirs.push(next.to_string());
            }
        }
    }

    dirs
}

/// Insert every directory `flags` passes with `-<option>` into `path`.
///
/// Directories are inserted last-first, so with the insertion rule they end
/// up in the order the flags name them.
pub fn add_flag_dirs(path: &mut SearchPath, flags: &str, option: char) {
    for dir in extract_dirs(flags, option).iter().rev() {
        path.insert(dir);
    }
}

fn add_multiarch_paths(
    dirs: &mut CompilerDirs,
    cc: &str,
    config: &ConfigStore,
    platform: &PlatformProfile,
    scratch: &Path,
) {
    let triple = multiarch_triple(cc, config, platform, scratch);
    if let Some(triple) = triple {
        tracing::debug!("multiarch triple: {}", triple);
        dirs.library_dirs.insert(&format!("/usr/lib/{}", triple));
        dirs.include_dirs.insert(&format!("/usr/include/{}", triple));
    }
}

/// The Debian-style multiarch triple: from the compiler first, then from
/// `dpkg-architecture`.
fn multiarch_triple(
    cc: &str,
    config: &ConfigStore,
    platform: &PlatformProfile,
    scratch: &Path,
) -> Option<String> {
    let from_cc = ProcessBuilder::from_command_line(cc)
        .map(|pb| pb.arg("-print-multiarch"))
        .and_then(|pb| pb.probe(scratch, Capture::Stdout))
        .and_then(|out| first_line(&out));
    if from_cc.is_some() {
        return from_cc;
    }

    find_executable("dpkg-architecture")?;
    let mut pb = ProcessBuilder::new("dpkg-architecture");
    if platform.is_cross() {
        pb = pb.arg(format!("-t{}", config.get_str_or_empty("HOST_GNU_TYPE")));
    }
    pb.arg("-qDEB_HOST_MULTIARCH")
        .probe(scratch, Capture::Stdout)
        .and_then(|out| first_line(&out))
}

fn first_line(out: &str) -> Option<String> {
    out.lines()
        .next()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

fn add_cross_compiling_paths(
    dirs: &mut CompilerDirs,
    cc: &str,
    platform: &PlatformProfile,
    scratch: &Path,
) {
    let output = ProcessBuilder::from_command_line(cc)
        .map(|pb| pb.args(["-E", "-v", "-"]).stdin_null())
        .and_then(|pb| pb.probe(scratch, Capture::Stderr));

    if let Some(output) = output {
        let (lib_dirs, inc_dirs) = parse_verbose_search_output(&output);
        for dir in &lib_dirs {
            dirs.library_dirs.insert(dir);
        }
        for dir in &inc_dirs {
            dirs.include_dirs.insert(dir);
        }
    }

    if platform.is_vxworks() {
        let output = ProcessBuilder::from_command_line(cc)
            .map(|pb| pb.arg("--print-search-dirs"))
            .and_then(|pb| pb.probe(scratch, Capture::Stdout));
        if let Some(output) = output {
            for dir in parse_print_search_dirs(&output, cfg!(windows)) {
                dirs.library_dirs.insert(&dir);
            }
        }
    }
}

/// Scan the diagnostic output of `cc -E -v -` for `LIBRARY_PATH=` and the
/// bracketed include search list, dropping toolchain-internal directories.
///
/// Nothing is taken unless the output identifies gcc or clang.
pub fn parse_verbose_search_output(output: &str) -> (Vec<String>, Vec<String>) {
    let mut lib_dirs = Vec::new();
    let mut inc_dirs = Vec::new();
    let mut known_compiler = false;
    let mut in_incdirs = false;

    for line in output.lines() {
        if line.starts_with("gcc version") || line.starts_with("clang version") {
            known_compiler = true;
        } else if line.starts_with("#include <...>") {
            in_incdirs = true;
        } else if line.starts_with("End of search list") {
            in_incdirs = false;
        } else if known_compiler && line.starts_with("LIBRARY_PATH") {
            let value = line.trim().split('=').nth(1).unwrap_or("");
            for dir in value.split(':') {
                let dir = normalize_lexical(dir);
                if !dir.contains("/gcc/") {
                    lib_dirs.push(dir);
                }
            }
        } else if known_compiler
            && in_incdirs
            && !line.contains("/gcc/")
            && !line.contains("/clang/")
        {
            inc_dirs.push(line.trim().to_string());
        }
    }

    (lib_dirs, inc_dirs)
}

/// Library directories from the `libraries:` line of
/// `cc --print-search-dirs`.
///
/// On an msys build machine the list is `;`-separated and uses mixed
/// Windows paths, which are converted to `/c/...` form.
pub fn parse_print_search_dirs(output: &str, msys: bool) -> Vec<String> {
    let sep = if msys { ';' } else { ':' };
    output
        .lines()
        .filter(|line| line.starts_with("libraries"))
        .flat_map(|line| {
            let value = line.trim().split('=').nth(1).unwrap_or("").to_string();
            value
                .split(sep)
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(|d| {
                    let d = if msys { convert_mixed_path(d) } else { d.to_string() };
                    normalize_lexical(&d)
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// `C:\a\b/c` becomes `/c/a/b/c`.
fn convert_mixed_path(path: &str) -> String {
    let mut chars = path.chars();
    let drive = chars.next().map(|c| c.to_ascii_lowercase()).unwrap_or_default();
    let rest: String = chars.skip(1).collect();
    format!("/{}{}", drive, rest.replace('\\', "/"))
}

/// Subdirectories of the `--sysroot=` named by the first flag string that
/// has one, keeping only those that exist.
pub fn sysroot_paths(flag_strings: &[Option<String>], subdirs: &[String]) -> Vec<String> {
    let Ok(re) = Regex::new(r#"--sysroot=([^"]\S*|"[^"]+")"#) else {
        return Vec::new();
    };

    for value in flag_strings.iter().flatten() {
        let Some(caps) = re.captures(value) else {
            continue;
        };
        let sysroot = PathBuf::from(caps[1].trim_matches('"'));
        return subdirs
            .iter()
            .map(|sub| sysroot.join(sub.trim_start_matches('/')))
            .filter(|path| path.is_dir())
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
    }

    Vec::new()
}

/// Collapse `.`, `..` and repeated separators without touching the
/// filesystem.
pub fn normalize_lexical(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let mut parts: Vec<&str> = Vec::new();
    let absolute = path.starts_with('/');
    for component in Path::new(path).components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            Component::Normal(part) => parts.push(part.to_str().unwrap_or("")),
            Component::Prefix(_) => {}
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// `#define` facts read from the runtime's configuration header.
#[derive(Debug, Clone, Default)]
pub struct ConfigHeader {
    defines: BTreeMap<String, String>,
}

impl ConfigHeader {
    /// Read and parse the header at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text =
            std::fs::read_to_string(path).map_err(|source| ConfigError::UnreadableConfigHeader {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::parse(&text))
    }

    /// Parse `#define NAME value` lines; `/* #undef NAME */` records `0`.
    pub fn parse(text: &str) -> Self {
        let mut defines = BTreeMap::new();
        let (Ok(define), Ok(undef)) = (
            Regex::new(r"^#define ([A-Z][A-Za-z0-9_]+) (.*)$"),
            Regex::new(r"^/\* #undef ([A-Z][A-Za-z0-9_]+) \*/"),
        ) else {
            return ConfigHeader { defines };
        };

        for line in text.lines() {
            if let Some(caps) = define.captures(line) {
                defines.insert(caps[1].to_string(), caps[2].trim().to_string());
            } else if let Some(caps) = undef.captures(line) {
                defines.insert(caps[1].to_string(), "0".to_string());
            }
        }

        ConfigHeader { defines }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.defines.get(name).map(String::as_str)
    }

    /// Whether `name` is defined to something other than `0`.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| v != "0")
    }
}
