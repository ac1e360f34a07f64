//! GCC/Clang toolchain implementation.

use std::path::{Path, PathBuf};

use crate::builder::env_flags::CompilerDirs;
use crate::core::candidate::ModuleCandidate;
use crate::core::platform::PlatformProfile;
use crate::util::context::BuildLayout;
use crate::util::fs::ensure_dir;
use crate::util::process::{find_executable, Capture, ProcessBuilder};

use super::{find_library_in_dirs, BuildError, Toolchain, ToolchainPlatform};

/// GCC/Clang toolchain (Unix-like systems).
#[derive(Debug, Clone)]
pub struct GccToolchain {
    /// Path to the C compiler
    pub cc: PathBuf,
    /// Leading compiler arguments that came with the command (`gcc -pthread`)
    pub cc_args: Vec<String>,
    /// Compiler family (gcc, clang, apple-clang)
    pub family: ToolchainPlatform,
    /// Flags for every compile (`CFLAGS` and `CCSHARED`)
    pub compile_flags: Vec<String>,
    /// Flags for every shared link (`LDFLAGS`)
    pub link_flags: Vec<String>,
    /// `readelf` used for dependency listing in cross builds
    pub readelf: String,
    platform: PlatformProfile,
}

impl GccToolchain {
    /// Create a new GCC-style toolchain.
    pub fn new(cc: PathBuf, family: ToolchainPlatform, platform: PlatformProfile) -> Self {
        GccToolchain {
            cc,
            cc_args: Vec::new(),
            family,
            compile_flags: Vec::new(),
            link_flags: Vec::new(),
            readelf: "readelf".to_string(),
            platform,
        }
    }

    /// Set leading compiler arguments.
    pub fn with_cc_args(mut self, args: Vec<String>) -> Self {
        self.cc_args = args;
        self
    }

    /// Set flags passed to every compile and link.
    pub fn with_flags(mut self, compile_flags: Vec<String>, link_flags: Vec<String>) -> Self {
        self.compile_flags = compile_flags;
        self.link_flags = link_flags;
        self
    }

    /// Set the `readelf` command.
    pub fn with_readelf(mut self, readelf: impl Into<String>) -> Self {
        self.readelf = readelf.into();
        self
    }

    fn command(&self) -> ProcessBuilder {
        ProcessBuilder::new(&self.cc).args(&self.cc_args)
    }

    /// Generate the compile command for one source file.
    pub fn compile_command(
        &self,
        candidate: &ModuleCandidate,
        dirs: &CompilerDirs,
        source: &str,
        object: &Path,
    ) -> ProcessBuilder {
        let mut cmd = self.command().args(&self.compile_flags);

        for (name, value) in &candidate.macros {
            cmd = match value {
                Some(v) => cmd.arg(format!("-D{}={}", name, v)),
                None => cmd.arg(format!("-D{}", name)),
            };
        }
        for name in &candidate.undef_macros {
            cmd = cmd.arg(format!("-U{}", name));
        }

        for dir in candidate.include_dirs.iter().chain(dirs.include_dirs.iter()) {
            cmd = cmd.arg(format!("-I{}", dir));
        }

        cmd.arg("-c")
            .arg(source)
            .arg("-o")
            .arg(object)
            .args(&candidate.extra_compile_args)
    }

    /// Generate the shared link command for a candidate.
    pub fn link_command(
        &self,
        candidate: &ModuleCandidate,
        dirs: &CompilerDirs,
        objects: &[PathBuf],
        output: &Path,
    ) -> ProcessBuilder {
        let mut cmd = self.command().args(&self.link_flags);

        if self.platform.is_apple() {
            cmd = cmd.args(["-bundle", "-undefined", "dynamic_lookup"]);
        } else {
            cmd = cmd.arg("-shared");
        }

        cmd = cmd.args(objects).args(&candidate.extra_objects);

        for dir in candidate.library_dirs.iter().chain(dirs.library_dirs.iter()) {
            cmd = cmd.arg(format!("-L{}", dir));
        }

        for dir in candidate
            .runtime_library_dirs
            .iter()
            .chain(dirs.runtime_library_dirs.iter())
        {
            cmd = if self.platform.is_apple() {
                cmd.arg(format!("-Wl,-rpath,{}", dir))
            } else {
                cmd.arg(format!("-Wl,-R{}", dir))
            };
        }

        for lib in &candidate.libraries {
            cmd = cmd.arg(format!("-l{}", lib));
        }

        cmd.args(&candidate.extra_link_args).arg("-o").arg(output)
    }
}

impl Toolchain for GccToolchain {
    fn platform(&self) -> ToolchainPlatform {
        self.family
    }

    fn compiler_path(&self) -> &Path {
        &self.cc
    }

    fn find_library_file(&self, dirs: &[String], lib: &str) -> Option<PathBuf> {
        find_library_in_dirs(dirs, lib, &self.platform)
    }

    fn build(
        &self,
        candidate: &ModuleCandidate,
        dirs: &CompilerDirs,
        layout: &BuildLayout,
    ) -> Result<PathBuf, BuildError> {
        if candidate.sources.is_empty() {
            return Err(BuildError::NoSources);
        }

        let object_dir = layout.object_dir(&candidate.name);
        ensure_dir(&object_dir)?;

        let mut objects = Vec::with_capacity(candidate.sources.len());
        for source in &candidate.sources {
            let stem = Path::new(source)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| candidate.name.clone());
            let object = object_dir.join(format!("{}.o", stem));

            let cmd = self.compile_command(candidate, dirs, source, &object);
            tracing::debug!("{}", cmd.display_command());
            let output = cmd.exec()?;
            if !output.status.success() {
                return Err(BuildError::Compile {
                    source_file: source.clone(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                });
            }
            objects.push(object);
        }

        let artifact = layout.artifact_path(&candidate.name);
        if let Some(parent) = artifact.parent() {
            ensure_dir(parent)?;
        }

        let cmd = self.link_command(candidate, dirs, &objects, &artifact);
        tracing::debug!("{}", cmd.display_command());
        let output = cmd.exec()?;
        if !output.status.success() {
            return Err(BuildError::Link {
                artifact,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(artifact)
    }

    fn needed_libraries(&self, library: &Path, scratch: &Path) -> Option<Vec<String>> {
        let output = if self.platform.is_cross() {
            let out = ProcessBuilder::new(&self.readelf)
                .arg("-d")
                .arg(library)
                .probe(scratch, Capture::Stdout)?;
            out.lines()
                .filter(|l| l.contains("(NEEDED)"))
                .map(str::to_string)
                .collect()
        } else {
            find_executable("ldd")?;
            let out = ProcessBuilder::new("ldd")
                .arg(library)
                .probe(scratch, Capture::Stdout)?;
            out.lines().map(str::to_string).collect()
        };
        Some(output)
    }

    fn architectures(&self, binary: &Path, scratch: &Path) -> Option<Vec<String>> {
        let out = ProcessBuilder::new("file")
            .arg(binary)
            .probe(scratch, Capture::Stdout)?;
        Some(parse_file_architectures(&out))
    }
}

/// Pull architectures out of `file` output on a universal binary:
/// the last word of each `for architecture` line.
pub fn parse_file_architectures(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|l| l.contains("for architecture"))
        .filter_map(|l| l.split_whitespace().last())
        .map(str::to_string)
        .collect()
}
