//! Subprocess execution utilities.
//!
//! Two flavors: `exec` for commands whose failure matters (compiling,
//! linking), and `probe` for commands that only provide optional
//! information. A probe never returns an error; any failure is `None`.

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result};

/// Which output stream of a probe carries the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    Stdout,
    Stderr,
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    stdin_null: bool,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            stdin_null: false,
        }
    }

    /// Build from a shell-like command string such as `gcc -pthread`.
    ///
    /// The first word is the program, the rest become leading arguments.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace();
        let program = words.next()?;
        Some(ProcessBuilder::new(program).args(words))
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Feed the process an empty stdin (`</dev/null`).
    pub fn stdin_null(mut self) -> Self {
        self.stdin_null = true;
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if self.stdin_null {
            cmd.stdin(Stdio::null());
        }

        cmd
    }

    /// Run the command to completion, capturing both streams.
    ///
    /// Only spawning is an error; the caller inspects the exit status.
    pub fn exec(&self) -> Result<Output> {
        self.build_command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))
    }

    /// Run the command as an information probe.
    ///
    /// The captured stream is redirected into a scratch file under
    /// `scratch_dir`; the file is removed on every path out of this
    /// function. Returns the captured text only if the command ran and
    /// exited successfully.
    pub fn probe(&self, scratch_dir: &Path, capture: Capture) -> Option<String> {
        match self.try_probe(scratch_dir, capture) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("probe `{}` failed: {:#}", self.display_command(), e);
                None
            }
        }
    }

    fn try_probe(&self, scratch_dir: &Path, capture: Capture) -> Result<Option<String>> {
        std::fs::create_dir_all(scratch_dir).with_context(|| {
            format!("failed to create scratch directory: {}", scratch_dir.display())
        })?;

        let mut scratch = tempfile::NamedTempFile::new_in(scratch_dir)
            .context("failed to create probe scratch file")?;
        let sink = scratch.reopen().context("failed to reopen probe scratch file")?;

        let mut cmd = self.build_command();
        match capture {
            Capture::Stdout => {
                cmd.stdout(Stdio::from(sink));
                cmd.stderr(Stdio::null());
            }
            Capture::Stderr => {
                cmd.stdout(Stdio::null());
                cmd.stderr(Stdio::from(sink));
            }
        }

        let status = cmd
            .status()
            .with_context(|| format!("failed to execute `{}`", self.program.display()))?;
        if !status.success() {
            tracing::debug!(
                "probe `{}` exited with {:?}",
                self.display_command(),
                status.code()
            );
            return Ok(None);
        }

        let mut bytes = Vec::new();
        scratch
            .as_file_mut()
            .read_to_end(&mut bytes)
            .context("failed to read probe output")?;

        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// The first of `cc`, `gcc` and `clang` found on PATH.
pub fn find_c_compiler() -> Option<PathBuf> {
    ["cc", "gcc", "clang"].into_iter().find_map(find_executable)
}
