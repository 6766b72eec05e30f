//! External tool invocation
//!
//! Provides a builder for running a program directly (no shell) with
//! consistent error reporting. Failures come back as human-readable strings
//! that callers wrap into their own error variant.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Builder for external tool execution.
///
/// # Example
/// ```ignore
/// ToolCmd::new("patchelf")
///     .arg("--set-interpreter")
///     .arg("/opt/o11y/deps/lib/ld-musl-x86_64.so.1")
///     .arg("/opt/o11y/deps/usr/bin/jq")
///     .run()?;
/// ```
#[derive(Clone, Debug)]
pub struct ToolCmd {
    program: PathBuf,
    args: Vec<OsString>,
    env: Vec<(String, String)>,
}

impl ToolCmd {
    /// Create a new invocation of `program`.
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an environment variable for the command.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        cmd
    }

    /// Run the command and capture both stdout and stderr.
    fn output_all(&self) -> Result<CmdOutput, String> {
        let output = self
            .build_command()
            .output()
            .map_err(|e| format!("{} failed to start: {}", self.program.display(), e))?;

        Ok(CmdOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
            success: output.status.success(),
        })
    }

    /// Run the command and return its stdout.
    ///
    /// Non-zero exit is an error carrying the exit code and stderr.
    pub fn output(&self) -> Result<String, String> {
        let out = self.output_all()?;
        if !out.success {
            return Err(self.failure_message(&out));
        }
        Ok(out.stdout)
    }

    /// Run the command, discarding stdout.
    pub fn run(&self) -> Result<(), String> {
        self.output().map(|_| ())
    }

    fn failure_message(&self, out: &CmdOutput) -> String {
        let stderr = out.stderr.trim();
        if stderr.is_empty() {
            format!("command failed with exit code {}: {}", out.exit_code, self.display_cmd())
        } else {
            format!(
                "command failed with exit code {}: {}\nstderr: {}",
                out.exit_code,
                self.display_cmd(),
                stderr
            )
        }
    }

    /// The full command line, for display.
    pub fn display_cmd(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

/// Output from a command execution.
#[derive(Debug, Clone)]
struct CmdOutput {
    stdout: String,
    stderr: String,
    exit_code: i32,
    success: bool,
}

/// Quote a string for a POSIX shell script, only when it needs it.
pub fn shell_quote(s: impl std::fmt::Display) -> String {
    let s = s.to_string();
    if !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':')
        })
    {
        s
    } else {
        format!("'{}'", s.replace('\'', "'\"'\"'"))
    }
}
