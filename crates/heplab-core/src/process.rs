//! External process invocation.
//!
//! Every external tool (compilers, `make`, package config helpers) runs
//! through [`CommandSpec`]. Search paths and other per-invocation variables
//! are passed as explicit environment entries on the command value; the calling
//! process's ambient environment is never mutated.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

/// Captured result of a finished external process.
#[derive(Debug)]
pub struct RunOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Description of one external process invocation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    extra_env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            extra_env: Vec::new(),
        }
    }

    /// Convenience for `sh -c <script>`.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("/bin/sh").arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Add one environment entry for this invocation only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.push((key.into(), value.into()));
        self
    }

    /// Add a colon-joined path-list variable (e.g. `LIBRARY_PATH`) when the
    /// list is non-empty.
    pub fn env_paths(self, key: &str, paths: &[PathBuf]) -> Self {
        if paths.is_empty() {
            return self;
        }
        let joined = paths
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join(":");
        self.env(key, joined)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.extra_env {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run and capture stdout/stderr in memory. Spawn failures (e.g. the
    /// program does not exist) are errors; non-zero exit is reported in the
    /// returned [`RunOutput`].
    pub fn run(&self) -> Result<RunOutput> {
        tracing::debug!("running {} {:?}", self.program, self.args);
        let output = self
            .command()
            .output()
            .with_context(|| format!("Failed to spawn '{}'", self.program))?;
        Ok(RunOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Run with stdout and stderr redirected to `log_path`, creating parent
    /// directories as needed. Returns whether the process succeeded; the
    /// log file is left in place either way for diagnosis.
    pub fn run_logged(&self, log_path: &Path) -> Result<bool> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let log_file = std::fs::File::create(log_path)
            .with_context(|| format!("Failed to create log file {}", log_path.display()))?;

        tracing::debug!(
            "running {} {:?} (log: {})",
            self.program,
            self.args,
            log_path.display()
        );
        let status = self
            .command()
            .stdout(Stdio::from(log_file.try_clone()?))
            .stderr(Stdio::from(log_file))
            .status()
            .with_context(|| format!("Failed to spawn '{}'", self.program))?;

        if !status.success() {
            if let Ok(tail) = read_last_lines(log_path, 20) {
                tracing::debug!("last lines of {}:\n{tail}", log_path.display());
            }
        }
        Ok(status.success())
    }
}

/// Read the last N lines from a file efficiently.
///
/// Seeks to near the end and reads a fixed-size tail buffer instead of
/// loading the whole file, which matters for multi-hundred-MB build logs.
pub fn read_last_lines(path: &Path, n: usize) -> Result<String> {
    use std::fs::File;
    use std::io::{Read, Seek, SeekFrom};

    // 16KB is enough for ~400 lines at 40 chars each
    const TAIL_SIZE: u64 = 16 * 1024;

    let mut file = File::open(path)?;
    let file_len = file.metadata()?.len();

    let seek_pos = file_len.saturating_sub(TAIL_SIZE);
    file.seek(SeekFrom::Start(seek_pos))?;

    let mut buffer = String::new();
    file.read_to_string(&mut buffer)?;

    // If we seeked mid-file, skip the first (partial) line in-place
    let content = if seek_pos > 0 {
        buffer
            .find('\n')
            .map_or(buffer.as_str(), |idx| &buffer[idx + 1..])
    } else {
        &buffer
    };

    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].join("\n"))
}
