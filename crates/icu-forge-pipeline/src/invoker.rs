//! External process invocation.
//!
//! Steps never spawn processes directly; they go through
//! [`ToolchainInvoker`] so the orchestration can run against a fake.

use async_trait::async_trait;
use icu_forge_core::{ForgeError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

/// Exit status and captured output of one invocation.
#[derive(Debug, Clone)]
pub struct ExitOutcome {
    /// Exit code (-1 when terminated by a signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl ExitOutcome {
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }

    /// Last `lines` lines of stderr, or of stdout when stderr is empty.
    pub fn diagnostic_tail(&self, lines: usize) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let all: Vec<&str> = source.lines().collect();
        all[all.len().saturating_sub(lines)..].join("\n")
    }
}

/// A recorded call into the toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub dir: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    /// Whether any argument contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a.contains(needle))
    }
}

/// Runs one external build command to completion.
#[async_trait]
pub trait ToolchainInvoker: Send + Sync {
    /// Run `args[0]` with `args[1..]` in `dir`, with `env` layered over the
    /// inherited environment. Blocks the step until the process exits.
    async fn invoke(
        &self,
        dir: &Path,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<ExitOutcome>;
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker;

#[async_trait]
impl ToolchainInvoker for ProcessInvoker {
    async fn invoke(
        &self,
        dir: &Path,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<ExitOutcome> {
        let start = Instant::now();

        let Some((exe, rest)) = args.split_first() else {
            return Err(ForgeError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty toolchain command",
            )));
        };

        debug!(program = %exe, dir = %dir.display(), "Spawning toolchain process");

        let child = Command::new(exe)
            .args(rest)
            .envs(env)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ForgeError::io_at(Path::new(exe), e))?;

        let output = child.wait_with_output().await?;

        Ok(ExitOutcome {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
