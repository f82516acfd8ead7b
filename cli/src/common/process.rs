//! # mdbdeploy Process Execution (`common::process`)
//!
//! File: cli/src/common/process.rs
//!
//! ## Overview
//!
//! Every container engine is driven as an external binary. This module owns
//! the single place where those binaries are spawned, so the engine drivers
//! only deal with argv construction and output parsing.
//!
//! ## Architecture
//!
//! - **`CommandRunner`**: The seam the drivers are generic over. It takes a
//!   program and its arguments and returns raw stdout.
//! - **`ProcessRunner`**: The production implementation on top of
//!   `tokio::process::Command`. Child processes are spawned with
//!   `kill_on_drop(true)`, so dropping the returned future (Ctrl-C in `main`,
//!   or an enclosing `tokio::time::timeout`) terminates the engine process.
//!   A non-zero exit becomes `DeployError::ExternalCommand` carrying stderr,
//!   which is what the disk-space and not-found classifiers match against.
//!
//! The runner never retries. Retry policy belongs to the callers.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::process::{CommandRunner, ProcessRunner};
//!
//! # async fn run_example() -> crate::core::error::Result<()> {
//! let runner = ProcessRunner::default();
//! let stdout = runner.run("docker", &["version".to_string()]).await?;
//! println!("{}", String::from_utf8_lossy(&stdout));
//! # Ok(())
//! # }
//! ```
//!
use crate::core::error::{DeployError, Result};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument, trace};

/// Executes an external program and returns its standard output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> Result<Vec<u8>>;
}

/// Spawns real child processes. Children are killed when the returned
/// future is dropped, so a caller-side `tokio::time::timeout` or Ctrl-C
/// does not leave engine processes behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    #[instrument(skip(self, args), fields(program = %program))]
    async fn run(&self, program: &str, args: &[String]) -> Result<Vec<u8>> {
        let cmd_line = render_command(program, args);
        debug!("Running: {}", cmd_line);

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to execute '{}'", program))?;

        trace!(
            "'{}' exited with {}, {} bytes of stdout",
            cmd_line,
            output.status,
            output.stdout.len()
        );

        if !output.status.success() {
            return Err(anyhow!(DeployError::ExternalCommand {
                cmd: cmd_line,
                status: output.status.to_string(),
                output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }));
        }
        Ok(output.stdout)
    }
}

fn render_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Builds an owned argv from string slices.
pub fn argv<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}
