//! Process execution for configured commands

use async_trait::async_trait;
use std::io;
use std::process::ExitStatus;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Why a command did not complete successfully.
#[derive(Debug, thiserror::Error)]
pub enum ExitError {
    #[error("failed to start: {0}")]
    Launch(#[source] io::Error),

    #[error("{status}: {stderr}")]
    Status { status: ExitStatus, stderr: String },

    /// Failure reported by a runner that does not spawn real processes.
    #[error("{0}")]
    Other(String),
}

/// Runs a single command to completion.
///
/// `cwd` is empty when the command should inherit the server's working directory.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, args: &[String], cwd: &str) -> Result<(), ExitError>;
}

/// Spawns commands as child processes and waits for them.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &str, args: &[String], cwd: &str) -> Result<(), ExitError> {
        let mut cmd = Command::new(command);
        cmd.args(args);
        if !cwd.is_empty() {
            cmd.current_dir(cwd);
        }

        info!("Running (cwd = '{}'): {} {}", cwd, command, args.join(" "));
        let output = cmd.output().await.map_err(|e| {
            error!("'{}' failed to start: {}", command, e);
            ExitError::Launch(e)
        })?;

        if output.status.success() {
            debug!(
                "'{}' output:\n{}",
                command,
                String::from_utf8_lossy(&output.stdout)
            );
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("'{}' failed ({}): {}", command, output.status, stderr);
            Err(ExitError::Status {
                status: output.status,
                stderr,
            })
        }
    }
}
