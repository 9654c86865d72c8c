//! Operating system commands
//!
//! Shutdown, reboot and the IP address query are external programs run
//! without a shell and awaited with a timeout. Their exit codes are logged
//! but do not fail the command: a shutdown that "fails" usually means the
//! process was already on its way out.

use std::net::Ipv4Addr;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::SystemConfig;
use crate::{Error, Result};

/// Local system actions
#[async_trait]
pub trait SystemControl: Send + Sync {
    /// Request an OS shutdown
    async fn shutdown(&self) -> Result<()>;

    /// Request an OS reboot
    async fn reboot(&self) -> Result<()>;

    /// Primary IPv4 address of this host, if it has one
    async fn primary_ipv4(&self) -> Result<Option<Ipv4Addr>>;
}

/// [`SystemControl`] backed by configured command lines
#[derive(Debug, Clone)]
pub struct ShellSystem {
    config: SystemConfig,
}

impl ShellSystem {
    /// Create from system configuration
    #[must_use]
    pub const fn new(config: SystemConfig) -> Self {
        Self { config }
    }

    async fn run_logged(&self, argv: &[String]) -> Result<Output> {
        let output = run_command(argv, None, self.config.timeout).await?;
        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(command = ?argv, code, stderr = %stderr.trim(), "command exited unsuccessfully");
        }
        Ok(output)
    }
}

#[async_trait]
impl SystemControl for ShellSystem {
    async fn shutdown(&self) -> Result<()> {
        tracing::info!(command = ?self.config.shutdown, "shutting down");
        self.run_logged(&self.config.shutdown).await.map(drop)
    }

    async fn reboot(&self) -> Result<()> {
        tracing::info!(command = ?self.config.reboot, "rebooting");
        self.run_logged(&self.config.reboot).await.map(drop)
    }

    async fn primary_ipv4(&self) -> Result<Option<Ipv4Addr>> {
        let output = self.run_logged(&self.config.ip_query).await?;
        Ok(first_ipv4(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// First whitespace-separated token that parses as an IPv4 address
#[must_use]
pub fn first_ipv4(text: &str) -> Option<Ipv4Addr> {
    text.split_whitespace().find_map(|token| token.parse().ok())
}

/// Run a command line, optionally feeding `stdin`, and wait for it
///
/// The child is killed if it outlives `limit`.
///
/// # Errors
///
/// Returns error if the command line is empty, the program cannot be
/// spawned, or it does not finish in time
pub async fn run_command(argv: &[String], stdin: Option<&[u8]>, limit: Duration) -> Result<Output> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| Error::Config("empty command line".to_string()))?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::System(format!("failed to spawn {program}: {e}")))?;

    let pipe = child.stdin.take();
    let feed = async move {
        if let (Some(input), Some(mut pipe)) = (stdin, pipe) {
            // A child may exit without draining its input; its status says why
            if let Err(e) = pipe.write_all(input).await {
                tracing::debug!(error = %e, "child closed stdin early");
            }
        }
    };

    // Feeding and waiting share one time budget
    let run = async move {
        let ((), output) = tokio::join!(feed, child.wait_with_output());
        output
    };

    timeout(limit, run)
        .await
        .map_err(|_| Error::Timeout(format!("{program} after {limit:?}")))?
        .map_err(Error::from)
}
