//! Time-bounded external commands.
//!
//! The screens run on a blocking thread; each query hops onto the tokio
//! runtime so the child process can be killed when the timeout fires.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::runtime::Handle;

/// Why a metrics query produced no data.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {status}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
    },

    #[error("malformed output: {0}")]
    Malformed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("{0}")]
    Unavailable(&'static str),
}

/// Runs commands with a fixed timeout from synchronous code.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    handle: Handle,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(handle: Handle, timeout: Duration) -> Self {
        Self { handle, timeout }
    }

    /// Run `program` and return its trimmed stdout.
    ///
    /// Must not be called from inside an async context.
    pub fn run(&self, program: &str, args: &[&str]) -> Result<String, QueryError> {
        let stdout = self.run_bytes(program, args)?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_owned())
    }

    /// Run `program` and return its raw stdout.
    pub fn run_bytes(&self, program: &str, args: &[&str]) -> Result<Vec<u8>, QueryError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = self.handle.block_on(async {
            tokio::time::timeout(self.timeout, cmd.output()).await
        });

        let output = output
            .map_err(|_| QueryError::Timeout {
                program: program.to_owned(),
                timeout: self.timeout,
            })?
            .map_err(|source| QueryError::Spawn {
                program: program.to_owned(),
                source,
            })?;

        if !output.status.success() {
            return Err(QueryError::Failed {
                program: program.to_owned(),
                status: output.status,
            });
        }
        Ok(output.stdout)
    }
}

// ── Tests ────────────────────────────────────────────────────────
