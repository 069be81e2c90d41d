//! External Tool Adapter
//!
//! [`TagSource`] implementation that spawns the configured command (by
//! default `exiftool -listx`) once per request and hands its stdout to the
//! translator.
//!
//! The child is spawned with `kill_on_drop`, so even a handle that is
//! dropped without [`SourceHandle::terminate`] (e.g. a panicking request
//! task) does not leak the process.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::BufReader;
use tokio::process::{Child, Command};

use crate::application::ports::{OpenedSource, SourceError, SourceHandle, TagSource};
use crate::infrastructure::config::CommandSettings;

/// Spawns the external tag dictionary command.
#[derive(Debug, Clone)]
pub struct ExiftoolSource {
    settings: CommandSettings,
}

impl ExiftoolSource {
    /// Create a source for the given command.
    #[must_use]
    pub const fn new(settings: CommandSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl TagSource for ExiftoolSource {
    async fn open(&self) -> Result<OpenedSource, SourceError> {
        let program = &self.settings.program;

        let mut child = Command::new(program)
            .args(&self.settings.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SourceError::Spawn {
                program: program.clone(),
                source,
            })?;

        let Some(stdout) = child.stdout.take() else {
            return Err(SourceError::MissingStdout(program.clone()));
        };

        tracing::debug!(program = %program, pid = child.id(), "External tool started");

        Ok(OpenedSource {
            output: Box::new(BufReader::new(stdout)),
            handle: Box::new(ProcessHandle {
                program: program.clone(),
                child,
            }),
        })
    }

    fn describe(&self) -> String {
        self.settings.display()
    }
}

/// Owns a spawned child until it is terminated and reaped.
struct ProcessHandle {
    program: String,
    child: Child,
}

#[async_trait]
impl SourceHandle for ProcessHandle {
    async fn terminate(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(program = %self.program, %status, "External tool already exited");
                return;
            }
            Ok(None) => {
                if let Err(e) = self.child.start_kill() {
                    tracing::warn!(program = %self.program, error = %e, "Failed to kill external tool");
                }
            }
            Err(e) => {
                tracing::warn!(program = %self.program, error = %e, "Failed to poll external tool");
            }
        }

        match self.child.wait().await {
            Ok(status) => {
                tracing::debug!(program = %self.program, %status, "External tool reaped");
            }
            Err(e) => {
                tracing::warn!(program = %self.program, error = %e, "Failed to reap external tool");
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
