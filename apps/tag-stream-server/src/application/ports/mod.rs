//! Port Interfaces
//!
//! Defines the interfaces (ports) the translator depends on, following
//! the Hexagonal Architecture pattern. Infrastructure adapters implement them.
//!
//! ## Driven Ports (Outbound)
//!
//! - `TagSource`: starts the external producer of the tag dictionary
//! - `SourceHandle`: terminates and reaps a started producer
//! - `TagSink`: incremental output towards the client

use async_trait::async_trait;
use tokio::io::AsyncBufRead;

// =============================================================================
// Tag Source
// =============================================================================

/// Byte stream carrying the tag dictionary XML.
pub type TagOutput = Box<dyn AsyncBufRead + Send + Unpin>;

/// A started producer: its output stream plus the handle that ends it.
pub struct OpenedSource {
    /// The producer's standard output.
    pub output: TagOutput,
    /// Handle used to terminate the producer once streaming is over.
    pub handle: Box<dyn SourceHandle>,
}

impl std::fmt::Debug for OpenedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedSource").finish_non_exhaustive()
    }
}

/// Control over a running producer.
#[async_trait]
pub trait SourceHandle: Send {
    /// Terminate the producer (if still running) and reap it.
    ///
    /// Best effort: failures are logged, never returned.
    async fn terminate(&mut self);
}

/// Starts producers of the tag dictionary.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TagSource: Send + Sync {
    /// Start a new producer for one request.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the producer cannot be started or its
    /// output cannot be captured.
    async fn open(&self) -> Result<OpenedSource, SourceError>;

    /// Human-readable description of what gets started, for logs and health.
    fn describe(&self) -> String;
}

/// Failure to start a producer.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The process could not be spawned.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that was being started.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The process started but its stdout was not piped.
    #[error("failed to capture stdout of {0}")]
    MissingStdout(String),
}

// =============================================================================
// Tag Sink
// =============================================================================

/// Incremental output channel towards one client.
#[async_trait]
pub trait TagSink: Send {
    /// Whether flushed bytes reach the client before the stream completes.
    fn supports_streaming(&self) -> bool {
        true
    }

    /// Append bytes to the pending output.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Disconnected` once the client is gone.
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), SinkError>;

    /// Deliver everything written so far to the client.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Disconnected` once the client is gone.
    async fn flush(&mut self) -> Result<(), SinkError>;
}

/// Sink failures.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The consumer went away.
    #[error("client disconnected")]
    Disconnected,

    /// Any other transport failure.
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}
