//! Stream Errors
//!
//! Every way a tag stream can end other than successful completion.

use crate::application::ports::{SinkError, SourceError};
use crate::infrastructure::xml::XmlError;

/// Tag stream failures.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The external producer could not be started. Nothing was written.
    #[error("setup failed: {0}")]
    Setup(#[from] SourceError),

    /// The sink cannot deliver partial output. Nothing was written.
    #[error("streaming not supported")]
    StreamingUnsupported,

    /// The producer emitted malformed XML.
    #[error("error reading XML: {0}")]
    Parse(#[from] XmlError),

    /// A result could not be serialized.
    #[error("error encoding JSON: {0}")]
    Encode(#[from] serde_json::Error),

    /// The sink failed for a reason other than a disconnect.
    #[error("error writing response: {0}")]
    Write(#[source] std::io::Error),

    /// The client went away or the request was cancelled.
    #[error("client closed connection")]
    ClientDisconnected,
}

impl StreamError {
    /// Whether this is the client going away rather than a server failure.
    #[must_use]
    pub const fn is_client_disconnect(&self) -> bool {
        matches!(self, Self::ClientDisconnected)
    }

    /// Whether the error is raised before any output is written.
    #[must_use]
    pub const fn is_setup(&self) -> bool {
        matches!(self, Self::Setup(_) | Self::StreamingUnsupported)
    }
}

impl From<SinkError> for StreamError {
    fn from(error: SinkError) -> Self {
        match error {
            SinkError::Disconnected => Self::ClientDisconnected,
            SinkError::Io(e) => Self::Write(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_disconnect_maps_to_client_disconnect() {
        let err = StreamError::from(SinkError::Disconnected);
        assert!(err.is_client_disconnect());
        assert!(!err.is_setup());
    }

    #[test]
    fn sink_io_maps_to_write() {
        let io = std::io::Error::other("boom");
        let err = StreamError::from(SinkError::Io(io));
        assert!(matches!(err, StreamError::Write(_)));
        assert!(!err.is_client_disconnect());
    }

    #[test]
    fn setup_errors_are_flagged() {
        let err = StreamError::from(SourceError::MissingStdout("exiftool".to_string()));
        assert!(err.is_setup());
        assert!(StreamError::StreamingUnsupported.is_setup());
        assert_eq!(err.to_string(), "setup failed: failed to capture stdout of exiftool");
    }
}
