//! Test doubles for the stream ports.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{OpenedSource, SinkError, SourceHandle, TagSink};

/// Sink that records every flushed chunk.
#[derive(Default)]
pub struct RecordingSink {
    pending: Vec<u8>,
    pub flushed: Vec<Vec<u8>>,
    cancel_after: Option<(usize, CancellationToken)>,
    disconnect_after: Option<usize>,
    buffered: bool,
}

impl RecordingSink {
    /// Cancel `token` once `flushes` chunks have been delivered.
    pub fn cancelling_after(flushes: usize, token: CancellationToken) -> Self {
        Self {
            cancel_after: Some((flushes, token)),
            ..Self::default()
        }
    }

    /// Report a disconnect on every flush after the first `flushes`.
    pub fn disconnecting_after(flushes: usize) -> Self {
        Self {
            disconnect_after: Some(flushes),
            ..Self::default()
        }
    }

    /// Sink that cannot deliver partial output.
    pub fn buffered() -> Self {
        Self {
            buffered: true,
            ..Self::default()
        }
    }

    pub fn body(&self) -> String {
        String::from_utf8(self.flushed.concat()).unwrap()
    }
}

#[async_trait]
impl TagSink for RecordingSink {
    fn supports_streaming(&self) -> bool {
        !self.buffered
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.pending.extend_from_slice(bytes);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        if self.disconnect_after.is_some_and(|limit| self.flushed.len() >= limit) {
            return Err(SinkError::Disconnected);
        }
        self.flushed.push(std::mem::take(&mut self.pending));
        if let Some((limit, token)) = &self.cancel_after
            && self.flushed.len() >= *limit
        {
            token.cancel();
        }
        Ok(())
    }
}

/// Handle that counts how often it was terminated.
#[derive(Clone, Default)]
pub struct CountingHandle {
    pub terminations: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

#[async_trait]
impl SourceHandle for CountingHandle {
    async fn terminate(&mut self) {
        self.terminations
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

/// An opened source serving `xml` from memory.
pub fn opened_from(xml: &str, handle: CountingHandle) -> OpenedSource {
    OpenedSource {
        output: Box::new(std::io::Cursor::new(xml.as_bytes().to_vec())),
        handle: Box::new(handle),
    }
}
