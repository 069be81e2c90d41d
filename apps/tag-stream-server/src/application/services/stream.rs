//! Tag Stream Service
//!
//! Per-request orchestration around the translator. The source is opened
//! separately from streaming so callers can report setup failures before
//! committing to a response; once opened, [`TagStreamService::stream`]
//! terminates the source on every exit path.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{StreamError, TranslateSummary, translate};
use crate::application::ports::{OpenedSource, TagSink, TagSource};
use crate::domain::tags::TagFilter;

/// Runs tag streams against a shared source.
#[derive(Clone)]
pub struct TagStreamService {
    source: Arc<dyn TagSource>,
}

impl TagStreamService {
    /// Create a service over the given source.
    #[must_use]
    pub fn new(source: Arc<dyn TagSource>) -> Self {
        Self { source }
    }

    /// Description of the underlying source.
    #[must_use]
    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    /// Start the external producer for one request.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::Setup` if the producer cannot be started.
    pub async fn open(&self) -> Result<OpenedSource, StreamError> {
        Ok(self.source.open().await?)
    }

    /// Translate an opened source into `sink`, then terminate the source.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::StreamingUnsupported` (before writing anything)
    /// if the sink cannot deliver partial output, otherwise whatever the
    /// translator reports.
    pub async fn stream<S>(
        &self,
        opened: OpenedSource,
        filter: &TagFilter,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<TranslateSummary, StreamError>
    where
        S: TagSink + ?Sized,
    {
        let OpenedSource { output, mut handle } = opened;

        let result = if sink.supports_streaming() {
            translate(output, filter, sink, cancel).await
        } else {
            drop(output);
            Err(StreamError::StreamingUnsupported)
        };

        handle.terminate().await;
        result
    }

    /// Open the source and stream it in one call.
    ///
    /// # Errors
    ///
    /// See [`Self::open`] and [`Self::stream`].
    pub async fn run<S>(
        &self,
        filter: &TagFilter,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<TranslateSummary, StreamError>
    where
        S: TagSink + ?Sized,
    {
        let opened = self.open().await?;
        self.stream(opened, filter, sink, cancel).await
    }
}

impl std::fmt::Debug for TagStreamService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagStreamService")
            .field("source", &self.source.describe())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::application::ports::{MockTagSource, SourceError};
    use crate::application::services::testing::{CountingHandle, RecordingSink, opened_from};

    const DOC: &str = r#"<taginfo><table name="EXIF"><tag name="Make"/><tag name="Model"/></table></taginfo>"#;

    fn service_serving(xml: &'static str, handle: CountingHandle) -> TagStreamService {
        let mut source = MockTagSource::new();
        source
            .expect_open()
            .returning(move || Ok(opened_from(xml, handle.clone())));
        source.expect_describe().return_const("memory".to_string());
        TagStreamService::new(Arc::new(source))
    }

    #[tokio::test]
    async fn run_streams_and_terminates_source() {
        let handle = CountingHandle::default();
        let service = service_serving(DOC, handle.clone());
        let mut sink = RecordingSink::default();

        let summary = service
            .run(&TagFilter::all(), &mut sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.results, 2);
        assert!(sink.body().ends_with("]}"));
        assert_eq!(handle.terminations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn source_is_terminated_after_cancellation() {
        let handle = CountingHandle::default();
        let service = service_serving(DOC, handle.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut sink = RecordingSink::default();

        let err = service
            .run(&TagFilter::all(), &mut sink, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_client_disconnect());
        assert_eq!(handle.terminations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn source_is_terminated_after_parse_failure() {
        let handle = CountingHandle::default();
        let service = service_serving("<table name='x'><tag></table>", handle.clone());
        let mut sink = RecordingSink::default();

        let err = service
            .run(&TagFilter::all(), &mut sink, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, StreamError::Parse(_)));
        assert_eq!(handle.terminations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_streaming_sink_is_rejected_before_output() {
        let handle = CountingHandle::default();
        let service = service_serving(DOC, handle.clone());
        let mut sink = RecordingSink::buffered();

        let err = service
            .run(&TagFilter::all(), &mut sink, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, StreamError::StreamingUnsupported));
        assert!(sink.flushed.is_empty());
        assert_eq!(handle.terminations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn setup_failure_writes_nothing() {
        let mut source = MockTagSource::new();
        source.expect_open().returning(|| {
            Err(SourceError::Spawn {
                program: "exiftool".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        });
        let service = TagStreamService::new(Arc::new(source));
        let mut sink = RecordingSink::default();

        let err = service
            .run(&TagFilter::all(), &mut sink, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, StreamError::Setup(SourceError::Spawn { .. })));
        assert!(sink.flushed.is_empty());
    }
}
