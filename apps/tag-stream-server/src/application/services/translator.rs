//! Streaming Translator
//!
//! Turns the tag dictionary XML into a JSON document of the form
//! `{"tags": [ <TagResult>, ... ]}` while it is still being produced.
//!
//! The opening marker is flushed first, then each matching result as soon
//! as its record has been decoded, then the closing marker once the input
//! is exhausted. Any failure or cancellation stops output where it is: the
//! closing marker is only written on success.

use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;

use super::StreamError;
use crate::application::ports::TagSink;
use crate::domain::tags::TagFilter;
use crate::infrastructure::xml::{DecodedToken, RecordDecoder};

/// Bytes written before the first result.
pub const OPEN_MARKER: &[u8] = b"{\"tags\": [";

/// Bytes written after the last result.
pub const CLOSE_MARKER: &[u8] = b"]}";

/// Counters for one completed translation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslateSummary {
    /// Records decoded.
    pub records: usize,
    /// Entries decoded across all records.
    pub entries: usize,
    /// Results written to the sink.
    pub results: usize,
}

/// Translate `output` into the sink, keeping entries that pass `filter`.
///
/// `cancel` is checked before every top-level token and before every
/// result, so after cancellation at most the result already in flight
/// reaches the sink.
///
/// # Errors
///
/// - `StreamError::ClientDisconnected` if `cancel` fires or the sink
///   reports that its consumer is gone
/// - `StreamError::Parse` on malformed input
/// - `StreamError::Encode` if a result cannot be serialized
/// - `StreamError::Write` on any other sink failure
pub async fn translate<R, S>(
    output: R,
    filter: &TagFilter,
    sink: &mut S,
    cancel: &CancellationToken,
) -> Result<TranslateSummary, StreamError>
where
    R: AsyncBufRead + Unpin + Send,
    S: TagSink + ?Sized,
{
    let mut decoder = RecordDecoder::new(output);
    let mut summary = TranslateSummary::default();
    let mut scratch = Vec::with_capacity(512);

    sink.write_all(OPEN_MARKER).await?;
    sink.flush().await?;

    loop {
        let token = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StreamError::ClientDisconnected),
            token = decoder.next_token() => token?,
        };

        let record = match token {
            DecodedToken::Record(record) => record,
            DecodedToken::Other => continue,
            DecodedToken::Eof => break,
        };

        summary.records += 1;
        summary.entries += record.entries.len();

        for result in record.matching_results(filter) {
            if cancel.is_cancelled() {
                return Err(StreamError::ClientDisconnected);
            }

            scratch.clear();
            if summary.results > 0 {
                scratch.push(b',');
            }
            serde_json::to_writer(&mut scratch, &result)?;

            sink.write_all(&scratch).await?;
            sink.flush().await?;
            summary.results += 1;
        }

        tracing::trace!(
            record = %record.name,
            entries = record.entries.len(),
            results = summary.results,
            "Record translated"
        );
    }

    sink.write_all(CLOSE_MARKER).await?;
    sink.flush().await?;

    Ok(summary)
}

// =============================================================================
// Tests
// =============================================================================
