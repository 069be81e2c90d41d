//! Prometheus Metrics Module
//!
//! Exposes stream metrics via Prometheus format for monitoring.
//!
//! # Metrics
//!
//! - `tag_stream_requests_total{outcome}`: finished `/tags` requests
//! - `tag_stream_results_total`: results written to clients
//! - `tag_stream_active_streams`: streams currently running
//! - `tag_stream_duration_seconds{outcome}`: time from spawn to finish
//!
//! Metrics are exposed at `/metrics` on the main HTTP port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::application::services::StreamError;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

fn register_metrics() {
    describe_counter!(
        "tag_stream_requests_total",
        "Finished tag stream requests by outcome"
    );
    describe_counter!(
        "tag_stream_results_total",
        "Tag results written to clients"
    );
    describe_gauge!(
        "tag_stream_active_streams",
        "Tag streams currently running"
    );
    describe_histogram!(
        "tag_stream_duration_seconds",
        "Time from starting the external tool to finishing the stream"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// How a `/tags` request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Closing marker written.
    Completed,
    /// Client went away.
    Disconnected,
    /// Request refused before starting the tool.
    Rejected,
    /// External tool could not be started.
    SetupFailed,
    /// Sink could not stream.
    Unsupported,
    /// Malformed tool output.
    ParseFailed,
    /// Result serialization failed.
    EncodeFailed,
    /// Response write failed.
    WriteFailed,
}

impl StreamOutcome {
    /// Label value for this outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Disconnected => "disconnected",
            Self::Rejected => "rejected",
            Self::SetupFailed => "setup_failed",
            Self::Unsupported => "unsupported",
            Self::ParseFailed => "parse_failed",
            Self::EncodeFailed => "encode_failed",
            Self::WriteFailed => "write_failed",
        }
    }
}

impl From<&StreamError> for StreamOutcome {
    fn from(error: &StreamError) -> Self {
        match error {
            StreamError::Setup(_) => Self::SetupFailed,
            StreamError::StreamingUnsupported => Self::Unsupported,
            StreamError::Parse(_) => Self::ParseFailed,
            StreamError::Encode(_) => Self::EncodeFailed,
            StreamError::Write(_) => Self::WriteFailed,
            StreamError::ClientDisconnected => Self::Disconnected,
        }
    }
}

/// Record a finished request.
pub fn record_request(outcome: StreamOutcome) {
    counter!("tag_stream_requests_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record results written by one stream.
pub fn record_results(count: usize) {
    counter!("tag_stream_results_total").increment(count as u64);
}

/// Update the number of running streams.
#[allow(clippy::cast_precision_loss)]
pub fn set_active_streams(count: usize) {
    gauge!("tag_stream_active_streams").set(count as f64);
}

/// Record how long a stream ran.
pub fn record_stream_duration(outcome: StreamOutcome, duration: Duration) {
    histogram!("tag_stream_duration_seconds", "outcome" => outcome.as_str())
        .record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================
