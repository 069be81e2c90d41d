//! HTTP API
//!
//! The router is built explicitly from an [`AppState`] at startup.
//!
//! # Endpoints
//!
//! - `GET /tags?table=<name>&tag=<name>` - Streamed, filtered tag dictionary
//! - `GET /health`, `GET /healthz`, `GET /metrics` - See the health module
//!
//! A `/tags` request starts the external tool before responding, so a
//! setup failure still gets a proper `500`. After that the status is
//! committed: the translator runs in its own task and feeds the body
//! through a [`ChannelSink`]. Mid-stream failures abort the body; a
//! dropped body cancels the task.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use axum::{
    Router,
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::application::services::{StreamError, TagStreamService, TranslateSummary};
use crate::domain::tags::TagFilter;
use crate::infrastructure::config::StreamSettings;
use crate::infrastructure::health::{health_handler, liveness_handler, metrics_handler};
use crate::infrastructure::metrics::{
    StreamOutcome, record_request, record_results, record_stream_duration, set_active_streams,
};
use crate::infrastructure::sink::{BodyChunk, ChannelSink};

// =============================================================================
// State
// =============================================================================

/// Shared state for all handlers.
pub struct AppState {
    pub(crate) service: TagStreamService,
    pub(crate) settings: StreamSettings,
    pub(crate) shutdown: CancellationToken,
    pub(crate) version: String,
    pub(crate) started_at: Instant,
    active: AtomicUsize,
}

impl AppState {
    /// Create handler state.
    ///
    /// Every request's cancellation token is a child of `shutdown`.
    #[must_use]
    pub fn new(
        service: TagStreamService,
        settings: StreamSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            service,
            settings,
            shutdown,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
            active: AtomicUsize::new(0),
        }
    }

    /// Number of tag streams currently running.
    #[must_use]
    pub fn active_streams(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    fn track_stream(&self) -> ActiveStream<'_> {
        let count = self.active.fetch_add(1, Ordering::Relaxed) + 1;
        set_active_streams(count);
        ActiveStream { state: self }
    }
}

struct ActiveStream<'a> {
    state: &'a AppState,
}

impl Drop for ActiveStream<'_> {
    fn drop(&mut self) {
        let count = self.state.active.fetch_sub(1, Ordering::Relaxed) - 1;
        set_active_streams(count);
    }
}

// =============================================================================
// Router
// =============================================================================

/// Create the Axum router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tags", get(tags_handler))
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Query parameters of `/tags`. Both are optional.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TagsQuery {
    /// Exact table name.
    pub table: Option<String>,
    /// Exact tag name.
    pub tag: Option<String>,
}

impl TagsQuery {
    /// Build from decoded query pairs. The first occurrence of a key wins;
    /// unknown keys are ignored.
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "table" => &mut query.table,
                "tag" => &mut query.tag,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

async fn tags_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let query = TagsQuery::from_pairs(pairs);
    let filter = TagFilter::new(query.table.as_deref(), query.tag.as_deref());
    let span = tracing::info_span!(
        "tags",
        request_id = %Uuid::new_v4(),
        table = filter.table().unwrap_or_default(),
        tag = filter.tag().unwrap_or_default(),
    );

    if state.settings.require_table && filter.table().is_none() {
        span.in_scope(|| tracing::info!("Rejected request without table"));
        record_request(StreamOutcome::Rejected);
        return Err(ApiError::bad_request("table name required"));
    }

    let opened = match state.service.open().instrument(span.clone()).await {
        Ok(opened) => opened,
        Err(e) => {
            span.in_scope(|| tracing::error!(error = %e, "Failed to start tag stream"));
            record_request(StreamOutcome::from(&e));
            return Err(e.into());
        }
    };

    let (tx, rx) = mpsc::channel(state.settings.buffer_capacity);
    let cancel = state.shutdown.child_token();
    let finished = CancellationToken::new();
    watch_disconnect(tx.clone(), cancel.clone(), finished.clone());

    let task_state = Arc::clone(&state);
    tokio::spawn(
        async move {
            let _finished = finished.drop_guard();
            let _active = task_state.track_stream();
            let started = Instant::now();
            let mut sink = ChannelSink::new(tx);

            let result = task_state
                .service
                .stream(opened, &filter, &mut sink, &cancel)
                .await;
            finish_stream(result, &mut sink, started).await;
        }
        .instrument(span),
    );

    let body = Body::from_stream(ReceiverStream::new(rx));
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// Cancel `cancel` when the body receiver is dropped, until `finished`.
fn watch_disconnect(
    tx: mpsc::Sender<BodyChunk>,
    cancel: CancellationToken,
    finished: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            () = tx.closed() => cancel.cancel(),
            () = finished.cancelled() => {}
        }
    });
}

async fn finish_stream(
    result: Result<TranslateSummary, StreamError>,
    sink: &mut ChannelSink,
    started: Instant,
) {
    let elapsed = started.elapsed();
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    let outcome = match &result {
        Ok(summary) => {
            tracing::info!(
                records = summary.records,
                entries = summary.entries,
                results = summary.results,
                elapsed_ms,
                "Tag stream completed"
            );
            record_results(summary.results);
            StreamOutcome::Completed
        }
        Err(e) if e.is_client_disconnect() => {
            tracing::info!(elapsed_ms, "Client closed connection");
            StreamOutcome::Disconnected
        }
        Err(e) => {
            tracing::error!(error = %e, elapsed_ms, "Tag stream failed");
            sink.abort(e.to_string()).await;
            StreamOutcome::from(e)
        }
    };

    record_request(outcome);
    record_stream_duration(outcome, elapsed);
}

// =============================================================================
// Errors
// =============================================================================

/// Plain-text error response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<StreamError> for ApiError {
    fn from(error: StreamError) -> Self {
        Self::internal(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message,
        )
            .into_response()
    }
}

// =============================================================================
// Tests
// =============================================================================
