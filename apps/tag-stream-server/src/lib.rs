#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Tag Stream Server - ExifTool Tag Dictionary over HTTP
//!
//! An HTTP service that runs `exiftool -listx` per request, filters the
//! XML tag dictionary by table and tag name, and streams the matches to
//! the client as JSON while the tool is still producing output.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Tag dictionary types and projection rules
//!   - `tags`: records, entries, filters and flattened results
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interfaces for the tag source and output sink
//!   - `services`: Streaming translator and per-request orchestration
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `exiftool`: Child process producing the XML
//!   - `xml`: Incremental record decoder
//!   - `sink`: Channel-backed response body
//!   - `http`: Router and `/tags` handler
//!   - `config`, `health`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//! exiftool -listx ──► RecordDecoder ──► filter ──► JSON ──► ChannelSink ──► client
//!       ▲                                                        │
//!       └──────────── terminate on finish / disconnect ◄─────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Tag dictionary types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::tags::{Description, Entry, Record, TagFilter, TagResult};

// Application
pub use application::ports::{
    OpenedSource, SinkError, SourceError, SourceHandle, TagOutput, TagSink, TagSource,
};
pub use application::services::{StreamError, TagStreamService, TranslateSummary, translate};

// Infrastructure config
pub use infrastructure::config::{
    CommandSettings, ConfigError, ServerConfig, ServerSettings, StreamSettings,
};

// Adapters
pub use infrastructure::exiftool::ExiftoolSource;
pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::sink::ChannelSink;

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
