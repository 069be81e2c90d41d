//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer, plus the HTTP surface.

/// Configuration from environment variables.
pub mod config;

/// External `exiftool` process adapter.
pub mod exiftool;

/// Health check and metrics endpoints.
pub mod health;

/// HTTP router and `/tags` handler.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Streamed response body sink.
pub mod sink;

/// Logging and OpenTelemetry tracing.
pub mod telemetry;

/// Incremental decoder for the tag dictionary XML.
pub mod xml;
