//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the streaming translator and the port interfaces
//! that define how it talks to the external tool and to the client.

/// Port interfaces for the tag source and the output sink.
pub mod ports;

/// Streaming translator and the per-request stream service.
pub mod services;
