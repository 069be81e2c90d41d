//! Domain Layer - Tag dictionary types and projection rules.
//!
//! This layer contains the records decoded from the external tool and the
//! flattened results served to clients. No I/O happens here.

/// Tag dictionary records, filters and result projection.
pub mod tags;
