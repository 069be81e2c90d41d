//! Application Services
//!
//! - `translator`: XML tag dictionary to streamed JSON, with filtering and
//!   cooperative cancellation
//! - `stream`: per-request orchestration (open source, translate, always
//!   terminate the source)

mod error;
mod stream;
mod translator;

pub use error::StreamError;
pub use stream::TagStreamService;
pub use translator::{CLOSE_MARKER, OPEN_MARKER, TranslateSummary, translate};

#[cfg(test)]
pub(crate) mod testing;
