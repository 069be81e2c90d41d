//! Configuration Module
//!
//! Configuration loading for the tag stream server.

mod settings;

pub use settings::{CommandSettings, ConfigError, ServerConfig, ServerSettings, StreamSettings};
pub(crate) use settings::parse_flag;
