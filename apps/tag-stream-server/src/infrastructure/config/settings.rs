//! Server Configuration Settings
//!
//! Configuration types for the tag stream server, loaded from environment
//! variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default external command.
const DEFAULT_PROGRAM: &str = "exiftool";

/// Default arguments: list the full tag dictionary as XML.
const DEFAULT_ARGS: &[&str] = &["-listx"];

/// External command settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSettings {
    /// Program to run (looked up on `PATH` when not absolute).
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args: DEFAULT_ARGS.iter().map(|a| (*a).to_string()).collect(),
        }
    }
}

impl CommandSettings {
    /// Command line as a single string, for logs.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Bind address.
    pub host: IpAddr,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
        }
    }
}

impl ServerSettings {
    /// Socket address to bind.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Per-request streaming settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    /// Reject `/tags` requests without a `table` parameter.
    pub require_table: bool,
    /// Capacity (in chunks) of the channel feeding each response body.
    pub buffer_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            require_table: false,
            buffer_capacity: 32,
        }
    }
}

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listener settings.
    pub server: ServerSettings,
    /// External command settings.
    pub command: CommandSettings,
    /// Streaming settings.
    pub stream: StreamSettings,
}

impl ServerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but unusable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = match lookup("TAGS_SERVER_HOST") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TAGS_SERVER_HOST".to_string(), raw))?,
            None => defaults.server.host,
        };

        let port = parse_or(&lookup, "TAGS_SERVER_PORT", defaults.server.port);

        let program = match lookup("EXIFTOOL_PATH") {
            Some(raw) if raw.trim().is_empty() => {
                return Err(ConfigError::EmptyValue("EXIFTOOL_PATH".to_string()));
            }
            Some(raw) => raw.trim().to_string(),
            None => defaults.command.program,
        };

        let args = lookup("EXIFTOOL_ARGS").map_or(defaults.command.args, |raw| {
            raw.split_whitespace().map(str::to_string).collect()
        });

        let require_table = lookup("TAGS_REQUIRE_TABLE")
            .map_or(defaults.stream.require_table, |raw| parse_flag(&raw));

        let buffer_capacity = parse_or(
            &lookup,
            "TAGS_STREAM_BUFFER",
            defaults.stream.buffer_capacity,
        );
        if buffer_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "TAGS_STREAM_BUFFER".to_string(),
                "0".to_string(),
            ));
        }

        Ok(Self {
            server: ServerSettings { host, port },
            command: CommandSettings { program, args },
            stream: StreamSettings {
                require_table,
                buffer_capacity,
            },
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has a value that cannot be used.
    #[error("invalid value for environment variable {0}: {1:?}")]
    InvalidValue(String, String),
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.server.addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.command.display(), "exiftool -listx");
        assert!(!config.stream.require_table);
        assert_eq!(config.stream.buffer_capacity, 32);
    }

    #[test]
    fn reads_all_variables() {
        let config = config_from(&[
            ("TAGS_SERVER_HOST", "127.0.0.1"),
            ("TAGS_SERVER_PORT", "9000"),
            ("EXIFTOOL_PATH", "/usr/local/bin/exiftool"),
            ("EXIFTOOL_ARGS", "-listx  -lang de"),
            ("TAGS_REQUIRE_TABLE", "TRUE"),
            ("TAGS_STREAM_BUFFER", "8"),
        ])
        .unwrap();

        assert_eq!(config.server.addr().to_string(), "127.0.0.1:9000");
        assert_eq!(config.command.program, "/usr/local/bin/exiftool");
        assert_eq!(config.command.args, vec!["-listx", "-lang", "de"]);
        assert!(config.stream.require_table);
        assert_eq!(config.stream.buffer_capacity, 8);
    }

    #[test]
    fn unparseable_port_falls_back_to_default() {
        let config = config_from(&[("TAGS_SERVER_PORT", "http")]).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn invalid_host_is_rejected() {
        let err = config_from(&[("TAGS_SERVER_HOST", "localhost:80")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == "TAGS_SERVER_HOST"));
    }

    #[test]
    fn empty_program_is_rejected() {
        let err = config_from(&[("EXIFTOOL_PATH", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue(key) if key == "EXIFTOOL_PATH"));
    }

    #[test]
    fn zero_buffer_is_rejected() {
        assert!(config_from(&[("TAGS_STREAM_BUFFER", "0")]).is_err());
    }

    #[test]
    fn flag_parsing() {
        assert!(parse_flag("1"));
        assert!(parse_flag("Yes"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("nope"));
    }
}
