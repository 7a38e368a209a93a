//! Service configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables (a `.env` file is honoured by the binaries).

use crate::api::control::runner::RunnerConfig;
use crate::api::summary::gemini_config::GeminiConfig;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "WHITEBOARD_CONFIG";

/// Config file used when `WHITEBOARD_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level configuration shared by both binaries
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Listener for the summary service
    #[serde(default = "ServerConfig::summary_default")]
    pub summary: ServerConfig,

    /// Listener for the control service
    #[serde(default = "ServerConfig::control_default")]
    pub control: ServerConfig,

    #[serde(default)]
    pub model: GeminiConfig,

    #[serde(default)]
    pub runner: RunnerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            summary: ServerConfig::summary_default(),
            control: ServerConfig::control_default(),
            model: GeminiConfig::default(),
            runner: RunnerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults if it is absent
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings = listener_defaults(::config::Config::builder())?
            .add_source(::config::File::from(path.as_ref()).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load configuration from `path` (if it exists) and the environment
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_file(path)?.from_env())
    }

    /// Load configuration from the path named by `WHITEBOARD_CONFIG`
    pub fn from_default_location() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(path)
    }

    /// Apply environment variable overrides to every section
    pub fn from_env(self) -> Self {
        Self {
            logging: self.logging.from_env(),
            summary: self.summary.from_env("SUMMARY"),
            control: self.control.from_env("CONTROL"),
            model: self.model.from_env(),
            runner: self.runner.from_env(),
        }
    }
}

/// Seed both listener sections so a file may override single keys
fn listener_defaults(
    mut builder: ::config::ConfigBuilder<::config::builder::DefaultState>,
) -> Result<::config::ConfigBuilder<::config::builder::DefaultState>> {
    for (section, server) in [
        ("summary", ServerConfig::summary_default()),
        ("control", ServerConfig::control_default()),
    ] {
        builder = builder
            .set_default(format!("{}.host", section), server.host)?
            .set_default(format!("{}.port", section), i64::from(server.port))?;
    }
    Ok(builder)
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Pretty
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `whiteboard_services=debug,tower_http=info`
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    pub fn from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("LOG_LEVEL") {
            self.level = val;
        }

        if let Ok(val) = std::env::var("LOG_FORMAT") {
            match val.to_lowercase().as_str() {
                "json" => self.format = LogFormat::Json,
                "pretty" | "text" => self.format = LogFormat::Pretty,
                _ => {}
            }
        }

        self
    }
}

/// Listener configuration for one service
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Largest accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::summary_default()
    }
}

impl ServerConfig {
    /// Summary service listens on the loopback interface only
    pub fn summary_default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            max_body_bytes: default_max_body_bytes(),
        }
    }

    /// Control service listens on all interfaces so the dashboard can reach the device
    pub fn control_default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_bytes: default_max_body_bytes(),
        }
    }

    /// Override from `<PREFIX>_HOST`, `<PREFIX>_PORT` and `<PREFIX>_MAX_BODY_BYTES`
    pub fn from_env(mut self, prefix: &str) -> Self {
        if let Ok(val) = std::env::var(format!("{}_HOST", prefix)) {
            self.host = val;
        }

        if let Ok(val) = std::env::var(format!("{}_PORT", prefix)) {
            if let Ok(port) = val.parse() {
                self.port = port;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_MAX_BODY_BYTES", prefix)) {
            if let Ok(max) = val.parse() {
                self.max_body_bytes = max;
            }
        }

        self
    }

    /// Resolve the socket address to bind
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Address(format!("{}:{}: {}", self.host, self.port, e)))
    }
}
