//! Crate-level error types
//!
//! Request-path failures have their own enums next to the handlers that
//! turn them into HTTP responses. This type covers everything that can go
//! wrong while a service is starting up or shutting down.

use thiserror::Error;

/// Startup and lifecycle errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid bind address: {0}")]
    Address(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<::config::ConfigError> for Error {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
