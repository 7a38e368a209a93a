//! Logging setup and health reporting

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::Config(format!("invalid log level '{}': {}", config.level, e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    installed.map_err(|e| Error::Internal(format!("failed to install tracing subscriber: {}", e)))
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

impl HealthResponse {
    pub fn ok(service: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response() {
        let health = HealthResponse::ok("control-service");
        assert_eq!(health.status, "ok");
        assert_eq!(health.service, "control-service");
        assert!(!health.version.is_empty());
    }
}
