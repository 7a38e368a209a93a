//! Data models for the control API

use serde::{Deserialize, Serialize};

/// Message returned when `action` is absent
pub const MISSING_ACTION: &str = "Missing action parameter";

/// Control request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlRequest {
    #[serde(default)]
    pub action: Option<String>,
}

impl ControlRequest {
    /// The action token, if present and non-empty
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref().filter(|a| !a.is_empty())
    }
}

/// Outcome marker in every control response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlStatus {
    Success,
    Error,
}

/// Control response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub status: ControlStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl ControlResponse {
    pub fn success(action: &str, output: String) -> Self {
        Self {
            status: ControlStatus::Success,
            message: format!("Command {} executed successfully", action),
            output: Some(output),
            stderr: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ControlStatus::Error,
            message: message.into(),
            output: None,
            stderr: None,
        }
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = Some(stderr.into());
        self
    }
}
