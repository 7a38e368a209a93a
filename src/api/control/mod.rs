//! Eraser motor control endpoint
//!
//! - POST /control - Run the control script with one action token

pub mod handlers;
pub mod models;
pub mod runner;

pub use handlers::{control, ControlError, ControlState};
pub use models::{ControlRequest, ControlResponse, ControlStatus, MISSING_ACTION};
pub use runner::{ProcessRunner, RunnerConfig, RunnerError, ScriptOutput, ScriptRunner};
