//! Whiteboard services
//!
//! Two small HTTP services for the smart whiteboard eraser:
//!
//! - the summary service forwards a whiteboard photo to a vision-capable
//!   language model and relays its short text summary;
//! - the control service runs the local motor control script with the
//!   requested action and reports its output.
//!
//! Each binary builds its collaborator (model client or script runner) once
//! at startup and hands it to the router as shared state.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod observability;
pub mod server;

pub use config::Config;
pub use error::{Error, Result};
