//! HTTP API for the summary and control services

pub mod control;
pub mod routes;
pub mod summary;

pub use routes::{build_control_router, build_summary_router};
