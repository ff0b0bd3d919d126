//! HTTP server for the referral program.
//!
//! Wires the `referral_hub` managers into an axum router, loads configuration
//! from the environment and installs logging and metrics.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
