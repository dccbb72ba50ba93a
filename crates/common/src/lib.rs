//! Common utilities shared by the Doodling trending crates.
//!
//! This crate provides:
//! - Layered configuration loading
//! - Tracing subscriber setup
//! - Duration serialization helpers
//! - DateTime helpers

pub mod config;
pub mod datetime;
pub mod serialization;
pub mod telemetry;

pub use config::{load_layered, ConfigSources, TelemetryConfig};
pub use datetime::{format_datetime, format_duration, now_utc};
pub use telemetry::init_tracing;

/// Common error type used throughout the crate
pub type Result<T> = std::result::Result<T, anyhow::Error>;
