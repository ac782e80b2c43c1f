//! # Configuration Management
//!
//! Environment-driven settings for the database pool and logging.

pub mod settings;

pub use settings::{AppConfig, DatabaseConfig, ObservabilityConfig};
