//! # Observability Infrastructure
//!
//! Structured logging for the isolation segment service.

pub mod logging;

pub use logging::{init_logging, log_config_info};

use crate::config::ObservabilityConfig;
use crate::errors::Result;
use ::tracing::info;

/// Initialize logging and report the effective settings
pub fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    let installed = init_logging(config)?;

    info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        json_logging = config.json_logging,
        subscriber_installed = installed,
        "Observability initialized"
    );

    Ok(())
}
