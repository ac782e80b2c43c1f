//! # Structured Logging
//!
//! Subscriber setup and span helpers built on the tracing ecosystem.

use crate::config::ObservabilityConfig;
use crate::errors::{IsosegError, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Create a tracing span for database operations.
///
/// Use the named-field form to attach org context:
///
/// ```rust,ignore
/// let span = db_span!("list_isolation_segments", org_guid = "org-1");
/// ```
#[macro_export]
macro_rules! db_span {
    ($operation:expr) => {
        tracing::debug_span!(
            "db_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            org_guid = tracing::field::Empty
        )
    };
    ($operation:expr, org_guid = $org:expr) => {
        tracing::debug_span!(
            "db_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            org_guid = $org
        )
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "db_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            org_guid = tracing::field::Empty,
            $($field)*
        )
    };
}

/// Build the `EnvFilter` for the configured level.
///
/// `RUST_LOG` wins when it is set.
pub fn env_filter(config: &ObservabilityConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.log_level).map_err(|e| {
        IsosegError::config_with_source(
            format!("Invalid log level '{}'", config.log_level),
            Box::new(e),
        )
    })
}

/// Install the global subscriber, writing to stderr.
///
/// Returns `Ok(false)` when a subscriber was already installed (for example by a test harness).
pub fn init_logging(config: &ObservabilityConfig) -> Result<bool> {
    let filter = env_filter(config)?;

    let installed = if config.json_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()
            .is_ok()
    };

    Ok(installed)
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        service_name = %config.observability.service_name,
        database_url = %crate::storage::pool::sanitize_url(&config.database.url),
        max_connections = config.database.max_connections,
        auto_migrate = config.database.auto_migrate,
        json_logging = config.observability.json_logging,
        "isoseg configuration"
    );
}
