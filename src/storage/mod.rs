//! # Storage and Persistence
//!
//! SQLite connectivity, schema migrations, and repositories for isolation
//! segments, organizations, and labels.

pub mod migrations;
pub mod pool;
pub mod repositories;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use crate::config::DatabaseConfig;

pub use migrations::{
    get_migration_version, list_applied_migrations, run_migrations, validate_migrations,
    MigrationInfo,
};
pub use pool::{create_pool, get_pool_stats, DbPool, PoolStats};
pub use repositories::{
    IsolationSegmentRepository, LabelRepository, OrganizationRepository,
    SqlxIsolationSegmentRepository, SqlxLabelRepository, SqlxOrganizationRepository,
};

use crate::errors::{IsosegError, Result};

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| IsosegError::database(e, "Database connectivity check failed"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_check_connection() {
        let db = test_helpers::TestDatabase::without_migrations("check_connection").await;
        check_connection(&db.pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_database_url() {
        let config = DatabaseConfig { url: "invalid://url".to_string(), ..Default::default() };
        assert!(create_pool(&config).await.is_err());
    }
}
