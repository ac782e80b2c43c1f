//! Test database utilities for in-library tests.
//!
//! Each `TestDatabase` owns a fresh SQLite file inside a temporary directory,
//! so tests never share state. The directory is removed when the struct drops.
//!
//! This module is only available in test builds (`#[cfg(test)]`).

use crate::config::DatabaseConfig;
use crate::domain::{IsolationSegment, Organization};
use crate::storage::repositories::{
    IsolationSegmentRepository, OrganizationRepository, SqlxIsolationSegmentRepository,
    SqlxOrganizationRepository,
};
use crate::storage::{create_pool, DbPool};
use tempfile::TempDir;

/// A test database backed by a temporary SQLite file.
///
/// Keep this struct alive for the duration of the test; dropping it deletes the file.
pub struct TestDatabase {
    pub pool: DbPool,
    _dir: TempDir,
}

impl TestDatabase {
    /// Create a new test database with all migrations applied.
    ///
    /// The `prefix` names the database file, which helps when debugging a failing test.
    pub async fn new(prefix: &str) -> Self {
        Self::with_migrations(prefix, true).await
    }

    /// Create a new test database with no schema.
    pub async fn without_migrations(prefix: &str) -> Self {
        Self::with_migrations(prefix, false).await
    }

    async fn with_migrations(prefix: &str, auto_migrate: bool) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .unwrap_or_else(|e| panic!("Failed to create temp dir for {}: {}", prefix, e));

        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join(format!("{}.db", prefix)).display()),
            auto_migrate,
            max_connections: 2,
            min_connections: 1,
            ..Default::default()
        };

        let pool = create_pool(&config)
            .await
            .unwrap_or_else(|e| panic!("Failed to create test pool for {}: {}", prefix, e));

        Self { pool, _dir: dir }
    }

    /// Create an isolation segment with the given name
    pub async fn segment(&self, name: &str) -> IsolationSegment {
        SqlxIsolationSegmentRepository::new(self.pool.clone())
            .create_isolation_segment(name)
            .await
            .unwrap_or_else(|e| panic!("Failed to create isolation segment '{}': {}", name, e))
    }

    /// Create an organization with the given name
    pub async fn org(&self, name: &str) -> Organization {
        SqlxOrganizationRepository::new(self.pool.clone())
            .create_organization(name)
            .await
            .unwrap_or_else(|e| panic!("Failed to create organization '{}': {}", name, e))
    }

    /// Entitle `orgs` to `segment`
    pub async fn assign(&self, segment: &IsolationSegment, orgs: &[&Organization]) {
        let guids: Vec<_> = orgs.iter().map(|o| o.guid.clone()).collect();
        SqlxIsolationSegmentRepository::new(self.pool.clone())
            .assign_organizations(&segment.guid, &guids)
            .await
            .unwrap_or_else(|e| panic!("Failed to assign '{}': {}", segment.name, e));
    }
}
