//! Test database utilities for integration tests.
//!
//! Provides file-based SQLite databases under `data/test/` for test isolation
//! and easier debugging of test failures.

#![allow(clippy::duplicate_mod)]

use isoseg::config::DatabaseConfig;
use isoseg::storage::{create_pool, DbPool};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Counter for generating unique database names within a test run
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_db_dir() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(manifest_dir).join("data").join("test")
}

fn unique_db_name(prefix: &str) -> String {
    let counter = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let uuid_short = &Uuid::new_v4().to_string()[..8];
    format!("{}_{}_{}_{}.db", prefix, std::process::id(), counter, uuid_short)
}

/// A test database that automatically cleans up on drop.
pub struct TestDatabase {
    pub pool: DbPool,
    pub path: PathBuf,
    cleanup_on_drop: bool,
}

impl TestDatabase {
    /// Create a new test database with migrations applied, deleted on drop.
    pub async fn new(prefix: &str) -> Self {
        Self::with_options(prefix, true, true).await
    }

    /// Create a new test database with no schema.
    pub async fn new_without_migrations(prefix: &str) -> Self {
        Self::with_options(prefix, true, false).await
    }

    /// Create a test database that persists after the test (for debugging).
    pub async fn persistent(prefix: &str) -> Self {
        Self::with_options(prefix, false, true).await
    }

    pub async fn with_options(prefix: &str, cleanup_on_drop: bool, run_migrations: bool) -> Self {
        let db_dir = test_db_dir();
        std::fs::create_dir_all(&db_dir).expect("create test database directory");

        let path = db_dir.join(unique_db_name(prefix));
        let config = DatabaseConfig {
            url: format!("sqlite://{}", path.display()),
            max_connections: 5,
            min_connections: 1,
            auto_migrate: run_migrations,
            ..Default::default()
        };

        let pool = create_pool(&config).await.expect("create test database pool");

        Self { pool, path, cleanup_on_drop }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        if self.cleanup_on_drop {
            // Best effort cleanup - don't panic in drop
            if let Err(e) = std::fs::remove_file(&self.path) {
                eprintln!("Warning: Failed to cleanup test database {:?}: {}", self.path, e);
            }
            let _ = std::fs::remove_file(self.path.with_extension("db-wal"));
            let _ = std::fs::remove_file(self.path.with_extension("db-shm"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_creates_file() {
        let db = TestDatabase::new("test_creates_file").await;
        assert!(db.path.exists(), "Database file should exist");

        let result: (i64,) =
            sqlx::query_as("SELECT 1").fetch_one(&db.pool).await.expect("query should succeed");
        assert_eq!(result.0, 1);
    }

    #[tokio::test]
    async fn test_database_cleanup_on_drop() {
        let path = {
            let db = TestDatabase::new("test_cleanup").await;
            db.pool.close().await;
            db.path.clone()
        };
        assert!(!path.exists(), "Database file should be removed after drop");
    }
}
