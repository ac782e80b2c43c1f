//! Isolation segment label repository
//!
//! Labels are stored one row per key with the optional prefix split out, so
//! selector queries can match prefix and name independently.

use crate::domain::label_selector::validate_label_value;
use crate::domain::{IsolationSegmentGuid, IsolationSegmentLabel, LabelGuid, LabelKey};
use crate::errors::{IsosegError, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::Utc;
use tracing::instrument;

#[async_trait]
pub trait LabelRepository: Send + Sync {
    /// Insert or replace the value of `key` on the segment
    async fn set_label(
        &self,
        resource_guid: &IsolationSegmentGuid,
        key: &str,
        value: &str,
    ) -> Result<IsolationSegmentLabel>;
    async fn list_labels(
        &self,
        resource_guid: &IsolationSegmentGuid,
    ) -> Result<Vec<IsolationSegmentLabel>>;
    /// Returns whether a label was removed
    async fn delete_label(&self, resource_guid: &IsolationSegmentGuid, key: &str) -> Result<bool>;
}

pub struct SqlxLabelRepository {
    pool: DbPool,
}

impl SqlxLabelRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_key(key: &str) -> Result<LabelKey> {
    LabelKey::parse(key).map_err(|e| IsosegError::validation_field(e.to_string(), "labels"))
}

#[async_trait]
impl LabelRepository for SqlxLabelRepository {
    #[instrument(skip(self), fields(segment_guid = %resource_guid, label_key = %key), name = "db_set_label")]
    async fn set_label(
        &self,
        resource_guid: &IsolationSegmentGuid,
        key: &str,
        value: &str,
    ) -> Result<IsolationSegmentLabel> {
        let key = parse_key(key)?;
        validate_label_value(value)
            .map_err(|e| IsosegError::validation_field(e.to_string(), "labels"))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IsosegError::database(e, "Failed to begin transaction for label update"))?;

        sqlx::query(
            "DELETE FROM isolation_segment_labels
             WHERE resource_guid = ? AND key_prefix IS ? AND key_name = ?",
        )
        .bind(resource_guid)
        .bind(key.prefix.as_deref())
        .bind(&key.name)
        .execute(&mut *tx)
        .await
        .map_err(|e| IsosegError::database(e, format!("Failed to replace label '{}'", key)))?;

        let now = Utc::now();
        let label = sqlx::query_as::<_, IsolationSegmentLabel>(
            "INSERT INTO isolation_segment_labels
                (guid, resource_guid, key_prefix, key_name, value, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING guid, resource_guid, key_prefix, key_name, value, created_at, updated_at",
        )
        .bind(LabelGuid::new())
        .bind(resource_guid)
        .bind(key.prefix.as_deref())
        .bind(&key.name)
        .bind(value)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_foreign_key_violation()) {
                IsosegError::not_found("IsolationSegment", resource_guid.as_str())
            } else {
                IsosegError::database(e, format!("Failed to add label '{}'", key))
            }
        })?;

        tx.commit()
            .await
            .map_err(|e| IsosegError::database(e, "Failed to commit label update"))?;

        Ok(label)
    }

    #[instrument(skip(self), fields(segment_guid = %resource_guid), name = "db_list_labels")]
    async fn list_labels(
        &self,
        resource_guid: &IsolationSegmentGuid,
    ) -> Result<Vec<IsolationSegmentLabel>> {
        sqlx::query_as::<_, IsolationSegmentLabel>(
            "SELECT guid, resource_guid, key_prefix, key_name, value, created_at, updated_at
             FROM isolation_segment_labels
             WHERE resource_guid = ?
             ORDER BY COALESCE(key_prefix, ''), key_name",
        )
        .bind(resource_guid)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            IsosegError::database(e, format!("Failed to list labels for {}", resource_guid))
        })
    }

    #[instrument(skip(self), fields(segment_guid = %resource_guid, label_key = %key), name = "db_delete_label")]
    async fn delete_label(&self, resource_guid: &IsolationSegmentGuid, key: &str) -> Result<bool> {
        let key = parse_key(key)?;

        let result = sqlx::query(
            "DELETE FROM isolation_segment_labels
             WHERE resource_guid = ? AND key_prefix IS ? AND key_name = ?",
        )
        .bind(resource_guid)
        .bind(key.prefix.as_deref())
        .bind(&key.name)
        .execute(&self.pool)
        .await
        .map_err(|e| IsosegError::database(e, format!("Failed to delete label '{}'", key)))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_helpers::TestDatabase;

    #[tokio::test]
    async fn test_set_replaces_existing_value() {
        let db = TestDatabase::new("label_replace").await;
        let segment = db.segment("seg").await;
        let repo = SqlxLabelRepository::new(db.pool.clone());

        repo.set_label(&segment.guid, "env", "dev").await.unwrap();
        repo.set_label(&segment.guid, "env", "prod").await.unwrap();
        repo.set_label(&segment.guid, "example.com/env", "qa").await.unwrap();

        let labels = repo.list_labels(&segment.guid).await.unwrap();
        let pairs: Vec<(String, String)> =
            labels.iter().map(|l| (l.key(), l.value.clone())).collect();
        assert_eq!(
            pairs,
            vec![
                ("env".to_string(), "prod".to_string()),
                ("example.com/env".to_string(), "qa".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_key_and_value_rejected() {
        let db = TestDatabase::new("label_invalid").await;
        let segment = db.segment("seg").await;
        let repo = SqlxLabelRepository::new(db.pool.clone());

        assert!(matches!(
            repo.set_label(&segment.guid, "-bad", "v").await.unwrap_err(),
            IsosegError::Validation { .. }
        ));
        assert!(matches!(
            repo.set_label(&segment.guid, "good", "bad value").await.unwrap_err(),
            IsosegError::Validation { .. }
        ));
    }

    #[tokio::test]
    async fn test_label_on_missing_segment() {
        let db = TestDatabase::new("label_missing_segment").await;
        let repo = SqlxLabelRepository::new(db.pool.clone());

        let err = repo.set_label(&IsolationSegmentGuid::new(), "env", "prod").await.unwrap_err();
        assert!(matches!(err, IsosegError::NotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_delete_label() {
        let db = TestDatabase::new("label_delete").await;
        let segment = db.segment("seg").await;
        let repo = SqlxLabelRepository::new(db.pool.clone());

        repo.set_label(&segment.guid, "env", "prod").await.unwrap();
        assert!(repo.delete_label(&segment.guid, "env").await.unwrap());
        assert!(!repo.delete_label(&segment.guid, "env").await.unwrap());
        assert!(repo.list_labels(&segment.guid).await.unwrap().is_empty());
    }
}
