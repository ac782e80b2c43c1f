//! Organization repository
//!
//! Organizations are owned by a neighbouring service; this repository only
//! covers what isolation segment entitlement needs: creating rows, reading
//! them back, and choosing an org's default segment.

use crate::domain::{IsolationSegmentGuid, Organization, OrganizationGuid};
use crate::errors::{IsosegError, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::Utc;
use tracing::instrument;

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn create_organization(&self, name: &str) -> Result<Organization>;
    async fn get_organization(&self, guid: &OrganizationGuid) -> Result<Option<Organization>>;
    async fn get_organization_by_name(&self, name: &str) -> Result<Option<Organization>>;
    async fn set_default_isolation_segment(
        &self,
        guid: &OrganizationGuid,
        segment_guid: Option<&IsolationSegmentGuid>,
    ) -> Result<Organization>;
}

pub struct SqlxOrganizationRepository {
    pool: DbPool,
}

impl SqlxOrganizationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationRepository for SqlxOrganizationRepository {
    #[instrument(skip(self), fields(org_name = %name), name = "db_create_organization")]
    async fn create_organization(&self, name: &str) -> Result<Organization> {
        if name.trim().is_empty() {
            return Err(IsosegError::validation_field("name must not be blank", "name"));
        }

        let now = Utc::now();
        sqlx::query_as::<_, Organization>(
            "INSERT INTO organizations (guid, name, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             RETURNING id, guid, name, default_isolation_segment_guid, created_at, updated_at",
        )
        .bind(OrganizationGuid::new())
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| IsosegError::from_write(e, format!("Organization name '{}'", name), "organization"))
    }

    #[instrument(skip(self), fields(org_guid = %guid), name = "db_get_organization")]
    async fn get_organization(&self, guid: &OrganizationGuid) -> Result<Option<Organization>> {
        sqlx::query_as::<_, Organization>(
            "SELECT id, guid, name, default_isolation_segment_guid, created_at, updated_at
             FROM organizations WHERE guid = ?",
        )
        .bind(guid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IsosegError::database(e, format!("Failed to fetch organization: {}", guid)))
    }

    #[instrument(skip(self), fields(org_name = %name), name = "db_get_organization_by_name")]
    async fn get_organization_by_name(&self, name: &str) -> Result<Option<Organization>> {
        sqlx::query_as::<_, Organization>(
            "SELECT id, guid, name, default_isolation_segment_guid, created_at, updated_at
             FROM organizations WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            IsosegError::database(e, format!("Failed to fetch organization by name: {}", name))
        })
    }

    /// Point the organization at one of its entitled segments, or clear the default
    #[instrument(skip(self), fields(org_guid = %guid), name = "db_set_default_isolation_segment")]
    async fn set_default_isolation_segment(
        &self,
        guid: &OrganizationGuid,
        segment_guid: Option<&IsolationSegmentGuid>,
    ) -> Result<Organization> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            IsosegError::database(e, "Failed to begin transaction for default isolation segment")
        })?;

        if let Some(segment_guid) = segment_guid {
            let entitled = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM organizations_isolation_segments
                 WHERE organization_guid = ? AND isolation_segment_guid = ?",
            )
            .bind(guid)
            .bind(segment_guid)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                IsosegError::database(e, format!("Failed to check entitlement for {}", guid))
            })?;

            if entitled == 0 {
                return Err(IsosegError::validation_field(
                    format!(
                        "Organization {} is not entitled to isolation segment {}",
                        guid, segment_guid
                    ),
                    "default_isolation_segment_guid",
                ));
            }
        }

        let org = sqlx::query_as::<_, Organization>(
            "UPDATE organizations SET default_isolation_segment_guid = ?, updated_at = ?
             WHERE guid = ?
             RETURNING id, guid, name, default_isolation_segment_guid, created_at, updated_at",
        )
        .bind(segment_guid)
        .bind(Utc::now())
        .bind(guid)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| IsosegError::database(e, format!("Failed to update organization: {}", guid)))?
        .ok_or_else(|| IsosegError::not_found("Organization", guid.as_str()))?;

        tx.commit().await.map_err(|e| {
            IsosegError::database(e, "Failed to commit default isolation segment update")
        })?;

        Ok(org)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_helpers::TestDatabase;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = TestDatabase::new("org_create").await;
        let repo = SqlxOrganizationRepository::new(db.pool.clone());

        let org = repo.create_organization("acme").await.unwrap();
        assert_eq!(repo.get_organization(&org.guid).await.unwrap(), Some(org.clone()));
        assert_eq!(repo.get_organization_by_name("acme").await.unwrap(), Some(org));
        assert!(repo.get_organization_by_name("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let db = TestDatabase::new("org_duplicate").await;
        let repo = SqlxOrganizationRepository::new(db.pool.clone());

        repo.create_organization("acme").await.unwrap();
        assert!(matches!(
            repo.create_organization("acme").await.unwrap_err(),
            IsosegError::Conflict { .. }
        ));
    }

    #[tokio::test]
    async fn test_default_segment_requires_entitlement() {
        let db = TestDatabase::new("org_default").await;
        let segment = db.segment("seg").await;
        let org = db.org("acme").await;
        let repo = SqlxOrganizationRepository::new(db.pool.clone());

        let err = repo.set_default_isolation_segment(&org.guid, Some(&segment.guid)).await.unwrap_err();
        assert!(matches!(err, IsosegError::Validation { .. }));

        db.assign(&segment, &[&org]).await;
        let updated = repo.set_default_isolation_segment(&org.guid, Some(&segment.guid)).await.unwrap();
        assert_eq!(updated.default_isolation_segment_guid, Some(segment.guid.clone()));

        let cleared = repo.set_default_isolation_segment(&org.guid, None).await.unwrap();
        assert!(cleared.default_isolation_segment_guid.is_none());
    }

    #[tokio::test]
    async fn test_default_segment_unknown_org() {
        let db = TestDatabase::new("org_default_missing").await;
        let repo = SqlxOrganizationRepository::new(db.pool.clone());

        let err = repo.set_default_isolation_segment(&OrganizationGuid::new(), None).await.unwrap_err();
        assert!(matches!(err, IsosegError::NotFound { .. }));
    }
}
