//! Isolation segment repository
//!
//! CRUD for isolation segments and their organization entitlements. Listing
//! with filters lives in [`crate::fetchers`]; this repository covers the
//! writes and single-row reads around it.

use crate::domain::{
    validate_isolation_segment_name, IsolationSegment, IsolationSegmentGuid, OrganizationGuid,
};
use crate::errors::{IsosegError, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::Utc;
use tracing::instrument;

const SELECT_COLUMNS: &str = "SELECT id, guid, name, created_at, updated_at FROM isolation_segments";

#[async_trait]
pub trait IsolationSegmentRepository: Send + Sync {
    async fn create_isolation_segment(&self, name: &str) -> Result<IsolationSegment>;
    async fn get_isolation_segment(
        &self,
        guid: &IsolationSegmentGuid,
    ) -> Result<Option<IsolationSegment>>;
    async fn rename_isolation_segment(
        &self,
        guid: &IsolationSegmentGuid,
        name: &str,
    ) -> Result<IsolationSegment>;
    async fn delete_isolation_segment(&self, guid: &IsolationSegmentGuid) -> Result<()>;
    async fn assign_organizations(
        &self,
        guid: &IsolationSegmentGuid,
        org_guids: &[OrganizationGuid],
    ) -> Result<()>;
    async fn unassign_organization(
        &self,
        guid: &IsolationSegmentGuid,
        org_guid: &OrganizationGuid,
    ) -> Result<()>;
    async fn list_organization_guids(
        &self,
        guid: &IsolationSegmentGuid,
    ) -> Result<Vec<OrganizationGuid>>;
}

pub struct SqlxIsolationSegmentRepository {
    pool: DbPool,
}

impl SqlxIsolationSegmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IsolationSegmentRepository for SqlxIsolationSegmentRepository {
    #[instrument(skip(self), fields(segment_name = %name), name = "db_create_isolation_segment")]
    async fn create_isolation_segment(&self, name: &str) -> Result<IsolationSegment> {
        validate_isolation_segment_name(name).map_err(|e| IsosegError::validation_field(e, "name"))?;

        let guid = IsolationSegmentGuid::new();
        let now = Utc::now();

        sqlx::query_as::<_, IsolationSegment>(
            "INSERT INTO isolation_segments (guid, name, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             RETURNING id, guid, name, created_at, updated_at",
        )
        .bind(&guid)
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            IsosegError::from_write(
                e,
                format!("Isolation segment name '{}'", name),
                "isolation_segment",
            )
        })
    }

    #[instrument(skip(self), fields(segment_guid = %guid), name = "db_get_isolation_segment")]
    async fn get_isolation_segment(
        &self,
        guid: &IsolationSegmentGuid,
    ) -> Result<Option<IsolationSegment>> {
        sqlx::query_as::<_, IsolationSegment>(&format!("{} WHERE guid = ?", SELECT_COLUMNS))
            .bind(guid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                IsosegError::database(e, format!("Failed to fetch isolation segment: {}", guid))
            })
    }

    #[instrument(skip(self), fields(segment_guid = %guid, segment_name = %name), name = "db_rename_isolation_segment")]
    async fn rename_isolation_segment(
        &self,
        guid: &IsolationSegmentGuid,
        name: &str,
    ) -> Result<IsolationSegment> {
        validate_isolation_segment_name(name).map_err(|e| IsosegError::validation_field(e, "name"))?;

        if guid.as_str() == crate::domain::SHARED_ISOLATION_SEGMENT_GUID {
            return Err(IsosegError::conflict(
                "The shared isolation segment cannot be renamed",
                "isolation_segment",
            ));
        }

        sqlx::query_as::<_, IsolationSegment>(
            "UPDATE isolation_segments SET name = ?, updated_at = ? WHERE guid = ?
             RETURNING id, guid, name, created_at, updated_at",
        )
        .bind(name)
        .bind(Utc::now())
        .bind(guid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            IsosegError::from_write(
                e,
                format!("Isolation segment name '{}'", name),
                "isolation_segment",
            )
        })?
        .ok_or_else(|| IsosegError::not_found("IsolationSegment", guid.as_str()))
    }

    #[instrument(skip(self), fields(segment_guid = %guid), name = "db_delete_isolation_segment")]
    async fn delete_isolation_segment(&self, guid: &IsolationSegmentGuid) -> Result<()> {
        if guid.as_str() == crate::domain::SHARED_ISOLATION_SEGMENT_GUID {
            return Err(IsosegError::conflict(
                "The shared isolation segment cannot be deleted",
                "isolation_segment",
            ));
        }

        let entitled = self.list_organization_guids(guid).await?;
        if !entitled.is_empty() {
            return Err(IsosegError::conflict(
                format!(
                    "Revoke the organization entitlements for isolation segment {} before deleting it",
                    guid
                ),
                "isolation_segment",
            ));
        }

        let result = sqlx::query("DELETE FROM isolation_segments WHERE guid = ?")
            .bind(guid)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                IsosegError::database(e, format!("Failed to delete isolation segment: {}", guid))
            })?;

        if result.rows_affected() == 0 {
            return Err(IsosegError::not_found("IsolationSegment", guid.as_str()));
        }
        Ok(())
    }

    #[instrument(skip(self, org_guids), fields(segment_guid = %guid, org_count = org_guids.len()), name = "db_assign_organizations")]
    async fn assign_organizations(
        &self,
        guid: &IsolationSegmentGuid,
        org_guids: &[OrganizationGuid],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            IsosegError::database(e, "Failed to begin transaction for isolation segment assignment")
        })?;

        let segment_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM isolation_segments WHERE guid = ?")
                .bind(guid)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    IsosegError::database(e, format!("Failed to fetch isolation segment: {}", guid))
                })?;
        if segment_exists == 0 {
            return Err(IsosegError::not_found("IsolationSegment", guid.as_str()));
        }

        for org_guid in org_guids {
            let org_exists =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM organizations WHERE guid = ?")
                    .bind(org_guid)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| {
                        IsosegError::database(e, format!("Failed to fetch organization: {}", org_guid))
                    })?;
            if org_exists == 0 {
                return Err(IsosegError::not_found("Organization", org_guid.as_str()));
            }

            sqlx::query(
                "INSERT OR IGNORE INTO organizations_isolation_segments
                    (organization_guid, isolation_segment_guid)
                 VALUES (?, ?)",
            )
            .bind(org_guid)
            .bind(guid)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                IsosegError::database(
                    e,
                    format!("Failed to entitle organization {} to isolation segment {}", org_guid, guid),
                )
            })?;
        }

        tx.commit().await.map_err(|e| {
            IsosegError::database(e, "Failed to commit isolation segment assignment")
        })?;

        Ok(())
    }

    #[instrument(skip(self), fields(segment_guid = %guid, org_guid = %org_guid), name = "db_unassign_organization")]
    async fn unassign_organization(
        &self,
        guid: &IsolationSegmentGuid,
        org_guid: &OrganizationGuid,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            IsosegError::database(e, "Failed to begin transaction for isolation segment unassignment")
        })?;

        let default_guid = sqlx::query_scalar::<_, Option<IsolationSegmentGuid>>(
            "SELECT default_isolation_segment_guid FROM organizations WHERE guid = ?",
        )
        .bind(org_guid)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| IsosegError::database(e, format!("Failed to fetch organization: {}", org_guid)))?
        .ok_or_else(|| IsosegError::not_found("Organization", org_guid.as_str()))?;

        if default_guid.as_ref() == Some(guid) {
            return Err(IsosegError::conflict(
                format!(
                    "Cannot revoke isolation segment {} from organization {}: it is the organization's default",
                    guid, org_guid
                ),
                "isolation_segment",
            ));
        }

        sqlx::query(
            "DELETE FROM organizations_isolation_segments
             WHERE organization_guid = ? AND isolation_segment_guid = ?",
        )
        .bind(org_guid)
        .bind(guid)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            IsosegError::database(
                e,
                format!("Failed to revoke organization {} from isolation segment {}", org_guid, guid),
            )
        })?;

        tx.commit().await.map_err(|e| {
            IsosegError::database(e, "Failed to commit isolation segment unassignment")
        })?;

        Ok(())
    }

    #[instrument(skip(self), fields(segment_guid = %guid), name = "db_list_segment_organization_guids")]
    async fn list_organization_guids(
        &self,
        guid: &IsolationSegmentGuid,
    ) -> Result<Vec<OrganizationGuid>> {
        sqlx::query_scalar::<_, OrganizationGuid>(
            "SELECT organization_guid FROM organizations_isolation_segments
             WHERE isolation_segment_guid = ?
             ORDER BY organization_guid",
        )
        .bind(guid)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            IsosegError::database(
                e,
                format!("Failed to list organizations for isolation segment: {}", guid),
            )
        })
    }
}
