//! Isolation segment and organization entities.

use super::id::{IsolationSegmentGuid, LabelGuid, OrganizationGuid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GUID of the segment every installation ships with
pub const SHARED_ISOLATION_SEGMENT_GUID: &str = "933b4c58-120b-499a-b85d-4b6fc9e2903b";

/// Name of the shared segment
pub const SHARED_ISOLATION_SEGMENT_NAME: &str = "shared";

const MAX_NAME_LENGTH: usize = 255;

/// A named placement unit that organizations can be entitled to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct IsolationSegment {
    #[serde(skip)]
    pub id: i64,
    pub guid: IsolationSegmentGuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IsolationSegment {
    pub fn is_shared(&self) -> bool {
        self.guid.as_str() == SHARED_ISOLATION_SEGMENT_GUID
    }
}

/// Reject names the store would accept but operators could not tell apart
pub fn validate_isolation_segment_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("name must not be blank".to_string());
    }
    if name.trim() != name {
        return Err("name must not have leading or trailing whitespace".to_string());
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(format!("name must be at most {} characters", MAX_NAME_LENGTH));
    }
    if name.chars().any(char::is_control) {
        return Err("name must not contain control characters".to_string());
    }
    Ok(())
}

/// Organization as seen by isolation segment entitlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    #[serde(skip)]
    pub id: i64,
    pub guid: OrganizationGuid,
    pub name: String,
    pub default_isolation_segment_guid: Option<IsolationSegmentGuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A key/value label attached to an isolation segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct IsolationSegmentLabel {
    pub guid: LabelGuid,
    pub resource_guid: IsolationSegmentGuid,
    pub key_prefix: Option<String>,
    pub key_name: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IsolationSegmentLabel {
    /// The full key as written in a selector (`prefix/name` or `name`)
    pub fn key(&self) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}/{}", prefix, self.key_name),
            None => self.key_name.clone(),
        }
    }
}
