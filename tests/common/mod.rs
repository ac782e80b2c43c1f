//! Common test utilities for all integration tests.
//!
//! Shared database setup plus fixture builders for segments, organizations,
//! and labels.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

pub mod test_db;

use isoseg::domain::{IsolationSegment, Organization};
use isoseg::storage::{
    DbPool, IsolationSegmentRepository, LabelRepository, OrganizationRepository,
    SqlxIsolationSegmentRepository, SqlxLabelRepository, SqlxOrganizationRepository,
};

pub async fn make_segment(pool: &DbPool, name: &str) -> IsolationSegment {
    SqlxIsolationSegmentRepository::new(pool.clone())
        .create_isolation_segment(name)
        .await
        .expect("create isolation segment")
}

pub async fn make_org(pool: &DbPool, name: &str) -> Organization {
    SqlxOrganizationRepository::new(pool.clone())
        .create_organization(name)
        .await
        .expect("create organization")
}

pub async fn assign(pool: &DbPool, segment: &IsolationSegment, orgs: &[&Organization]) {
    let guids: Vec<_> = orgs.iter().map(|o| o.guid.clone()).collect();
    SqlxIsolationSegmentRepository::new(pool.clone())
        .assign_organizations(&segment.guid, &guids)
        .await
        .expect("assign organizations");
}

pub async fn label(pool: &DbPool, segment: &IsolationSegment, key: &str, value: &str) {
    SqlxLabelRepository::new(pool.clone())
        .set_label(&segment.guid, key, value)
        .await
        .expect("set label");
}

/// Sorted guid strings, for order-insensitive comparisons
pub fn guid_set(segments: &[IsolationSegment]) -> Vec<String> {
    let mut guids: Vec<String> = segments.iter().map(|s| s.guid.to_string()).collect();
    guids.sort();
    guids
}
