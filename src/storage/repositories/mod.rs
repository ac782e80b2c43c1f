//! Repository modules for data access
//!
//! Each repository handles writes and single-row reads for one table family.
//! Filtered listing goes through [`crate::fetchers`] instead.

pub mod isolation_segment;
pub mod label;
pub mod organization;

pub use isolation_segment::{IsolationSegmentRepository, SqlxIsolationSegmentRepository};
pub use label::{LabelRepository, SqlxLabelRepository};
pub use organization::{OrganizationRepository, SqlxOrganizationRepository};
