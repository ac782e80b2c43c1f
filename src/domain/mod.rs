//! Domain layer
//!
//! Entities, identifiers, and label selector parsing. Nothing here touches
//! the database directly.
//!
//! ## Module Organization
//!
//! - `id`: Type-safe GUIDs with the NewType pattern
//! - `isolation_segment`: Isolation segment, organization, and label entities
//! - `label_selector`: Parsing and validation of label selector expressions

pub mod id;
pub mod isolation_segment;
pub mod label_selector;

pub use id::{IsolationSegmentGuid, LabelGuid, OrganizationGuid};
pub use isolation_segment::{
    validate_isolation_segment_name, IsolationSegment, IsolationSegmentLabel, Organization,
    SHARED_ISOLATION_SEGMENT_GUID, SHARED_ISOLATION_SEGMENT_NAME,
};
pub use label_selector::{
    LabelKey, LabelOperator, LabelRequirement, LabelSelector, LabelSelectorError,
};
