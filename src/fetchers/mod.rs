//! # Fetchers
//!
//! Query construction for listings. Fetchers compose deferred [`Dataset`]s;
//! the storage pool is only needed once a caller materializes one.

pub mod dataset;
pub mod isolation_segment_list;
pub mod label_selector;

pub use dataset::{Dataset, OrganizationGuidQuery};
pub use isolation_segment_list::IsolationSegmentListFetcher;
pub use label_selector::LabelSelectorQuery;
