//! Request messages
//!
//! Parse and validate caller-supplied listing params before any query is built.

pub mod isolation_segments_list;
pub mod pagination;

pub use isolation_segments_list::IsolationSegmentsListMessage;
pub use pagination::{OrderBy, OrderDirection, Ordering, PaginationOptions};
