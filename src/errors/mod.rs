//! # Error Handling
//!
//! Error types shared by storage, message parsing, and the listing fetcher.

pub mod types;

pub use types::{IsosegError, Result};

/// Alias kept for call sites that read better as `Error`
pub type Error = IsosegError;
