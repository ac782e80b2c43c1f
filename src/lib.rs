//! # isoseg
//!
//! Isolation segment listing for a multi-tenant platform control plane.
//!
//! ## Architecture
//!
//! ```text
//! caller params → IsolationSegmentsListMessage → IsolationSegmentListFetcher → Dataset
//!                                                                               ↓
//!                                                            SQLite store (sqlx pool)
//! ```
//!
//! Fetchers only compose a deferred [`fetchers::Dataset`]. Rows are read when
//! the caller materializes it with `all`, `count`, `first`, or `guids`.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use isoseg::{
//!     config::DatabaseConfig, fetchers::IsolationSegmentListFetcher,
//!     messages::IsolationSegmentsListMessage, storage::create_pool, Result,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let pool = create_pool(&DatabaseConfig::from_env()).await?;
//!     let message = IsolationSegmentsListMessage::from_query_string("names=shared")?;
//!     let segments = IsolationSegmentListFetcher::fetch_all(&message).all(&pool).await?;
//!     println!("{}", segments.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod fetchers;
pub mod messages;
pub mod observability;
pub mod storage;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Error, IsosegError, Result};
pub use fetchers::{Dataset, IsolationSegmentListFetcher, OrganizationGuidQuery};
pub use messages::IsolationSegmentsListMessage;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
