//! Remodel Store - chart store access and the rename driver
//!
//! - [`ChartStore`]: the four operations the driver needs from a chart store
//! - [`HttpChartStore`]: REST implementation with `ApiKey` authorization
//! - [`InMemoryChartStore`]: process-local store for tests and demos
//! - [`Renamer`]: bounded fan-out over spaces and charts
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use remodel_engine::RenameRule;
//! use remodel_store::{ExecutionMode, HttpChartStore, HttpStoreConfig, Renamer, RunConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = HttpChartStore::new(&HttpStoreConfig::new(
//!     "http://localhost:3000/api/v1",
//!     "3675b69e-8324-4110-bdca-059031aa8da3",
//!     "api-key",
//! ))?;
//! let config = RunConfig::new(RenameRule::new("customers", "users")?)
//!     .with_mode(ExecutionMode::DryRun);
//!
//! let report = Renamer::new(Arc::new(store), config).run().await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod driver;
pub mod error;
pub mod http;
pub mod memory;
pub mod report;
pub mod store;

// Re-exports for convenience
pub use driver::{ExecutionMode, Renamer, RunConfig};
pub use error::StoreError;
pub use http::{HttpChartStore, HttpStoreConfig};
pub use memory::InMemoryChartStore;
pub use report::{ChartDiff, ChartOutcome, ChartRef, RunReport, RunSummary, SpaceFailure};
pub use store::{ChartStore, ChartSummary, Space, SpaceSummary};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
