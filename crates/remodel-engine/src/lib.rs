//! Remodel Engine - model rename for saved charts
//!
//! Rewrites every field identifier that references a renamed model inside a
//! saved chart document:
//! - Query dimensions, metrics, sorts and table calculations
//! - The recursive filter tree
//! - Table column settings, cartesian axes and series, big number field
//! - The results table column order and the chart's table name
//!
//! The engine is pure: documents are taken by reference and a new document
//! is built. Rewriting is idempotent.
//!
//! # Example
//!
//! ```rust
//! use remodel_engine::{rewrite_document, ChartDocument, RenameRule};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let rule = RenameRule::new("customers", "users")?;
//! let document: ChartDocument = serde_json::from_str(r#"{
//!     "name": "Spend",
//!     "tableName": "customers",
//!     "tableConfig": {"columnOrder": ["customers_total_spend"]},
//!     "chartConfig": {"type": "big_number", "config": {"selectedField": "customers_total_spend"}},
//!     "metricQuery": {"dimensions": [], "metrics": ["customers_total_spend"], "sorts": []}
//! }"#)?;
//!
//! let rewrite = rewrite_document(&document, &rule)?;
//! assert!(rewrite.changed);
//! assert_eq!(rewrite.document.table_name, "users");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod chart;
pub mod document;
pub mod error;
pub mod field;
pub mod filter;
pub mod rule;

// Re-exports for convenience
pub use chart::{rewrite_chart_config, ChartConfig, ChartVariant};
pub use document::{
    rewrite_document, ChartDocument, MetricQuery, Rewrite, SortField, TableCalculation,
    TableLayout,
};
pub use error::{RewriteError, RuleError};
pub use field::Field;
pub use filter::{rewrite_filter_tree, rewrite_filters, FilterNode};
pub use rule::RenameRule;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
