//! Chart store collaborator
//!
//! The driver only needs four operations from wherever charts live: list the
//! project's spaces, open one space to see its charts, fetch a chart, and
//! submit a new version of it.

use async_trait::async_trait;
use remodel_engine::ChartDocument;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Entry of the project's space listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceSummary {
    /// Space id
    pub uuid: String,
    /// Display name
    pub name: String,
    /// Other keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A space with the charts it contains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    /// Space id
    pub uuid: String,
    /// Display name
    pub name: String,
    /// Saved charts in the space
    #[serde(default)]
    pub queries: Vec<ChartSummary>,
    /// Dashboards in the space; listed for reporting, never rewritten
    #[serde(default)]
    pub dashboards: Vec<Value>,
    /// Other keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Entry of a space's chart listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSummary {
    /// Chart id
    pub uuid: String,
    /// Display name
    #[serde(default)]
    pub name: String,
}

impl SpaceSummary {
    /// Summary with no extra keys
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            extra: Map::new(),
        }
    }
}

/// Where saved charts are read from and written back to
#[async_trait]
pub trait ChartStore: Send + Sync {
    /// All spaces of the project
    async fn list_spaces(&self) -> Result<Vec<SpaceSummary>, StoreError>;

    /// One space with its chart summaries
    async fn get_space(&self, space_uuid: &str) -> Result<Space, StoreError>;

    /// Full saved chart
    async fn get_chart(&self, chart_uuid: &str) -> Result<ChartDocument, StoreError>;

    /// Submit a new version of a chart
    async fn persist_chart_version(
        &self,
        chart_uuid: &str,
        chart: &ChartDocument,
    ) -> Result<(), StoreError>;
}
