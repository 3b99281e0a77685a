//! In-memory chart store
//!
//! Holds charts as raw JSON so malformed documents can be stored and surface
//! as fetch failures, like a bad server response would. Failures and latency
//! can be injected per space or chart.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;
use remodel_engine::ChartDocument;
use serde_json::Value;

use crate::error::StoreError;
use crate::store::{ChartStore, ChartSummary, Space, SpaceSummary};

/// Chart store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryChartStore {
    spaces: RwLock<Vec<Space>>,
    charts: DashMap<String, Value>,
    versions: DashMap<String, Vec<ChartDocument>>,
    failing_spaces: DashSet<String>,
    failing_persists: DashSet<String>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryChartStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With an empty space
    #[must_use]
    pub fn with_space(self, uuid: impl Into<String>, name: impl Into<String>) -> Self {
        self.spaces.write().push(Space {
            uuid: uuid.into(),
            name: name.into(),
            queries: Vec::new(),
            dashboards: Vec::new(),
            extra: serde_json::Map::new(),
        });
        self
    }

    /// With a chart in an existing space
    ///
    /// The chart's `uuid` and `name` keys populate the space listing.
    ///
    /// # Panics
    /// If the space was not added first or the chart has no `uuid`.
    #[must_use]
    pub fn with_chart(self, space_uuid: &str, chart: Value) -> Self {
        let uuid = chart["uuid"]
            .as_str()
            .expect("chart fixture needs a uuid")
            .to_string();
        let name = chart["name"].as_str().unwrap_or_default().to_string();
        {
            let mut spaces = self.spaces.write();
            let space = spaces
                .iter_mut()
                .find(|s| s.uuid == space_uuid)
                .expect("space must be added before its charts");
            space.queries.push(ChartSummary {
                uuid: uuid.clone(),
                name,
            });
        }
        self.charts.insert(uuid, chart);
        self
    }

    /// Listed in the project but every fetch of it fails
    #[must_use]
    pub fn with_failing_space(self, uuid: impl Into<String>, name: impl Into<String>) -> Self {
        let uuid = uuid.into();
        self.failing_spaces.insert(uuid.clone());
        self.with_space(uuid, name)
    }

    /// Reject persisting new versions of this chart
    #[must_use]
    pub fn with_failing_persist(self, chart_uuid: impl Into<String>) -> Self {
        self.failing_persists.insert(chart_uuid.into());
        self
    }

    /// Delay every chart fetch
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Versions submitted for a chart, oldest first
    #[must_use]
    pub fn versions(&self, chart_uuid: &str) -> Vec<ChartDocument> {
        self.versions
            .get(chart_uuid)
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// Total versions submitted across all charts
    #[must_use]
    pub fn persisted_count(&self) -> usize {
        self.versions.iter().map(|e| e.value().len()).sum()
    }

    /// Highest number of chart fetches observed running at once
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChartStore for InMemoryChartStore {
    async fn list_spaces(&self) -> Result<Vec<SpaceSummary>, StoreError> {
        Ok(self
            .spaces
            .read()
            .iter()
            .map(|s| SpaceSummary::new(s.uuid.clone(), s.name.clone()))
            .collect())
    }

    async fn get_space(&self, space_uuid: &str) -> Result<Space, StoreError> {
        if self.failing_spaces.contains(space_uuid) {
            return Err(StoreError::Rejected(format!("space {space_uuid} unavailable")));
        }
        self.spaces
            .read()
            .iter()
            .find(|s| s.uuid == space_uuid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("space {space_uuid}")))
    }

    async fn get_chart(&self, chart_uuid: &str) -> Result<ChartDocument, StoreError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let raw = self
            .charts
            .get(chart_uuid)
            .map(|c| c.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("chart {chart_uuid}")))?;
        serde_json::from_value(raw).map_err(|e| StoreError::decode(format!("chart {chart_uuid}"), e))
    }

    async fn persist_chart_version(
        &self,
        chart_uuid: &str,
        chart: &ChartDocument,
    ) -> Result<(), StoreError> {
        if self.failing_persists.contains(chart_uuid) {
            return Err(StoreError::Rejected(format!("chart {chart_uuid} is read-only")));
        }
        let value = serde_json::to_value(chart)
            .map_err(|e| StoreError::decode(format!("chart {chart_uuid}"), e))?;

        self.charts.insert(chart_uuid.to_string(), value);
        self.versions
            .entry(chart_uuid.to_string())
            .or_default()
            .push(chart.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chart(uuid: &str) -> Value {
        json!({
            "uuid": uuid,
            "name": "Orders",
            "tableName": "orders",
            "tableConfig": {"columnOrder": []},
            "chartConfig": {"type": "table"},
            "metricQuery": {"dimensions": [], "metrics": [], "sorts": []},
        })
    }

    #[tokio::test]
    async fn lists_spaces_and_charts() {
        let store = InMemoryChartStore::new()
            .with_space("s1", "Sales")
            .with_chart("s1", chart("c1"));

        let spaces = store.list_spaces().await.unwrap();
        assert_eq!(spaces, vec![SpaceSummary::new("s1", "Sales")]);

        let space = store.get_space("s1").await.unwrap();
        assert_eq!(space.queries.len(), 1);
        assert_eq!(space.queries[0].name, "Orders");

        let doc = store.get_chart("c1").await.unwrap();
        assert_eq!(doc.table_name, "orders");
    }

    #[tokio::test]
    async fn missing_chart_is_not_found() {
        let store = InMemoryChartStore::new();
        assert!(matches!(
            store.get_chart("nope").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn malformed_chart_is_decode_error() {
        let store = InMemoryChartStore::new()
            .with_space("s1", "Sales")
            .with_chart("s1", json!({"uuid": "c1", "name": "Broken"}));

        assert!(matches!(
            store.get_chart("c1").await,
            Err(StoreError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn persist_records_versions() {
        let store = InMemoryChartStore::new()
            .with_space("s1", "Sales")
            .with_chart("s1", chart("c1"));

        let mut doc = store.get_chart("c1").await.unwrap();
        doc.table_name = "purchases".to_string();
        store.persist_chart_version("c1", &doc).await.unwrap();

        assert_eq!(store.versions("c1"), vec![doc]);
        assert_eq!(store.persisted_count(), 1);
        assert_eq!(store.get_chart("c1").await.unwrap().table_name, "purchases");
    }

    #[tokio::test]
    async fn injected_failures() {
        let store = InMemoryChartStore::new()
            .with_failing_space("s1", "Locked")
            .with_chart("s1", chart("c1"))
            .with_failing_persist("c1");

        assert!(store.get_space("s1").await.is_err());

        let doc = store.get_chart("c1").await.unwrap();
        assert!(store.persist_chart_version("c1", &doc).await.is_err());
        assert_eq!(store.persisted_count(), 0);
    }
}
