//! Saved chart document and the whole-document rewrite
//!
//! Only the fields that name a model are typed; everything else rides along
//! in `extra` maps so a fetched document can be submitted back verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chart::{rewrite_chart_config, ChartConfig};
use crate::error::RewriteError;
use crate::field::Field;
use crate::filter::rewrite_filter_tree;
use crate::rule::RenameRule;

/// A saved chart as stored by the chart store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDocument {
    /// Model the chart queries
    pub table_name: String,
    /// Results table layout
    pub table_config: TableLayout,
    /// Visualisation settings
    pub chart_config: ChartConfig,
    /// The underlying query
    pub metric_query: MetricQuery,
    /// Display name
    pub name: String,
    /// Everything else (uuid, space, timestamps, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Results table layout
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableLayout {
    /// Column order by field id
    pub column_order: Vec<String>,
    /// Other keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The query behind a chart
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricQuery {
    /// Selected dimensions
    pub dimensions: Vec<String>,
    /// Selected metrics
    pub metrics: Vec<String>,
    /// Raw filter tree, classified on rewrite
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub filters: Field<Value>,
    /// Sort order
    pub sorts: Vec<SortField>,
    /// Derived calculations over the results
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub table_calculations: Field<Vec<TableCalculation>>,
    /// Other keys (limit, additional metrics, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortField {
    /// Field being sorted on
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub field_id: Field<String>,
    /// Other keys (`descending`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A table calculation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableCalculation {
    /// Expression referencing field ids
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub sql: Field<String>,
    /// Other keys (`name`, `displayName`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of rewriting one document
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    /// Rewritten document, returned even when nothing changed
    pub document: ChartDocument,
    /// Whether the document differs from the input
    pub changed: bool,
}

impl MetricQuery {
    fn rewrite(&self, rule: &RenameRule) -> Result<Self, RewriteError> {
        Ok(Self {
            dimensions: rule.rewrite_all(&self.dimensions),
            metrics: rule.rewrite_all(&self.metrics),
            filters: self
                .filters
                .as_ref()
                .try_map(|tree| rewrite_filter_tree(tree, rule))?,
            sorts: self
                .sorts
                .iter()
                .map(|sort| SortField {
                    field_id: rule.rewrite_field(&sort.field_id),
                    extra: sort.extra.clone(),
                })
                .collect(),
            table_calculations: self.table_calculations.as_ref().map(|calcs| {
                calcs
                    .iter()
                    .map(|calc| TableCalculation {
                        sql: rule.rewrite_field(&calc.sql),
                        extra: calc.extra.clone(),
                    })
                    .collect()
            }),
            extra: self.extra.clone(),
        })
    }
}

/// Rewrite every model reference in a chart document
///
/// The input is never modified. `changed` is structural equality between
/// input and output; callers persist only when it is set.
///
/// # Errors
/// `RewriteError::InvalidFilterShape` if the filter tree holds an
/// unrecognised node. Nothing else in the document can fail.
pub fn rewrite_document(
    document: &ChartDocument,
    rule: &RenameRule,
) -> Result<Rewrite, RewriteError> {
    let candidate = ChartDocument {
        table_name: rule.rewrite_exact(&document.table_name),
        table_config: TableLayout {
            column_order: rule.rewrite_all(&document.table_config.column_order),
            extra: document.table_config.extra.clone(),
        },
        chart_config: rewrite_chart_config(&document.chart_config, rule),
        metric_query: document.metric_query.rewrite(rule)?,
        name: document.name.clone(),
        extra: document.extra.clone(),
    };

    let changed = candidate != *document;
    tracing::debug!(chart = %document.name, changed, "rewrote chart document");

    Ok(Rewrite {
        document: candidate,
        changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rule() -> RenameRule {
        RenameRule::new("customers", "users").unwrap()
    }

    fn document(value: Value) -> ChartDocument {
        serde_json::from_value(value).unwrap()
    }

    fn minimal(table_name: &str) -> Value {
        json!({
            "uuid": "7c1c2c2e",
            "name": "Spend by customer",
            "tableName": table_name,
            "tableConfig": {"columnOrder": []},
            "chartConfig": {"type": "table"},
            "metricQuery": {
                "dimensions": [],
                "metrics": [],
                "sorts": [],
            },
        })
    }

    #[test]
    fn table_name_exact_match_only() {
        let out = rewrite_document(&document(minimal("customers")), &rule()).unwrap();
        assert_eq!(out.document.table_name, "users");
        assert!(out.changed);

        let out = rewrite_document(&document(minimal("customers_v2")), &rule()).unwrap();
        assert_eq!(out.document.table_name, "customers_v2");
        assert!(!out.changed);
    }

    #[test]
    fn metric_query_fields_rewritten() {
        let mut value = minimal("orders");
        value["metricQuery"] = json!({
            "dimensions": ["customers_first_name", "orders_status"],
            "metrics": ["customers_total_spend"],
            "filters": {"dimensions": {"id": "f", "and": [
                {"id": "r", "target": {"fieldId": "customers_first_name"}, "operator": "notNull"}
            ]}},
            "sorts": [{"fieldId": "customers_total_spend", "descending": true}],
            "tableCalculations": [
                {"name": "share", "displayName": "Share", "sql": "${customers.total_spend} / 100"}
            ],
            "limit": 500,
        });
        value["tableConfig"]["columnOrder"] = json!(["customers_first_name", "share"]);

        let out = rewrite_document(&document(value), &rule()).unwrap();
        let json = serde_json::to_value(&out.document).unwrap();

        assert!(out.changed);
        assert_eq!(json["tableName"], "orders");
        assert_eq!(
            json["tableConfig"]["columnOrder"],
            json!(["users_first_name", "share"])
        );
        assert_eq!(
            json["metricQuery"]["dimensions"],
            json!(["users_first_name", "orders_status"])
        );
        assert_eq!(json["metricQuery"]["metrics"], json!(["users_total_spend"]));
        assert_eq!(
            json["metricQuery"]["filters"]["dimensions"]["and"][0]["target"]["fieldId"],
            "users_first_name"
        );
        assert_eq!(
            json["metricQuery"]["sorts"],
            json!([{"fieldId": "users_total_spend", "descending": true}])
        );
        assert_eq!(
            json["metricQuery"]["tableCalculations"][0]["sql"],
            "${users.total_spend} / 100"
        );
        assert_eq!(json["metricQuery"]["limit"], 500);
    }

    #[test]
    fn opaque_fields_pass_through() {
        let mut value = minimal("customers");
        value["spaceUuid"] = json!("space-1");
        value["updatedAt"] = json!("2024-01-01T00:00:00Z");
        value["pivotConfig"] = json!({"columns": ["customers_region"]});

        let out = rewrite_document(&document(value.clone()), &rule()).unwrap();
        let json = serde_json::to_value(&out.document).unwrap();

        assert_eq!(json["spaceUuid"], value["spaceUuid"]);
        assert_eq!(json["updatedAt"], value["updatedAt"]);
        assert_eq!(json["pivotConfig"], value["pivotConfig"]);
        assert_eq!(json["uuid"], value["uuid"]);
    }

    #[test]
    fn invalid_filter_fails_document() {
        let mut value = minimal("customers");
        value["metricQuery"]["filters"] = json!({"bogus": 1});

        let err = rewrite_document(&document(value), &rule()).unwrap_err();
        assert!(matches!(err, RewriteError::InvalidFilterShape { .. }));
    }

    #[test]
    fn input_is_not_modified() {
        let doc = document(minimal("customers"));
        let before = doc.clone();
        let _ = rewrite_document(&doc, &rule()).unwrap();
        assert_eq!(doc, before);
    }
}
