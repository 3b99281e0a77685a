//! Testing utilities for the remodel workspace
//!
//! Shared chart fixtures, rules and small JSON builders.

#![allow(missing_docs)]

use remodel_engine::{ChartDocument, RenameRule};
use serde_json::{json, Value};

pub const OLD_MODEL: &str = "customers";
pub const NEW_MODEL: &str = "users";

pub fn customers_to_users() -> RenameRule {
    RenameRule::new(OLD_MODEL, NEW_MODEL).unwrap()
}

pub fn filter_leaf(field_id: &str) -> Value {
    json!({
        "id": format!("filter-{field_id}"),
        "target": {"fieldId": field_id},
        "operator": "equals",
        "values": ["x"],
    })
}

/// A cartesian chart on the `customers` model touching every rewritable field
pub fn cartesian_chart_json(uuid: &str) -> Value {
    json!({
        "uuid": uuid,
        "name": format!("Customer spend {uuid}"),
        "spaceUuid": "space-sales",
        "tableName": "customers",
        "updatedAt": "2024-03-01T12:00:00.000Z",
        "tableConfig": {"columnOrder": ["customers_created_month", "customers_total_spend", "spend_share"]},
        "chartConfig": {
            "type": "cartesian",
            "config": {
                "layout": {"xField": "customers_created_month", "yField": ["customers_total_spend"]},
                "eChartsConfig": {
                    "series": [{
                        "type": "bar",
                        "encode": {
                            "xRef": {"field": "customers_created_month"},
                            "yRef": {"field": "customers_total_spend"},
                        },
                    }],
                },
            },
        },
        "metricQuery": {
            "dimensions": ["customers_created_month"],
            "metrics": ["customers_total_spend"],
            "filters": {
                "dimensions": {"id": "root", "and": [
                    filter_leaf("customers_first_name"),
                    {"id": "nested", "or": [filter_leaf("customers_region"), filter_leaf("orders_status")]},
                ]},
                "metrics": {"id": "m", "and": [filter_leaf("customers_total_spend")]},
            },
            "sorts": [{"fieldId": "customers_created_month", "descending": false}],
            "tableCalculations": [{
                "name": "spend_share",
                "displayName": "Share",
                "sql": "${customers.total_spend} / sum(${customers.total_spend})",
            }],
            "limit": 500,
        },
        "pivotConfig": null,
    })
}

/// A table chart with conditional formatting on the `customers` model
pub fn table_chart_json(uuid: &str) -> Value {
    json!({
        "uuid": uuid,
        "name": format!("Customer table {uuid}"),
        "tableName": "customers",
        "tableConfig": {"columnOrder": ["customers_first_name"]},
        "chartConfig": {
            "type": "table",
            "config": {
                "columns": {"customers_first_name": {"visible": true}},
                "conditionalFormattings": [{
                    "target": {"fieldId": "customers_first_name"},
                    "color": "#ff0000",
                    "rules": [],
                }],
            },
        },
        "metricQuery": {
            "dimensions": ["customers_first_name"],
            "metrics": [],
            "sorts": [],
        },
    })
}

/// A chart that never mentions the `customers` model
pub fn orders_chart_json(uuid: &str) -> Value {
    json!({
        "uuid": uuid,
        "name": format!("Orders {uuid}"),
        "tableName": "orders",
        "tableConfig": {"columnOrder": ["orders_status"]},
        "chartConfig": {"type": "big_number", "config": {"selectedField": "orders_count"}},
        "metricQuery": {
            "dimensions": ["orders_status"],
            "metrics": ["orders_count"],
            "filters": {},
            "sorts": [],
        },
    })
}

/// A chart whose filter tree holds an unrecognised node
pub fn broken_filter_chart_json(uuid: &str) -> Value {
    let mut chart = cartesian_chart_json(uuid);
    chart["name"] = json!(format!("Broken {uuid}"));
    chart["metricQuery"]["filters"] = json!({"and": [{"id": "orphan", "operator": "equals"}]});
    chart
}

pub fn document(value: Value) -> ChartDocument {
    serde_json::from_value(value).unwrap()
}
