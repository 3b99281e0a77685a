//! Driver behaviour against the in-memory store.
//!
//! - Dry runs never persist
//! - Apply persists only changed charts
//! - One chart's failure never stops the others
//! - The concurrency bound holds

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use remodel_store::{
    ChartOutcome, ExecutionMode, InMemoryChartStore, Renamer, RunConfig, StoreError,
};
use remodel_test_utils::{
    broken_filter_chart_json, cartesian_chart_json, customers_to_users, orders_chart_json,
    table_chart_json,
};
use serde_json::json;

fn sample_store() -> InMemoryChartStore {
    InMemoryChartStore::new()
        .with_space("s-sales", "Sales")
        .with_chart("s-sales", cartesian_chart_json("c1"))
        .with_chart("s-sales", orders_chart_json("o1"))
        .with_space("s-ops", "Ops")
        .with_chart("s-ops", table_chart_json("t1"))
}

fn renamer(store: Arc<InMemoryChartStore>, mode: ExecutionMode) -> Renamer<InMemoryChartStore> {
    Renamer::new(store, RunConfig::new(customers_to_users()).with_mode(mode))
}

#[tokio::test]
async fn dry_run_reports_without_persisting() {
    let store = Arc::new(sample_store());
    let report = renamer(store.clone(), ExecutionMode::DryRun)
        .run()
        .await
        .unwrap();

    let summary = report.summary();
    assert_eq!(summary.charts, 3);
    assert_eq!(summary.changed, 2);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.persisted, 0);
    assert!(!report.has_failures());
    assert_eq!(store.persisted_count(), 0);

    assert!(matches!(
        report.outcome("c1"),
        Some(ChartOutcome::Changed { persisted: false, .. })
    ));
    assert!(matches!(
        report.outcome("o1"),
        Some(ChartOutcome::Unchanged { .. })
    ));
}

#[tokio::test]
async fn apply_persists_only_changed_charts() {
    let store = Arc::new(sample_store());
    let report = renamer(store.clone(), ExecutionMode::Apply)
        .run()
        .await
        .unwrap();

    assert_eq!(report.summary().persisted, 2);
    assert_eq!(store.versions("c1").len(), 1);
    assert_eq!(store.versions("t1").len(), 1);
    assert!(store.versions("o1").is_empty());

    let saved = &store.versions("c1")[0];
    assert_eq!(saved.table_name, "users");
    assert_eq!(saved.metric_query.dimensions, vec!["users_created_month"]);
    assert_eq!(saved.extra["spaceUuid"], json!("space-sales"));
}

#[tokio::test]
async fn second_apply_is_a_no_op() {
    let store = Arc::new(sample_store());
    renamer(store.clone(), ExecutionMode::Apply)
        .run()
        .await
        .unwrap();

    let report = renamer(store.clone(), ExecutionMode::Apply)
        .run()
        .await
        .unwrap();

    assert_eq!(report.summary().changed, 0);
    assert_eq!(report.summary().unchanged, 3);
    assert_eq!(store.persisted_count(), 2);
}

#[tokio::test]
async fn failures_are_isolated_per_chart() {
    let store = Arc::new(
        sample_store()
            .with_chart("s-ops", broken_filter_chart_json("b1"))
            .with_chart("s-ops", json!({"uuid": "m1", "name": "Missing fields"}))
            .with_chart("s-ops", cartesian_chart_json("ro1"))
            .with_failing_persist("ro1")
            .with_failing_space("s-locked", "Locked"),
    );

    let report = renamer(store.clone(), ExecutionMode::Apply)
        .run()
        .await
        .unwrap();

    assert!(matches!(
        report.outcome("b1"),
        Some(ChartOutcome::RewriteFailed { .. })
    ));
    assert!(matches!(
        report.outcome("m1"),
        Some(ChartOutcome::FetchFailed { .. })
    ));
    assert!(matches!(
        report.outcome("ro1"),
        Some(ChartOutcome::PersistFailed { .. })
    ));
    assert_eq!(report.space_failures.len(), 1);
    assert_eq!(report.space_failures[0].name, "Locked");

    // Siblings still completed.
    assert_eq!(store.versions("c1").len(), 1);
    assert_eq!(store.versions("t1").len(), 1);
    assert!(store.versions("b1").is_empty());

    let summary = report.summary();
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.persisted, 2);
    assert!(report.has_failures());
}

#[tokio::test]
async fn concurrency_bound_is_honoured() {
    let mut store = InMemoryChartStore::new()
        .with_space("s1", "Big")
        .with_latency(Duration::from_millis(5));
    for i in 0..20 {
        store = store.with_chart("s1", orders_chart_json(&format!("o{i}")));
    }
    let store = Arc::new(store);

    let config = RunConfig::new(customers_to_users()).with_max_concurrency(3);
    let report = Renamer::new(store.clone(), config).run().await.unwrap();

    assert_eq!(report.summary().charts, 20);
    assert!(store.max_in_flight() <= 3);
    assert!(store.max_in_flight() >= 1);
}

#[tokio::test]
async fn diffs_kept_when_requested() {
    let store = Arc::new(sample_store());
    let config = RunConfig::new(customers_to_users()).with_diffs(true);
    let report = Renamer::new(store, config).run().await.unwrap();

    match report.outcome("t1") {
        Some(ChartOutcome::Changed {
            diff: Some(diff), ..
        }) => {
            assert_eq!(diff.before.table_name, "customers");
            assert_eq!(diff.after.table_name, "users");
        }
        other => panic!("expected changed outcome with diff, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_project_reports_nothing() {
    let store = Arc::new(InMemoryChartStore::new());
    let report = renamer(store, ExecutionMode::Apply).run().await.unwrap();

    assert_eq!(report.spaces_listed, 0);
    assert!(report.outcomes.is_empty());
    assert!(!report.has_failures());
}

#[test]
fn max_concurrency_is_at_least_one() {
    let config = RunConfig::new(customers_to_users()).with_max_concurrency(0);
    assert_eq!(config.max_concurrency, 1);
}

#[test]
fn store_error_is_displayable() {
    let err = StoreError::NotFound("chart c1".to_string());
    assert_eq!(err.to_string(), "not found: chart c1");
}
