//! Rename driver
//!
//! Fans out over every space and every chart of a project and runs one
//! fetch → rewrite → persist pipeline per chart. At most
//! `max_concurrency` requests of each stage are in flight. A failing chart
//! becomes a failed [`ChartOutcome`]; it never cancels its siblings.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use remodel_engine::{rewrite_document, RenameRule};

use crate::error::StoreError;
use crate::report::{ChartDiff, ChartOutcome, ChartRef, RunReport, SpaceFailure};
use crate::store::{ChartStore, ChartSummary, Space, SpaceSummary};

/// Whether rewritten charts are saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Report what would change, save nothing
    #[default]
    DryRun,
    /// Save every changed chart as a new version
    Apply,
}

impl ExecutionMode {
    /// From an `--apply` style flag
    #[inline]
    #[must_use]
    pub fn from_apply(apply: bool) -> Self {
        if apply {
            Self::Apply
        } else {
            Self::DryRun
        }
    }
}

/// Settings for one rename run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Model rename to apply
    pub rule: RenameRule,
    /// Dry run or apply
    pub mode: ExecutionMode,
    /// Upper bound on concurrent store requests per stage
    pub max_concurrency: usize,
    /// Keep before/after documents of changed charts in the report
    pub keep_diffs: bool,
}

impl RunConfig {
    /// Dry-run config with default concurrency
    #[inline]
    #[must_use]
    pub fn new(rule: RenameRule) -> Self {
        Self {
            rule,
            mode: ExecutionMode::DryRun,
            max_concurrency: 8,
            keep_diffs: false,
        }
    }

    /// With execution mode
    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// With concurrency bound (at least 1)
    #[inline]
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Keep before/after documents for changed charts
    #[inline]
    #[must_use]
    pub fn with_diffs(mut self, keep: bool) -> Self {
        self.keep_diffs = keep;
        self
    }
}

/// Applies a [`RunConfig`] to every chart of a store
#[derive(Debug)]
pub struct Renamer<S: ?Sized> {
    store: Arc<S>,
    config: RunConfig,
}

impl<S: ChartStore + ?Sized> Renamer<S> {
    /// Create driver over a store
    #[inline]
    #[must_use]
    pub fn new(store: Arc<S>, config: RunConfig) -> Self {
        Self { store, config }
    }

    /// Run configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Rename across every space of the project
    ///
    /// # Errors
    /// Only if the space listing itself cannot be fetched. Failures of
    /// individual spaces and charts are recorded in the report.
    pub async fn run(&self) -> Result<RunReport, StoreError> {
        tracing::info!(
            old = self.config.rule.old(),
            new = self.config.rule.new_name(),
            mode = ?self.config.mode,
            "starting model rename"
        );

        let spaces = self.store.list_spaces().await?;
        let spaces_listed = spaces.len();
        tracing::info!("project has {spaces_listed} spaces");

        let fetched: Vec<Result<Space, (SpaceSummary, StoreError)>> = stream::iter(spaces)
            .map(|summary| async move {
                self.store
                    .get_space(&summary.uuid)
                    .await
                    .map_err(|e| (summary, e))
            })
            .buffer_unordered(self.config.max_concurrency)
            .collect()
            .await;

        let mut jobs = Vec::new();
        let mut space_failures = Vec::new();
        for result in fetched {
            match result {
                Ok(space) => {
                    tracing::info!(
                        "space {} has {} charts and {} dashboards",
                        space.name,
                        space.queries.len(),
                        space.dashboards.len()
                    );
                    jobs.extend(space.queries.into_iter().map(|c| (space.name.clone(), c)));
                }
                Err((summary, error)) => {
                    tracing::error!(space = %summary.name, %error, "could not fetch space");
                    space_failures.push(SpaceFailure {
                        uuid: summary.uuid,
                        name: summary.name,
                        error: error.to_string(),
                    });
                }
            }
        }

        let outcomes: Vec<ChartOutcome> = stream::iter(jobs)
            .map(|(space, summary)| self.process_chart(space, summary))
            .buffer_unordered(self.config.max_concurrency)
            .collect()
            .await;

        let report = RunReport::new(self.config.mode, spaces_listed, outcomes, space_failures);
        tracing::info!("{}", report.summary());
        Ok(report)
    }

    /// Fetch, rewrite and (in apply mode) persist one chart
    pub async fn process_chart(&self, space: String, summary: ChartSummary) -> ChartOutcome {
        let chart = ChartRef {
            space,
            name: summary.name,
            uuid: summary.uuid,
        };

        let document = match self.store.get_chart(&chart.uuid).await {
            Ok(document) => document,
            Err(error) => {
                tracing::error!(chart = %chart, %error, "error fetching chart");
                return ChartOutcome::FetchFailed {
                    chart,
                    error: error.to_string(),
                };
            }
        };

        let rewrite = match rewrite_document(&document, &self.config.rule) {
            Ok(rewrite) => rewrite,
            Err(error) => {
                tracing::error!(
                    chart = %chart,
                    %error,
                    "chart could not be rewritten, investigate or rewrite it manually"
                );
                return ChartOutcome::RewriteFailed {
                    chart,
                    error: error.to_string(),
                };
            }
        };

        if !rewrite.changed {
            tracing::info!(chart = %chart, "chart has no changes");
            return ChartOutcome::Unchanged { chart };
        }

        tracing::info!(chart = %chart, "chart has changes");
        tracing::debug!(
            chart = %chart,
            table_name = %rewrite.document.table_name,
            dimensions = ?rewrite.document.metric_query.dimensions,
            metrics = ?rewrite.document.metric_query.metrics,
            "rewritten chart"
        );

        let persisted = match self.config.mode {
            ExecutionMode::DryRun => false,
            ExecutionMode::Apply => {
                match self
                    .store
                    .persist_chart_version(&chart.uuid, &rewrite.document)
                    .await
                {
                    Ok(()) => {
                        tracing::info!(chart = %chart, "chart updated");
                        true
                    }
                    Err(error) => {
                        tracing::error!(chart = %chart, %error, "error saving chart");
                        return ChartOutcome::PersistFailed {
                            chart,
                            error: error.to_string(),
                        };
                    }
                }
            }
        };

        let diff = self.config.keep_diffs.then(|| {
            Box::new(ChartDiff {
                before: document,
                after: rewrite.document,
            })
        });

        ChartOutcome::Changed {
            chart,
            persisted,
            diff,
        }
    }
}
