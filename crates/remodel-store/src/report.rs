//! Run outcomes
//!
//! One [`ChartOutcome`] per chart the driver reached, plus one
//! [`SpaceFailure`] per space that could not be opened.

use std::fmt;

use remodel_engine::ChartDocument;

use crate::driver::ExecutionMode;

/// Which chart an outcome refers to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChartRef {
    /// Name of the containing space
    pub space: String,
    /// Chart display name
    pub name: String,
    /// Chart id
    pub uuid: String,
}

/// Chart as fetched and as it would be saved
#[derive(Debug, Clone, PartialEq)]
pub struct ChartDiff {
    /// As fetched
    pub before: ChartDocument,
    /// As rewritten
    pub after: ChartDocument,
}

/// Result of one chart's fetch, rewrite, persist pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    /// Nothing referenced the old model
    Unchanged { chart: ChartRef },
    /// Rewritten; `persisted` is false in dry-run mode
    Changed {
        chart: ChartRef,
        persisted: bool,
        diff: Option<Box<ChartDiff>>,
    },
    /// Chart could not be fetched or decoded
    FetchFailed { chart: ChartRef, error: String },
    /// Chart could not be rewritten; needs manual attention
    RewriteFailed { chart: ChartRef, error: String },
    /// Rewritten but the new version was rejected
    PersistFailed { chart: ChartRef, error: String },
}

impl ChartOutcome {
    /// Chart this outcome is about
    #[must_use]
    pub fn chart(&self) -> &ChartRef {
        match self {
            Self::Unchanged { chart }
            | Self::Changed { chart, .. }
            | Self::FetchFailed { chart, .. }
            | Self::RewriteFailed { chart, .. }
            | Self::PersistFailed { chart, .. } => chart,
        }
    }

    /// Whether the pipeline failed at any stage
    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed { .. } | Self::RewriteFailed { .. } | Self::PersistFailed { .. }
        )
    }

    /// Error text for failed outcomes
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::FetchFailed { error, .. }
            | Self::RewriteFailed { error, .. }
            | Self::PersistFailed { error, .. } => Some(error),
            Self::Unchanged { .. } | Self::Changed { .. } => None,
        }
    }
}

/// A space whose chart listing could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceFailure {
    /// Space id
    pub uuid: String,
    /// Space name from the project listing
    pub name: String,
    /// Error text
    pub error: String,
}

/// Everything a run did
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Whether changes were persisted
    pub mode: ExecutionMode,
    /// Spaces listed for the project
    pub spaces_listed: usize,
    /// Per-chart outcomes, sorted by space, name, id
    pub outcomes: Vec<ChartOutcome>,
    /// Spaces that could not be opened
    pub space_failures: Vec<SpaceFailure>,
}

/// Outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Charts examined
    pub charts: usize,
    /// Charts with nothing to rename
    pub unchanged: usize,
    /// Charts with changes
    pub changed: usize,
    /// Changed charts saved as a new version
    pub persisted: usize,
    /// Charts whose pipeline failed
    pub failed: usize,
    /// Spaces that could not be opened
    pub failed_spaces: usize,
}

impl RunReport {
    /// Build report; outcomes are sorted for stable display
    #[must_use]
    pub fn new(
        mode: ExecutionMode,
        spaces_listed: usize,
        mut outcomes: Vec<ChartOutcome>,
        mut space_failures: Vec<SpaceFailure>,
    ) -> Self {
        outcomes.sort_by(|a, b| a.chart().cmp(b.chart()));
        space_failures.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            mode,
            spaces_listed,
            outcomes,
            space_failures,
        }
    }

    /// Outcome counts
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            charts: self.outcomes.len(),
            failed_spaces: self.space_failures.len(),
            ..RunSummary::default()
        };
        for outcome in &self.outcomes {
            match outcome {
                ChartOutcome::Unchanged { .. } => summary.unchanged += 1,
                ChartOutcome::Changed { persisted, .. } => {
                    summary.changed += 1;
                    if *persisted {
                        summary.persisted += 1;
                    }
                }
                _ => summary.failed += 1,
            }
        }
        summary
    }

    /// Whether any chart or space failed
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.space_failures.is_empty() || self.outcomes.iter().any(ChartOutcome::is_failure)
    }

    /// Outcomes that failed
    pub fn failures(&self) -> impl Iterator<Item = &ChartOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Outcome for a chart id
    #[must_use]
    pub fn outcome(&self, chart_uuid: &str) -> Option<&ChartOutcome> {
        self.outcomes.iter().find(|o| o.chart().uuid == chart_uuid)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} charts: {} unchanged, {} changed ({} saved), {} failed",
            self.charts, self.unchanged, self.changed, self.persisted, self.failed
        )?;
        if self.failed_spaces > 0 {
            write!(f, "; {} spaces could not be read", self.failed_spaces)?;
        }
        Ok(())
    }
}

impl fmt::Display for ChartRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.space, self.name, self.uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(space: &str, name: &str) -> ChartRef {
        ChartRef {
            space: space.to_string(),
            name: name.to_string(),
            uuid: format!("{space}-{name}"),
        }
    }

    #[test]
    fn report_sorts_and_counts() {
        let report = RunReport::new(
            ExecutionMode::Apply,
            2,
            vec![
                ChartOutcome::RewriteFailed {
                    chart: chart("sales", "b"),
                    error: "invalid filter shape".to_string(),
                },
                ChartOutcome::Changed {
                    chart: chart("marketing", "z"),
                    persisted: true,
                    diff: None,
                },
                ChartOutcome::Unchanged {
                    chart: chart("sales", "a"),
                },
            ],
            Vec::new(),
        );

        let names: Vec<_> = report.outcomes.iter().map(|o| o.chart().name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "b"]);

        let summary = report.summary();
        assert_eq!(summary.charts, 3);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.changed, 1);
        assert_eq!(summary.persisted, 1);
        assert_eq!(summary.failed, 1);
        assert!(report.has_failures());
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn summary_display() {
        let summary = RunSummary {
            charts: 4,
            unchanged: 1,
            changed: 2,
            persisted: 0,
            failed: 1,
            failed_spaces: 1,
        };
        assert_eq!(
            summary.to_string(),
            "4 charts: 1 unchanged, 2 changed (0 saved), 1 failed; 1 spaces could not be read"
        );
    }

    #[test]
    fn outcome_error_text() {
        let failed = ChartOutcome::PersistFailed {
            chart: chart("s", "c"),
            error: "read-only".to_string(),
        };
        assert_eq!(failed.error(), Some("read-only"));
        assert_eq!(
            ChartOutcome::Unchanged { chart: chart("s", "c") }.error(),
            None
        );
    }
}
