//! Console rendering of a run report

use std::io::{self, Write};

use remodel_store::{ChartOutcome, ExecutionMode, RunReport};

const RULE: &str = "------";

/// Write the report; `verbose` adds before/after JSON for changed charts
///
/// # Errors
/// Any write error from `out`.
pub(crate) fn render(report: &RunReport, verbose: bool, out: &mut impl Write) -> io::Result<()> {
    if report.mode == ExecutionMode::DryRun {
        writeln!(out, "dry run: no chart was saved (pass --apply to save changes)")?;
    }

    for failure in &report.space_failures {
        writeln!(out, "error  space {} ({}): {}", failure.name, failure.uuid, failure.error)?;
    }

    for outcome in &report.outcomes {
        let chart = outcome.chart();
        match outcome {
            ChartOutcome::Unchanged { .. } => writeln!(out, "same   {chart}")?,
            ChartOutcome::Changed {
                persisted, diff, ..
            } => {
                let tag = if *persisted { "saved " } else { "change" };
                writeln!(out, "{tag} {chart}")?;
                if let (true, Some(diff)) = (verbose, diff) {
                    writeln!(out, "{RULE}")?;
                    writeln!(out, "{}", to_json(&diff.before))?;
                    writeln!(out, "{RULE}")?;
                    writeln!(out, "{}", to_json(&diff.after))?;
                    writeln!(out, "{RULE}")?;
                }
            }
            ChartOutcome::FetchFailed { error, .. } => {
                writeln!(out, "error  {chart}: could not fetch chart: {error}")?;
            }
            ChartOutcome::RewriteFailed { error, .. } => writeln!(
                out,
                "error  {chart}: could not be rewritten, investigate or rewrite it manually: {error}"
            )?,
            ChartOutcome::PersistFailed { error, .. } => {
                writeln!(out, "error  {chart}: could not save new version: {error}")?;
            }
        }
    }

    writeln!(out, "{}", report.summary())
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}
