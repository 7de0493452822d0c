use std::collections::BTreeSet;
use std::io::Write;

use anyhow::{Context, Result};
use upgradepath_catalog::CatalogStore;
use upgradepath_graph::{evaluate_versions, Comparison, EdgeWarning, OlderSnapshot};

use crate::config::{RunConfig, RunMode};
use crate::render::{
    render_json_line, render_summary, render_text_lines, OutputFormat, OutputStyle, Summary,
};

/// Loads the target catalog once, then evaluates every older version against
/// it, writing records to `writer` as each version completes.
pub(crate) fn run_analysis<W: Write>(
    config: &RunConfig,
    style: OutputStyle,
    writer: &mut W,
) -> Result<()> {
    let store = CatalogStore::open(&config.catalogs_dir);
    let current_store = match &config.mode {
        RunMode::Reach => None,
        RunMode::Incident {
            current_catalogs_dir,
        } => Some(CatalogStore::open(current_catalogs_dir)),
    };

    let to = store.load(&config.to_version)?;

    let mut summary = Summary::default();
    let mut reported_warnings: BTreeSet<EdgeWarning> = BTreeSet::new();
    evaluate_versions(
        &config.from_versions,
        &config.to_version,
        &to,
        |label| {
            let incident = store.load(label)?;
            match &current_store {
                Some(current_store) => Ok(OlderSnapshot::with_current(
                    incident,
                    current_store.load(label)?,
                )),
                None => Ok(OlderSnapshot::basic(incident)),
            }
        },
        |comparison| {
            report_warnings(&comparison, &mut reported_warnings);
            log::info!(
                "{} -> {}: {} affected packages",
                comparison.from_version,
                comparison.to_version,
                comparison.reports.len()
            );
            write_comparison(&comparison, config.output, style, &mut summary, writer)
        },
    )?;

    if config.output == OutputFormat::Summary {
        writeln!(writer, "{}", render_summary(&summary)?).context("failed writing summary")?;
    }
    Ok(())
}

fn write_comparison<W: Write>(
    comparison: &Comparison,
    output: OutputFormat,
    style: OutputStyle,
    summary: &mut Summary,
    writer: &mut W,
) -> Result<()> {
    match output {
        OutputFormat::Json => {
            for report in &comparison.reports {
                writeln!(writer, "{}", render_json_line(report)?)
                    .context("failed writing report record")?;
            }
        }
        OutputFormat::Text => {
            for report in &comparison.reports {
                for line in render_text_lines(report, style) {
                    writeln!(writer, "{line}").context("failed writing report line")?;
                }
            }
        }
        OutputFormat::Summary => summary.record(comparison),
    }
    Ok(())
}

// The target snapshot is shared by every older version, so the same warning
// comes back once per version.
fn report_warnings(comparison: &Comparison, reported: &mut BTreeSet<EdgeWarning>) {
    for warning in &comparison.warnings {
        if reported.insert(warning.clone()) {
            log::warn!("{warning}");
        }
    }
}
