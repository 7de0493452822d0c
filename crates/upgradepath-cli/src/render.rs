use std::collections::BTreeSet;
use std::io::IsTerminal;

use anstyle::{AnsiColor, Effects, Style};
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use upgradepath_graph::{BundleReport, Comparison, PackageReport};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum OutputFormat {
    /// One JSON object per affected package
    #[default]
    Json,
    /// One line per problem bundle
    Text,
    /// Affected package names grouped by older version
    Summary,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    if std::env::var_os("NO_COLOR").is_some() || !std::io::stdout().is_terminal() {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

pub(crate) fn render_json_line(report: &PackageReport) -> Result<String> {
    serde_json::to_string(report).with_context(|| {
        format!(
            "failed serializing report for package '{}'",
            report.package_name
        )
    })
}

pub(crate) fn render_text_lines(report: &PackageReport, style: OutputStyle) -> Vec<String> {
    report
        .bundles
        .iter()
        .map(|bundle| render_text_line(report, bundle, style))
        .collect()
}

fn render_text_line(report: &PackageReport, bundle: &BundleReport, style: OutputStyle) -> String {
    let mut line = format!(
        "{} {} {} {} {}",
        report.from_version,
        report.package_name,
        bundle.name,
        bundle.version,
        join_or_dash(&bundle.channels)
    );

    let Some(escape_channels) = &bundle.escape_channels else {
        return line;
    };
    line.push_str(&format!(" escape={}", join_or_dash(escape_channels)));
    let status = if escape_channels.is_empty() {
        "stuck"
    } else {
        "escape"
    };
    render_status_line(style, status, &line)
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => {
            let badge = format!("[{}]", status.to_ascii_uppercase());
            format!("{} {message}", colorize(status_style(status), &badge))
        }
    }
}

fn status_style(status: &str) -> Style {
    let color = match status {
        "escape" => AnsiColor::BrightGreen,
        "stuck" => AnsiColor::BrightRed,
        "warn" => AnsiColor::BrightYellow,
        _ => AnsiColor::BrightBlue,
    };
    Style::new()
        .fg_color(Some(color.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

fn join_or_dash(items: &BTreeSet<String>) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.iter().cloned().collect::<Vec<_>>().join(",")
    }
}

/// Affected package names per older version, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Summary {
    entries: Vec<(String, BTreeSet<String>)>,
}

impl Summary {
    pub(crate) fn record(&mut self, comparison: &Comparison) {
        if comparison.reports.is_empty() {
            return;
        }
        let packages = comparison
            .reports
            .iter()
            .map(|report| report.package_name.clone());
        match self
            .entries
            .iter_mut()
            .find(|(version, _)| *version == comparison.from_version)
        {
            Some((_, existing)) => existing.extend(packages),
            None => self
                .entries
                .push((comparison.from_version.clone(), packages.collect())),
        }
    }
}

impl Serialize for Summary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (version, packages) in &self.entries {
            map.serialize_entry(version, packages)?;
        }
        map.end()
    }
}

pub(crate) fn render_summary(summary: &Summary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed serializing summary")
}
