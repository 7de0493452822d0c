use anyhow::Result;
use upgradepath_core::Catalog;

use crate::index::PackageView;
use crate::reach::reachable_bundles;
use crate::report::{assemble_package_report, ReportMode};
use crate::types::{Comparison, OlderSnapshot};

/// Reports, per package of `from`, the bundles new in `to` that `from`'s
/// bundles can upgrade into.
pub fn compare_catalogs(
    from_version: &str,
    to_version: &str,
    from: &Catalog,
    to: &Catalog,
) -> Comparison {
    compare(from_version, to_version, from, to, None)
}

/// Like [`compare_catalogs`], and additionally looks up, for every problem
/// bundle, the channels of `current` that offer an edge away from it.
pub fn compare_incident_catalogs(
    from_version: &str,
    to_version: &str,
    incident: &Catalog,
    current: &Catalog,
    to: &Catalog,
) -> Comparison {
    compare(from_version, to_version, incident, to, Some(current))
}

/// Evaluates every older version against the already-loaded `to` snapshot.
/// `load_older` supplies the older snapshot(s) per version and each
/// comparison is handed to `on_comparison` as soon as it is computed.
pub fn evaluate_versions<L, S>(
    from_versions: &[String],
    to_version: &str,
    to: &Catalog,
    mut load_older: L,
    mut on_comparison: S,
) -> Result<()>
where
    L: FnMut(&str) -> Result<OlderSnapshot>,
    S: FnMut(Comparison) -> Result<()>,
{
    for from_version in from_versions {
        let older = load_older(from_version)?;
        let comparison = match &older.current {
            Some(current) => compare_incident_catalogs(
                from_version,
                to_version,
                &older.incident,
                current,
                to,
            ),
            None => compare_catalogs(from_version, to_version, &older.incident, to),
        };
        on_comparison(comparison)?;
    }
    Ok(())
}

fn compare(
    from_version: &str,
    to_version: &str,
    from: &Catalog,
    to: &Catalog,
    current: Option<&Catalog>,
) -> Comparison {
    let mut comparison = Comparison {
        from_version: from_version.to_string(),
        to_version: to_version.to_string(),
        ..Comparison::default()
    };

    for from_package in from.packages() {
        let Some(to_package) = to.package(&from_package.name) else {
            continue;
        };

        let older = PackageView::build(from_package);
        let newer = PackageView::build(to_package);
        comparison.warnings.extend(newer.warnings.iter().cloned());

        let candidates = newer.only_in(&older.versions);
        if candidates.is_empty() {
            continue;
        }

        let reachability = reachable_bundles(&older.versions, &candidates, &newer.edges);
        log::debug!(
            "{from_version} -> {to_version}: package {} has {} of {} new bundles reachable after {} passes",
            newer.name,
            reachability.reachable.len(),
            candidates.len(),
            reachability.passes
        );
        if reachability.is_empty() {
            continue;
        }

        let current_view =
            current.map(|catalog| catalog.package(&newer.name).map(PackageView::build));
        if let Some(Some(view)) = &current_view {
            comparison.warnings.extend(view.warnings.iter().cloned());
        }
        let mode = match &current_view {
            None => ReportMode::Basic,
            Some(view) => ReportMode::Incident {
                current: view.as_ref(),
            },
        };

        if let Some(report) =
            assemble_package_report(from_version, to_version, &newer, &reachability, mode)
        {
            comparison.reports.push(report);
        }
    }

    comparison
}
