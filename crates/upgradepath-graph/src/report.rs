use std::collections::BTreeSet;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::escape::escape_channels;
use crate::index::PackageView;
use crate::reach::Reachability;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleReport {
    pub name: String,
    pub version: Version,
    pub channels: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escape_channels: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_escape_path: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageReport {
    pub from_version: String,
    pub to_version: String,
    pub package_name: String,
    pub display_names: BTreeSet<String>,
    pub bundles: Vec<BundleReport>,
}

#[derive(Debug, Clone, Copy)]
pub enum ReportMode<'a> {
    Basic,
    /// `current` is the package in the current snapshot of the older version,
    /// if that snapshot still carries it.
    Incident { current: Option<&'a PackageView> },
}

/// Builds the report record for one package, or `None` when nothing is
/// reachable.
pub fn assemble_package_report(
    from_version: &str,
    to_version: &str,
    newer: &PackageView,
    reachability: &Reachability,
    mode: ReportMode<'_>,
) -> Option<PackageReport> {
    if reachability.is_empty() {
        return None;
    }

    let bundles = reachability
        .reachable
        .iter()
        .map(|(name, version)| {
            let (escape, has_escape_path) = match mode {
                ReportMode::Basic => (None, None),
                ReportMode::Incident { current } => {
                    let channels = current
                        .map(|view| escape_channels(name, version, view))
                        .unwrap_or_default();
                    let has_escape_path = !channels.is_empty();
                    (Some(channels), Some(has_escape_path))
                }
            };
            BundleReport {
                name: name.clone(),
                version: version.clone(),
                channels: newer.channels_of(name),
                escape_channels: escape,
                has_escape_path,
            }
        })
        .collect();

    Some(PackageReport {
        from_version: from_version.to_string(),
        to_version: to_version.to_string(),
        package_name: newer.name.clone(),
        display_names: newer.display_names.clone(),
        bundles,
    })
}
