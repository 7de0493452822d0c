use upgradepath_core::Catalog;

use crate::index::EdgeWarning;
use crate::report::PackageReport;

/// The snapshot(s) of one older catalog version. `current` is only present in
/// incident mode.
#[derive(Debug, Clone)]
pub struct OlderSnapshot {
    pub incident: Catalog,
    pub current: Option<Catalog>,
}

impl OlderSnapshot {
    pub fn basic(catalog: Catalog) -> Self {
        Self {
            incident: catalog,
            current: None,
        }
    }

    pub fn with_current(incident: Catalog, current: Catalog) -> Self {
        Self {
            incident,
            current: Some(current),
        }
    }
}

/// Result of evaluating one older version against the newer snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    pub from_version: String,
    pub to_version: String,
    pub reports: Vec<PackageReport>,
    pub warnings: Vec<EdgeWarning>,
}
