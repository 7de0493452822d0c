mod compare;
mod escape;
mod index;
mod reach;
mod report;
mod types;

pub use compare::{compare_catalogs, compare_incident_catalogs, evaluate_versions};
pub use escape::escape_channels;
pub use index::{
    EdgeDescriptor, EdgeIndex, EdgeWarning, PackageView, PredicateMatch, SkipRangePredicate,
};
pub use reach::{reachable_bundles, Reachability};
pub use report::{assemble_package_report, BundleReport, PackageReport, ReportMode};
pub use types::{Comparison, OlderSnapshot};

#[cfg(test)]
mod tests;
