use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use semver::Version;
use serde::Serialize;
use upgradepath_core::{Bundle, Package, SkipRange};

/// Outcome of evaluating one edge predicate against one source bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateMatch {
    Matched,
    NotMatched,
    /// The predicate could not be compiled and never matches.
    Invalid,
}

impl PredicateMatch {
    fn from_bool(matched: bool) -> Self {
        if matched {
            Self::Matched
        } else {
            Self::NotMatched
        }
    }

    pub fn is_match(self) -> bool {
        self == Self::Matched
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipRangePredicate {
    Absent,
    Valid(SkipRange),
    Invalid { raw: String, reason: String },
}

impl SkipRangePredicate {
    pub fn compile(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Absent;
        };
        match SkipRange::parse(raw) {
            Ok(range) => Self::Valid(range),
            Err(err) => Self::Invalid {
                raw: raw.to_string(),
                reason: format!("{err:#}"),
            },
        }
    }

    pub fn evaluate(&self, version: &Version) -> PredicateMatch {
        match self {
            Self::Absent => PredicateMatch::NotMatched,
            Self::Valid(range) => PredicateMatch::from_bool(range.matches(version)),
            Self::Invalid { .. } => PredicateMatch::Invalid,
        }
    }
}

/// The upgrade edges one bundle declares in one channel. Edges point from the
/// sources they name toward `bundle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeDescriptor {
    pub bundle: String,
    pub channel: String,
    pub replaces: Option<String>,
    pub skips: BTreeSet<String>,
    pub skip_range: SkipRangePredicate,
}

impl EdgeDescriptor {
    pub fn from_bundle(channel: &str, bundle: &Bundle) -> Self {
        Self {
            bundle: bundle.name.clone(),
            channel: channel.to_string(),
            replaces: bundle.replaces.clone(),
            skips: bundle.skips.iter().cloned().collect(),
            skip_range: SkipRangePredicate::compile(bundle.skip_range.as_deref()),
        }
    }

    pub fn replaces_match(&self, source: &str) -> PredicateMatch {
        PredicateMatch::from_bool(self.replaces.as_deref() == Some(source))
    }

    pub fn skips_match(&self, source: &str) -> PredicateMatch {
        PredicateMatch::from_bool(self.skips.contains(source))
    }

    pub fn skip_range_match(&self, source_version: &Version) -> PredicateMatch {
        self.skip_range.evaluate(source_version)
    }

    pub fn is_satisfied_by(&self, source: &str, source_version: &Version) -> bool {
        self.replaces_match(source).is_match()
            || self.skips_match(source).is_match()
            || self.skip_range_match(source_version).is_match()
    }

    pub fn is_satisfied_by_any(&self, sources: &BTreeMap<String, Version>) -> bool {
        sources
            .iter()
            .any(|(name, version)| self.is_satisfied_by(name, version))
    }
}

/// A `skipRange` that failed to parse. The edge stays usable through its other
/// predicates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeWarning {
    pub package: String,
    pub channel: String,
    pub bundle: String,
    pub skip_range: String,
    pub reason: String,
}

impl fmt::Display for EdgeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "skipRange {:?} of bundle '{}' in channel '{}' of package '{}' is not a valid semver range: {}",
            self.skip_range, self.bundle, self.channel, self.package, self.reason
        )
    }
}

/// Edge descriptors keyed by the name of the bundle that declares them.
pub type EdgeIndex = BTreeMap<String, Vec<EdgeDescriptor>>;

/// Everything the reachability passes need to know about one package in one
/// snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageView {
    pub name: String,
    pub versions: BTreeMap<String, Version>,
    pub edges: EdgeIndex,
    pub channels: BTreeMap<String, BTreeSet<String>>,
    pub display_names: BTreeSet<String>,
    pub warnings: Vec<EdgeWarning>,
}

impl PackageView {
    pub fn build(package: &Package) -> Self {
        let mut view = Self {
            name: package.name.clone(),
            ..Self::default()
        };

        for (channel, bundle) in package.bundles() {
            view.versions
                .insert(bundle.name.clone(), bundle.version.clone());
            view.channels
                .entry(bundle.name.clone())
                .or_default()
                .insert(channel.name.clone());
            if let Some(display_name) = &bundle.display_name {
                view.display_names.insert(display_name.clone());
            }

            let descriptor = EdgeDescriptor::from_bundle(&channel.name, bundle);
            if let SkipRangePredicate::Invalid { raw, reason } = &descriptor.skip_range {
                view.warnings.push(EdgeWarning {
                    package: package.name.clone(),
                    channel: channel.name.clone(),
                    bundle: bundle.name.clone(),
                    skip_range: raw.clone(),
                    reason: reason.clone(),
                });
            }
            view.edges
                .entry(bundle.name.clone())
                .or_default()
                .push(descriptor);
        }

        view
    }

    /// Bundles of this view whose names are absent from `older`.
    pub fn only_in(&self, older: &BTreeMap<String, Version>) -> BTreeMap<String, Version> {
        self.versions
            .iter()
            .filter(|(name, _)| !older.contains_key(*name))
            .map(|(name, version)| (name.clone(), version.clone()))
            .collect()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &EdgeDescriptor> {
        self.edges.values().flatten()
    }

    pub fn channels_of(&self, bundle: &str) -> BTreeSet<String> {
        self.channels.get(bundle).cloned().unwrap_or_default()
    }
}
