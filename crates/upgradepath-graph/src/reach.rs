use std::collections::BTreeMap;

use semver::Version;

use crate::index::EdgeIndex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reachability {
    pub reachable: BTreeMap<String, Version>,
    /// Relaxation passes executed, including the final pass that added nothing.
    pub passes: usize,
}

impl Reachability {
    pub fn is_empty(&self) -> bool {
        self.reachable.is_empty()
    }
}

/// Computes the candidates reachable from `seed` through upgrade edges.
///
/// Edges are indexed by the bundle declaring them, so the closure is found by
/// relaxation: the first pass tests every candidate against `seed`, each later
/// pass tests the still-unsettled candidates against the bundles settled so
/// far, and the loop ends on the first pass that settles nothing. Candidates
/// that only reach each other are never settled.
pub fn reachable_bundles(
    seed: &BTreeMap<String, Version>,
    candidates: &BTreeMap<String, Version>,
    edges: &EdgeIndex,
) -> Reachability {
    if candidates.is_empty() {
        return Reachability::default();
    }

    let mut reachable: BTreeMap<String, Version> = BTreeMap::new();
    let mut remaining: BTreeMap<&str, &Version> = candidates
        .iter()
        .map(|(name, version)| (name.as_str(), version))
        .collect();
    let mut passes = 0;

    loop {
        let sources = if passes == 0 { seed } else { &reachable };
        let settled: Vec<&str> = remaining
            .keys()
            .copied()
            .filter(|name| has_edge_from(edges, name, sources))
            .collect();
        passes += 1;

        if settled.is_empty() {
            break;
        }
        for name in settled {
            if let Some(version) = remaining.remove(name) {
                reachable.insert(name.to_string(), version.clone());
            }
        }
    }

    Reachability { reachable, passes }
}

pub(crate) fn has_edge_from(
    edges: &EdgeIndex,
    target: &str,
    sources: &BTreeMap<String, Version>,
) -> bool {
    edges.get(target).is_some_and(|descriptors| {
        descriptors
            .iter()
            .any(|descriptor| descriptor.is_satisfied_by_any(sources))
    })
}
