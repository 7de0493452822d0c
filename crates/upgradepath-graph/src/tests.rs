use std::collections::{BTreeMap, BTreeSet};

use semver::Version;
use upgradepath_core::{Bundle, Catalog, Channel, Package};

use super::*;

#[test]
fn direct_edges_from_seed_settle_in_first_pass() {
    let older = package("p", vec![channel("stable", vec![bundle("a", "1.0.0")])]);
    let newer = package(
        "p",
        vec![channel(
            "stable",
            vec![
                bundle("a", "1.0.0"),
                bundle("b", "2.0.0").with_replaces("a"),
                bundle("c", "3.0.0").with_skip_range("<2.5.0"),
                bundle("d", "4.0.0").with_replaces("z"),
            ],
        )],
    );

    let result = reach(&older, &newer);
    assert_eq!(names(&result.reachable), vec!["b", "c"]);
    assert_eq!(result.passes, 2);
}

#[test]
fn transitive_edges_settle_in_later_passes() {
    let older = package("p", vec![channel("stable", vec![bundle("a", "1.0.0")])]);
    let newer = package(
        "p",
        vec![channel(
            "stable",
            vec![
                bundle("b", "2.0.0").with_replaces("a"),
                bundle("e", "2.1.0").with_replaces("b"),
            ],
        )],
    );

    let result = reach(&older, &newer);
    assert_eq!(names(&result.reachable), vec!["b", "e"]);
    assert_eq!(result.passes, 3);
}

#[test]
fn cycle_not_rooted_in_seed_is_excluded() {
    let older = package("p", vec![channel("stable", vec![bundle("a", "1.0.0")])]);
    let newer = package(
        "p",
        vec![channel(
            "stable",
            vec![
                bundle("b", "2.0.0").with_replaces("a"),
                bundle("x", "5.0.0").with_replaces("y"),
                bundle("y", "5.1.0").with_replaces("x"),
            ],
        )],
    );

    let result = reach(&older, &newer);
    assert_eq!(names(&result.reachable), vec!["b"]);
}

#[test]
fn skips_edges_reach_candidates() {
    let older = package("p", vec![channel("stable", vec![bundle("a", "1.0.0")])]);
    let newer = package(
        "p",
        vec![channel(
            "stable",
            vec![bundle("b", "2.0.0").with_skips(["old", "a"])],
        )],
    );

    assert_eq!(names(&reach(&older, &newer).reachable), vec!["b"]);
}

#[test]
fn no_candidates_means_no_passes() {
    let older = package("p", vec![channel("stable", vec![bundle("a", "1.0.0")])]);
    let result = reach(&older, &older);
    assert!(result.is_empty());
    assert_eq!(result.passes, 0);
}

#[test]
fn unreachable_candidates_stop_after_first_pass() {
    let older = package("p", vec![channel("stable", vec![bundle("a", "1.0.0")])]);
    let newer = package(
        "p",
        vec![channel("stable", vec![bundle("b", "2.0.0").with_replaces("q")])],
    );

    let result = reach(&older, &newer);
    assert!(result.is_empty());
    assert_eq!(result.passes, 1);
}

#[test]
fn malformed_skip_range_keeps_other_predicates_working() {
    let older = package("p", vec![channel("stable", vec![bundle("a", "1.0.0")])]);
    let newer = package(
        "p",
        vec![channel(
            "stable",
            vec![
                bundle("b", "2.0.0")
                    .with_replaces("a")
                    .with_skip_range(">=banana"),
                bundle("c", "3.0.0").with_skip_range("<2.5.0"),
                bundle("d", "4.0.0").with_skip_range("not a range"),
            ],
        )],
    );

    let view = PackageView::build(&newer);
    assert_eq!(view.warnings.len(), 2);
    assert_eq!(view.warnings[0].bundle, "b");
    assert_eq!(view.warnings[0].skip_range, ">=banana");
    assert_eq!(view.warnings[0].channel, "stable");
    assert!(view.warnings[0].to_string().contains("not a valid semver range"));

    let result = reach(&older, &newer);
    assert_eq!(names(&result.reachable), vec!["b", "c"]);
}

#[test]
fn predicates_report_their_own_outcome() {
    let descriptor = EdgeDescriptor::from_bundle(
        "stable",
        &bundle("b", "2.0.0")
            .with_replaces("a")
            .with_skips(["s1", "s2"])
            .with_skip_range(">=1.0.0 <1.5.0"),
    );

    assert_eq!(descriptor.replaces_match("a"), PredicateMatch::Matched);
    assert_eq!(descriptor.replaces_match("a2"), PredicateMatch::NotMatched);
    assert_eq!(descriptor.skips_match("s2"), PredicateMatch::Matched);
    assert_eq!(descriptor.skips_match("a"), PredicateMatch::NotMatched);
    assert_eq!(
        descriptor.skip_range_match(&version("1.4.9")),
        PredicateMatch::Matched
    );
    assert_eq!(
        descriptor.skip_range_match(&version("1.5.0")),
        PredicateMatch::NotMatched
    );
    assert!(descriptor.is_satisfied_by("unrelated", &version("1.0.0")));
    assert!(descriptor.is_satisfied_by("s1", &version("9.0.0")));
    assert!(!descriptor.is_satisfied_by("unrelated", &version("9.0.0")));

    let broken = EdgeDescriptor::from_bundle("stable", &bundle("c", "3.0.0").with_skip_range("<"));
    assert_eq!(
        broken.skip_range_match(&version("0.1.0")),
        PredicateMatch::Invalid
    );
    assert!(matches!(
        broken.skip_range,
        SkipRangePredicate::Invalid { .. }
    ));

    let plain = EdgeDescriptor::from_bundle("stable", &bundle("d", "4.0.0"));
    assert_eq!(plain.skip_range, SkipRangePredicate::Absent);
    assert!(!plain.is_satisfied_by("", &version("0.0.0")));
}

#[test]
fn package_view_merges_bundles_listed_in_several_channels() {
    let newer = package(
        "p",
        vec![
            channel(
                "fast",
                vec![
                    bundle("a", "1.0.0").with_display_name("P Operator"),
                    bundle("b", "2.0.0")
                        .with_replaces("a")
                        .with_display_name("P Operator"),
                ],
            ),
            channel(
                "stable",
                vec![bundle("b", "2.0.0")
                    .with_skips(["a"])
                    .with_display_name("P Operator (legacy)")],
            ),
        ],
    );

    let view = PackageView::build(&newer);
    assert_eq!(view.name, "p");
    assert_eq!(view.versions.len(), 2);
    assert_eq!(
        view.channels_of("b"),
        set(&["fast", "stable"])
    );
    assert_eq!(view.channels_of("missing"), BTreeSet::new());
    assert_eq!(view.edges["b"].len(), 2);
    assert_eq!(view.edges["b"][0].channel, "fast");
    assert_eq!(view.edges["b"][1].channel, "stable");
    assert_eq!(
        view.display_names,
        set(&["P Operator", "P Operator (legacy)"])
    );
    assert_eq!(view.descriptors().count(), 3);
    assert!(view.warnings.is_empty());
}

#[test]
fn package_view_of_empty_package_is_empty() {
    let view = PackageView::build(&Package::new("empty", Vec::new()));
    assert!(view.versions.is_empty());
    assert!(view.edges.is_empty());
    assert!(view.channels.is_empty());
}

#[test]
fn only_in_excludes_names_present_in_older_snapshot() {
    let newer = PackageView::build(&package(
        "p",
        vec![channel(
            "stable",
            vec![bundle("a", "1.0.0"), bundle("b", "2.0.0")],
        )],
    ));
    let older = versions(&[("a", "1.0.0"), ("zzz", "0.1.0")]);
    assert_eq!(names(&newer.only_in(&older)), vec!["b"]);
}

#[test]
fn closure_matches_least_fixed_point_on_generated_graphs() {
    for case in 0..64 {
        let (seed, candidates, view) = generated_case(case);
        let result = reachable_bundles(&seed, &candidates, &view.edges);
        let expected = least_fixed_point(&seed, &candidates, &view.edges);
        assert_eq!(
            result.reachable.keys().cloned().collect::<BTreeSet<_>>(),
            expected,
            "case {case}"
        );

        let mut pool = seed.clone();
        pool.extend(result.reachable.clone());
        for (name, _) in &candidates {
            let supported = view.edges.get(name).is_some_and(|descriptors| {
                descriptors.iter().any(|d| d.is_satisfied_by_any(&pool))
            });
            assert_eq!(
                supported,
                result.reachable.contains_key(name),
                "case {case}: candidate {name} must be reachable iff supported"
            );
        }
        assert!(result.passes <= candidates.len() + 1);
    }
}

#[test]
fn closure_is_idempotent() {
    for case in 0..16 {
        let (seed, candidates, view) = generated_case(case);
        let first = reachable_bundles(&seed, &candidates, &view.edges);
        let second = reachable_bundles(&seed, &candidates, &view.edges);
        assert_eq!(first, second, "case {case}");
    }
}

#[test]
fn closure_is_monotone_in_seed_and_candidates() {
    for case in 0..32 {
        let (seed, candidates, view) = generated_case(case);
        let full = reachable_bundles(&seed, &candidates, &view.edges);

        for removed in seed.keys() {
            let mut smaller_seed = seed.clone();
            smaller_seed.remove(removed);
            let shrunk = reachable_bundles(&smaller_seed, &candidates, &view.edges);
            assert!(
                is_subset(&shrunk.reachable, &full.reachable),
                "case {case}: removing seed {removed} must not grow the result"
            );
        }

        for removed in candidates.keys() {
            let mut fewer = candidates.clone();
            fewer.remove(removed);
            let shrunk = reachable_bundles(&seed, &fewer, &view.edges);
            assert!(
                is_subset(&shrunk.reachable, &full.reachable),
                "case {case}: removing candidate {removed} must not grow the result"
            );
        }
    }
}

#[test]
fn escape_channels_lists_direct_edges_away_from_problem_bundle() {
    let current = PackageView::build(&package(
        "p",
        vec![
            channel(
                "stable",
                vec![
                    bundle("b", "2.0.0").with_skip_range("<=2.0.0"),
                    bundle("f", "2.0.1").with_replaces("b"),
                ],
            ),
            channel("fast", vec![bundle("g", "2.2.0").with_skip_range(">=2.0.0 <2.2.0")]),
            channel("candidate", vec![bundle("h", "3.0.0").with_replaces("f")]),
        ],
    ));

    assert_eq!(
        escape_channels("b", &version("2.0.0"), &current),
        set(&["fast", "stable"])
    );
    assert_eq!(
        escape_channels("unknown", &version("9.0.0"), &current),
        BTreeSet::new()
    );
}

#[test]
fn escape_channels_ignore_edges_declared_by_problem_bundle() {
    let own_edges_only = PackageView::build(&package(
        "p",
        vec![
            channel(
                "stable",
                vec![bundle("b", "2.0.0")
                    .with_replaces("b")
                    .with_skips(["b"])
                    .with_skip_range("<=2.0.0")],
            ),
            channel("fast", vec![bundle("b", "2.0.0").with_skip_range(">=1.0.0")]),
        ],
    ));
    assert_eq!(
        escape_channels("b", &version("2.0.0"), &own_edges_only),
        BTreeSet::new()
    );

    let with_successor = PackageView::build(&package(
        "p",
        vec![
            channel("stable", vec![bundle("b", "2.0.0").with_skip_range("<=2.0.0")]),
            channel("fast", vec![bundle("c", "2.1.0").with_skip_range("<=2.0.0")]),
        ],
    ));
    assert_eq!(
        escape_channels("b", &version("2.0.0"), &with_successor),
        set(&["fast"])
    );
}

#[test]
fn report_is_omitted_when_nothing_is_reachable() {
    let view = PackageView::build(&package("p", Vec::new()));
    assert_eq!(
        assemble_package_report("4.12", "4.18", &view, &Reachability::default(), ReportMode::Basic),
        None
    );
}

#[test]
fn basic_report_serializes_without_escape_fields() {
    let (from, to) = scenario_catalogs();
    let comparison = compare_catalogs("4.12", "4.18", &from, &to);
    assert_eq!(comparison.reports.len(), 1);

    let report = &comparison.reports[0];
    assert_eq!(report.package_name, "etcd");
    assert_eq!(report.from_version, "4.12");
    assert_eq!(report.to_version, "4.18");
    let bundle_names: Vec<&str> = report.bundles.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(bundle_names, vec!["etcd.v2", "etcd.v3"]);
    assert_eq!(report.display_names, set(&["etcd"]));
    assert_eq!(report.bundles[0].channels, set(&["fast", "stable"]));
    assert_eq!(report.bundles[0].escape_channels, None);

    let json = serde_json::to_value(report).expect("report must serialize");
    assert_eq!(json["fromVersion"], "4.12");
    assert_eq!(json["packageName"], "etcd");
    assert_eq!(json["displayNames"], serde_json::json!(["etcd"]));
    assert_eq!(json["bundles"][0]["version"], "2.0.0");
    assert_eq!(json["bundles"][0]["channels"], serde_json::json!(["fast", "stable"]));
    assert!(json["bundles"][0].get("hasEscapePath").is_none());
    assert!(json["bundles"][0].get("escapeChannels").is_none());
}

#[test]
fn compare_skips_packages_missing_from_newer_snapshot() {
    let from: Catalog = [
        package("etcd", vec![channel("stable", vec![bundle("etcd.v1", "1.0.0")])]),
        package("retired", vec![channel("stable", vec![bundle("r.v1", "1.0.0")])]),
    ]
    .into_iter()
    .collect();
    let to: Catalog = [package(
        "etcd",
        vec![channel("stable", vec![bundle("etcd.v2", "2.0.0").with_replaces("etcd.v1")])],
    )]
    .into_iter()
    .collect();

    let comparison = compare_catalogs("4.12", "4.18", &from, &to);
    assert_eq!(
        comparison
            .reports
            .iter()
            .map(|r| r.package_name.as_str())
            .collect::<Vec<_>>(),
        vec!["etcd"]
    );
}

#[test]
fn compare_omits_packages_with_empty_reachable_set() {
    let from: Catalog = [package("p", vec![channel("stable", vec![bundle("a", "1.0.0")])])]
        .into_iter()
        .collect();
    let to: Catalog = [package(
        "p",
        vec![channel("stable", vec![bundle("b", "2.0.0").with_replaces("elsewhere")])],
    )]
    .into_iter()
    .collect();

    assert!(compare_catalogs("4.12", "4.18", &from, &to).reports.is_empty());
}

#[test]
fn compare_surfaces_malformed_range_warnings() {
    let from: Catalog = [package("p", vec![channel("stable", vec![bundle("a", "1.0.0")])])]
        .into_iter()
        .collect();
    let to: Catalog = [package(
        "p",
        vec![channel(
            "stable",
            vec![bundle("b", "2.0.0")
                .with_replaces("a")
                .with_skip_range(">=1.0 <2.0")],
        )],
    )]
    .into_iter()
    .collect();

    let comparison = compare_catalogs("4.12", "4.18", &from, &to);
    assert_eq!(comparison.reports.len(), 1);
    assert_eq!(comparison.warnings.len(), 1);
    assert_eq!(comparison.warnings[0].package, "p");
    assert_eq!(comparison.warnings[0].skip_range, ">=1.0 <2.0");
}

#[test]
fn incident_comparison_reports_escape_channels() {
    let (incident, to) = scenario_catalogs();
    let current: Catalog = [package(
        "etcd",
        vec![
            channel(
                "stable",
                vec![
                    bundle("etcd.v1", "1.0.0"),
                    bundle("etcd.v1.1", "1.1.0").with_skips(["etcd.v2"]),
                ],
            ),
            channel("fast", vec![bundle("etcd.v1", "1.0.0")]),
        ],
    )]
    .into_iter()
    .collect();

    let comparison = compare_incident_catalogs("4.12", "4.18", &incident, &current, &to);
    let report = &comparison.reports[0];
    assert_eq!(report.bundles[0].name, "etcd.v2");
    assert_eq!(report.bundles[0].escape_channels, Some(set(&["stable"])));
    assert_eq!(report.bundles[0].has_escape_path, Some(true));
    assert_eq!(report.bundles[1].name, "etcd.v3");
    assert_eq!(report.bundles[1].escape_channels, Some(BTreeSet::new()));
    assert_eq!(report.bundles[1].has_escape_path, Some(false));

    let json = serde_json::to_value(report).expect("report must serialize");
    assert_eq!(json["bundles"][0]["hasEscapePath"], true);
    assert_eq!(json["bundles"][0]["escapeChannels"], serde_json::json!(["stable"]));
}

#[test]
fn incident_comparison_without_current_package_has_no_escape() {
    let (incident, to) = scenario_catalogs();
    let current = Catalog::new();

    let comparison = compare_incident_catalogs("4.12", "4.18", &incident, &current, &to);
    assert_eq!(comparison.reports.len(), 1);
    for bundle in &comparison.reports[0].bundles {
        assert_eq!(bundle.escape_channels, Some(BTreeSet::new()));
        assert_eq!(bundle.has_escape_path, Some(false));
    }
}

#[test]
fn evaluate_versions_walks_older_versions_in_order() {
    let (from, to) = scenario_catalogs();
    let mut older = BTreeMap::new();
    older.insert("4.12".to_string(), from.clone());
    older.insert("4.13".to_string(), to.clone());

    let mut seen = Vec::new();
    evaluate_versions(
        &["4.13".to_string(), "4.12".to_string()],
        "4.18",
        &to,
        |label| {
            older
                .get(label)
                .cloned()
                .map(OlderSnapshot::basic)
                .ok_or_else(|| anyhow::anyhow!("no snapshot {label}"))
        },
        |comparison| {
            seen.push((comparison.from_version.clone(), comparison.reports.len()));
            Ok(())
        },
    )
    .expect("evaluation must succeed");

    assert_eq!(
        seen,
        vec![("4.13".to_string(), 0), ("4.12".to_string(), 1)]
    );
}

#[test]
fn evaluate_versions_aborts_on_load_failure() {
    let (_, to) = scenario_catalogs();
    let mut calls = 0;
    let err = evaluate_versions(
        &["4.12".to_string(), "4.13".to_string()],
        "4.18",
        &to,
        |label| Err(anyhow::anyhow!("loading catalog \"catalogs/{label}\"")),
        |_| {
            calls += 1;
            Ok(())
        },
    )
    .expect_err("load failure must abort");

    assert!(err.to_string().contains("catalogs/4.12"));
    assert_eq!(calls, 0);
}

#[test]
fn evaluate_versions_uses_current_snapshot_when_present() {
    let (from, to) = scenario_catalogs();
    let mut extended = false;
    evaluate_versions(
        &["4.12".to_string()],
        "4.18",
        &to,
        |_| Ok(OlderSnapshot::with_current(from.clone(), Catalog::new())),
        |comparison| {
            extended = comparison.reports[0].bundles[0].has_escape_path.is_some();
            Ok(())
        },
    )
    .expect("evaluation must succeed");
    assert!(extended);
}

fn scenario_catalogs() -> (Catalog, Catalog) {
    let from: Catalog = [package(
        "etcd",
        vec![channel(
            "stable",
            vec![bundle("etcd.v1", "1.0.0").with_display_name("etcd (old)")],
        )],
    )]
    .into_iter()
    .collect();
    let to: Catalog = [package(
        "etcd",
        vec![
            channel(
                "fast",
                vec![bundle("etcd.v2", "2.0.0")
                    .with_replaces("etcd.v1")
                    .with_display_name("etcd")],
            ),
            channel(
                "stable",
                vec![
                    bundle("etcd.v1", "1.0.0").with_display_name("etcd"),
                    bundle("etcd.v2", "2.0.0")
                        .with_replaces("etcd.v1")
                        .with_display_name("etcd"),
                    bundle("etcd.v3", "3.0.0")
                        .with_replaces("etcd.v2")
                        .with_display_name("etcd"),
                ],
            ),
        ],
    )]
    .into_iter()
    .collect();
    (from, to)
}

fn reach(older: &Package, newer: &Package) -> Reachability {
    let older = PackageView::build(older);
    let newer = PackageView::build(newer);
    let candidates = newer.only_in(&older.versions);
    reachable_bundles(&older.versions, &candidates, &newer.edges)
}

fn least_fixed_point(
    seed: &BTreeMap<String, Version>,
    candidates: &BTreeMap<String, Version>,
    edges: &EdgeIndex,
) -> BTreeSet<String> {
    let mut pool = seed.clone();
    let mut result = BTreeSet::new();
    loop {
        let mut changed = false;
        for (name, version) in candidates {
            if result.contains(name) {
                continue;
            }
            let supported = edges
                .get(name)
                .is_some_and(|descriptors| descriptors.iter().any(|d| d.is_satisfied_by_any(&pool)));
            if supported {
                result.insert(name.clone());
                pool.insert(name.clone(), version.clone());
                changed = true;
            }
        }
        if !changed {
            return result;
        }
    }
}

struct Lcg(u64);

impl Lcg {
    fn below(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) % bound
    }
}

fn generated_case(
    case: u64,
) -> (
    BTreeMap<String, Version>,
    BTreeMap<String, Version>,
    PackageView,
) {
    let mut rng = Lcg(case.wrapping_add(17));
    let old_names: Vec<String> = (0..3).map(|i| format!("old{i}")).collect();
    let new_names: Vec<String> = (0..8).map(|i| format!("new{i}")).collect();
    let all_names: Vec<&String> = old_names.iter().chain(new_names.iter()).collect();
    let ranges = ["<1.0.2", ">=2.3.0 <2.6.0", ">=1.0.0 <1.0.1 || >=2.7.0", "garbage"];

    let seed: BTreeMap<String, Version> = old_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), Version::new(1, 0, i as u64)))
        .collect();

    let mut channels = vec![channel(
        "stable",
        seed.iter()
            .map(|(name, version)| Bundle::new(name.clone(), version.clone()))
            .collect(),
    )];
    let mut fast = Vec::new();
    for (i, name) in new_names.iter().enumerate() {
        let mut bundle = Bundle::new(name.clone(), Version::new(2, i as u64, 0));
        match rng.below(4) {
            0 => {}
            1 => {
                let target = all_names[rng.below(all_names.len() as u64) as usize];
                bundle = bundle.with_replaces(target.clone());
            }
            2 => {
                let first = all_names[rng.below(all_names.len() as u64) as usize];
                let second = all_names[rng.below(all_names.len() as u64) as usize];
                bundle = bundle.with_skips([first.clone(), second.clone()]);
            }
            _ => {
                bundle = bundle.with_skip_range(ranges[rng.below(ranges.len() as u64) as usize]);
            }
        }
        if rng.below(2) == 0 {
            channels[0].bundles.push(bundle);
        } else {
            fast.push(bundle);
        }
    }
    channels.push(channel("fast", fast));

    let view = PackageView::build(&package("generated", channels));
    let candidates = view.only_in(&seed);
    (seed, candidates, view)
}

fn is_subset(small: &BTreeMap<String, Version>, large: &BTreeMap<String, Version>) -> bool {
    small.keys().all(|name| large.contains_key(name))
}

fn version(input: &str) -> Version {
    Version::parse(input).expect("version should parse")
}

fn versions(pairs: &[(&str, &str)]) -> BTreeMap<String, Version> {
    pairs
        .iter()
        .map(|(name, v)| (name.to_string(), version(v)))
        .collect()
}

fn bundle(name: &str, v: &str) -> Bundle {
    Bundle::new(name, version(v))
}

fn channel(name: &str, bundles: Vec<Bundle>) -> Channel {
    Channel::new(name, bundles)
}

fn package(name: &str, channels: Vec<Channel>) -> Package {
    Package::new(name, channels)
}

fn names(map: &BTreeMap<String, Version>) -> Vec<&str> {
    map.keys().map(String::as_str).collect()
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|item| item.to_string()).collect()
}
