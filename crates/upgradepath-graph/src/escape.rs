use std::collections::BTreeSet;

use semver::Version;

use crate::index::PackageView;

/// Channels of `current` that declare a direct upgrade edge away from the
/// problem bundle `(name, version)`.
///
/// Only one hop is considered. Edges declared by the problem bundle itself do
/// not count.
pub fn escape_channels(name: &str, version: &Version, current: &PackageView) -> BTreeSet<String> {
    current
        .descriptors()
        .filter(|descriptor| descriptor.bundle != name)
        .filter(|descriptor| descriptor.is_satisfied_by(name, version))
        .map(|descriptor| descriptor.channel.clone())
        .collect()
}
