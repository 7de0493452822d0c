use std::collections::{BTreeMap, BTreeSet};

use anyhow::{anyhow, bail, Context, Result};
use semver::Version;
use upgradepath_core::{Bundle, Catalog, Channel, Package};

use crate::declcfg::{ChannelEntry, DeclarativeBundle, DeclarativeConfig};

#[derive(Debug, Clone)]
struct BundleRecord {
    version: Version,
    display_name: Option<String>,
}

/// Converts raw catalog documents into the package → channel → bundle model.
pub fn convert_to_catalog(config: DeclarativeConfig) -> Result<Catalog> {
    let mut packages: BTreeMap<String, Package> = BTreeMap::new();
    for declared in config.packages {
        if packages.contains_key(&declared.name) {
            bail!("duplicate package '{}'", declared.name);
        }
        let mut package = Package::new(declared.name.clone(), Vec::new());
        package.default_channel = declared.default_channel;
        packages.insert(declared.name, package);
    }

    let mut bundles: BTreeMap<String, BTreeMap<String, BundleRecord>> = BTreeMap::new();
    for declared in &config.bundles {
        if !packages.contains_key(&declared.package) {
            bail!(
                "bundle '{}' references unknown package '{}'",
                declared.name,
                declared.package
            );
        }
        let record = bundle_record(declared)?;
        let package_bundles = bundles.entry(declared.package.clone()).or_default();
        if package_bundles
            .insert(declared.name.clone(), record)
            .is_some()
        {
            bail!(
                "duplicate bundle '{}' in package '{}'",
                declared.name,
                declared.package
            );
        }
    }

    let mut referenced: BTreeSet<(String, String)> = BTreeSet::new();
    for declared in config.channels {
        let package = packages.get_mut(&declared.package).ok_or_else(|| {
            anyhow!(
                "channel '{}' references unknown package '{}'",
                declared.name,
                declared.package
            )
        })?;
        if package.channel(&declared.name).is_some() {
            bail!(
                "duplicate channel '{}' in package '{}'",
                declared.name,
                declared.package
            );
        }

        let package_bundles = bundles.get(&declared.package);
        let mut channel_bundles = Vec::with_capacity(declared.entries.len());
        for entry in declared.entries {
            let record = package_bundles
                .and_then(|known| known.get(&entry.name))
                .ok_or_else(|| {
                    anyhow!(
                        "channel '{}' of package '{}' references unknown bundle '{}'",
                        declared.name,
                        declared.package,
                        entry.name
                    )
                })?;
            referenced.insert((declared.package.clone(), entry.name.clone()));
            channel_bundles.push(bundle_from_entry(entry, record));
        }
        package
            .channels
            .push(Channel::new(declared.name, channel_bundles));
    }

    for (package_name, package_bundles) in &bundles {
        for bundle_name in package_bundles.keys() {
            if !referenced.contains(&(package_name.clone(), bundle_name.clone())) {
                bail!(
                    "bundle '{bundle_name}' of package '{package_name}' is not listed in any channel"
                );
            }
        }
    }

    let mut catalog = Catalog::new();
    for (name, mut package) in packages {
        if package.channels.is_empty() {
            bail!("package '{name}' has no channels");
        }
        package.channels.sort_by(|a, b| a.name.cmp(&b.name));
        catalog.insert(package);
    }
    Ok(catalog)
}

fn bundle_record(declared: &DeclarativeBundle) -> Result<BundleRecord> {
    let property = declared.package_property()?.ok_or_else(|| {
        anyhow!(
            "bundle '{}' has no '{}' property",
            declared.name,
            crate::declcfg::PROPERTY_PACKAGE
        )
    })?;
    if property.package_name != declared.package {
        bail!(
            "bundle '{}' declares package '{}' in its properties but belongs to '{}'",
            declared.name,
            property.package_name,
            declared.package
        );
    }
    let version = Version::parse(&property.version).with_context(|| {
        format!(
            "bundle '{}' has invalid version '{}'",
            declared.name, property.version
        )
    })?;
    let display_name = declared
        .csv_metadata()?
        .and_then(|metadata| metadata.display_name);

    Ok(BundleRecord {
        version,
        display_name,
    })
}

fn bundle_from_entry(entry: ChannelEntry, record: &BundleRecord) -> Bundle {
    Bundle {
        name: entry.name,
        version: record.version.clone(),
        display_name: record.display_name.clone(),
        replaces: entry.replaces.filter(|name| !name.is_empty()),
        skips: entry.skips,
        skip_range: entry.skip_range.filter(|range| !range.is_empty()),
    }
}
