use std::collections::BTreeMap;

use semver::Version;
use serde::{Deserialize, Serialize};

/// A versioned unit inside a channel, together with the edges that let other
/// bundles upgrade into it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub name: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skips: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_range: Option<String>,
}

impl Bundle {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            display_name: None,
            replaces: None,
            skips: Vec::new(),
            skip_range: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_replaces(mut self, replaces: impl Into<String>) -> Self {
        self.replaces = Some(replaces.into());
        self
    }

    pub fn with_skips<I, S>(mut self, skips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skips = skips.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_skip_range(mut self, skip_range: impl Into<String>) -> Self {
        self.skip_range = Some(skip_range.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    #[serde(default)]
    pub bundles: Vec<Bundle>,
}

impl Channel {
    pub fn new(name: impl Into<String>, bundles: Vec<Bundle>) -> Self {
        Self {
            name: name.into(),
            bundles,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_channel: Option<String>,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl Package {
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        Self {
            name: name.into(),
            default_channel: None,
            channels,
        }
    }

    /// Every bundle declaration paired with the channel that declares it. A
    /// bundle listed in several channels is yielded once per channel.
    pub fn bundles(&self) -> impl Iterator<Item = (&Channel, &Bundle)> {
        self.channels
            .iter()
            .flat_map(|channel| channel.bundles.iter().map(move |bundle| (channel, bundle)))
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.name == name)
    }
}

/// One catalog snapshot: packages keyed by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    packages: BTreeMap<String, Package>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a package, returning the previous package of the same name.
    pub fn insert(&mut self, package: Package) -> Option<Package> {
        self.packages.insert(package.name.clone(), package)
    }

    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl FromIterator<Package> for Catalog {
    fn from_iter<T: IntoIterator<Item = Package>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for package in iter {
            catalog.insert(package);
        }
        catalog
    }
}
