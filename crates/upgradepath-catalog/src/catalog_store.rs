use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use upgradepath_core::Catalog;

use crate::convert::convert_to_catalog;
use crate::declcfg::read_declarative_config;

/// A directory holding one catalog snapshot per version label, laid out as
/// `<root>/<label>/`.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    root: PathBuf,
}

impl CatalogStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn snapshot_dir(&self, label: &str) -> PathBuf {
        self.root.join(label)
    }

    pub fn load(&self, label: &str) -> Result<Catalog> {
        load_catalog_dir(&self.snapshot_dir(label))
    }
}

pub fn load_catalog_dir(dir: &Path) -> Result<Catalog> {
    let config = read_declarative_config(dir)
        .with_context(|| format!("loading catalog \"{}\"", dir.display()))?;
    log::debug!(
        "read {} packages, {} channels, {} bundles from {} ({} other documents ignored)",
        config.packages.len(),
        config.channels.len(),
        config.bundles.len(),
        dir.display(),
        config.ignored
    );

    let catalog = convert_to_catalog(config)
        .with_context(|| format!("converting catalog \"{}\" to model", dir.display()))?;
    log::info!("loaded catalog {} ({} packages)", dir.display(), catalog.len());
    Ok(catalog)
}
