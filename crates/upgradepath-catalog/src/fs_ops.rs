use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CatalogFileFormat {
    Json,
    Yaml,
}

impl CatalogFileFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Some(Self::Json),
            Some("yaml" | "yml") => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Lists catalog documents below `root` in sorted path order, skipping hidden
/// files and directories.
pub(crate) fn collect_catalog_files(root: &Path) -> Result<Vec<(PathBuf, CatalogFileFormat)>> {
    if !root.is_dir() {
        anyhow::bail!("catalog location is not a directory: {}", root.display());
    }

    let mut files = Vec::new();
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    queue.push_back(root.to_path_buf());

    while let Some(dir) = queue.pop_front() {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("failed reading catalog directory {}", dir.display()))?
        {
            entries.push(entry?);
        }
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                queue.push_back(path);
            } else if file_type.is_file() {
                if let Some(format) = CatalogFileFormat::from_path(&path) {
                    files.push((path, format));
                }
            }
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}
