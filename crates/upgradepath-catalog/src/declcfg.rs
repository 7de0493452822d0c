use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fs_ops::{collect_catalog_files, CatalogFileFormat};

pub const SCHEMA_PACKAGE: &str = "olm.package";
pub const SCHEMA_CHANNEL: &str = "olm.channel";
pub const SCHEMA_BUNDLE: &str = "olm.bundle";

pub const PROPERTY_PACKAGE: &str = "olm.package";
pub const PROPERTY_CSV_METADATA: &str = "olm.csv.metadata";

/// The raw documents of one File-Based Catalog directory, grouped by schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclarativeConfig {
    pub packages: Vec<DeclarativePackage>,
    pub channels: Vec<DeclarativeChannel>,
    pub bundles: Vec<DeclarativeBundle>,
    /// Documents with a schema this tool does not interpret.
    pub ignored: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeclarativePackage {
    pub name: String,
    #[serde(default)]
    pub default_channel: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeclarativeChannel {
    pub package: String,
    pub name: String,
    #[serde(default)]
    pub entries: Vec<ChannelEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelEntry {
    pub name: String,
    #[serde(default)]
    pub replaces: Option<String>,
    #[serde(default)]
    pub skips: Vec<String>,
    #[serde(default)]
    pub skip_range: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeclarativeBundle {
    pub package: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackageProperty {
    pub package_name: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadataProperty {
    #[serde(default)]
    pub display_name: Option<String>,
}

impl DeclarativeBundle {
    pub fn package_property(&self) -> Result<Option<PackageProperty>> {
        self.first_property(PROPERTY_PACKAGE)
    }

    pub fn csv_metadata(&self) -> Result<Option<CsvMetadataProperty>> {
        self.first_property(PROPERTY_CSV_METADATA)
    }

    fn first_property<T: DeserializeOwned>(&self, kind: &str) -> Result<Option<T>> {
        let Some(property) = self.properties.iter().find(|p| p.kind == kind) else {
            return Ok(None);
        };
        let parsed = serde_json::from_value(property.value.clone()).with_context(|| {
            format!("bundle '{}' has a malformed '{kind}' property", self.name)
        })?;
        Ok(Some(parsed))
    }
}

impl DeclarativeConfig {
    fn push_document(&mut self, document: Value) -> Result<()> {
        let schema = document
            .get("schema")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("catalog document has no 'schema' field"))?
            .to_string();
        match schema.as_str() {
            SCHEMA_PACKAGE => self.packages.push(
                serde_json::from_value(document)
                    .with_context(|| format!("failed parsing '{schema}' document"))?,
            ),
            SCHEMA_CHANNEL => self.channels.push(
                serde_json::from_value(document)
                    .with_context(|| format!("failed parsing '{schema}' document"))?,
            ),
            SCHEMA_BUNDLE => self.bundles.push(
                serde_json::from_value(document)
                    .with_context(|| format!("failed parsing '{schema}' document"))?,
            ),
            _ => self.ignored += 1,
        }
        Ok(())
    }
}

/// Reads every `*.json`, `*.yaml` and `*.yml` document below `root`.
pub fn read_declarative_config(root: &Path) -> Result<DeclarativeConfig> {
    let mut config = DeclarativeConfig::default();
    for (path, format) in collect_catalog_files(root)? {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed reading catalog file: {}", path.display()))?;
        let documents = match format {
            CatalogFileFormat::Json => parse_json_documents(&content),
            CatalogFileFormat::Yaml => parse_yaml_documents(&content),
        }
        .with_context(|| format!("failed parsing catalog file: {}", path.display()))?;

        for document in documents {
            config
                .push_document(document)
                .with_context(|| format!("invalid catalog document in {}", path.display()))?;
        }
    }
    Ok(config)
}

fn parse_json_documents(content: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for document in serde_json::Deserializer::from_str(content).into_iter::<Value>() {
        documents.push(document?);
    }
    Ok(documents)
}

fn parse_yaml_documents(content: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}
