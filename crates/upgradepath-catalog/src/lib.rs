mod catalog_store;
mod convert;
mod declcfg;
mod fs_ops;

pub use catalog_store::{load_catalog_dir, CatalogStore};
pub use convert::convert_to_catalog;
pub use declcfg::{
    read_declarative_config, ChannelEntry, CsvMetadataProperty, DeclarativeBundle,
    DeclarativeChannel, DeclarativeConfig, DeclarativePackage, PackageProperty, Property,
    PROPERTY_CSV_METADATA, PROPERTY_PACKAGE, SCHEMA_BUNDLE, SCHEMA_CHANNEL, SCHEMA_PACKAGE,
};
