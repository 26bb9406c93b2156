//! Catalog module
//!
//! Channels, VOD items and customers, each persisted to its own flat file:
//! - Canonical record types
//! - JSON, CSV and JSON-lines encodings
//! - Locked read-modify-write store with atomic replacement

pub mod format;
pub mod store;
pub mod types;

pub use format::StorageFormat;
pub use store::{CatalogResult, CatalogStore};
pub use types::{Channel, Customer, Record, VodItem};

use crate::config::StorageConfig;

/// All collections of one deployment
pub struct Catalog {
    pub channels: CatalogStore<Channel>,
    pub vod: CatalogStore<VodItem>,
    pub customers: CatalogStore<Customer>,
}

impl Catalog {
    pub fn open(config: &StorageConfig) -> Self {
        Self {
            channels: store_for(config),
            vod: store_for(config),
            customers: store_for(config),
        }
    }
}

fn store_for<R: Record>(config: &StorageConfig) -> CatalogStore<R> {
    CatalogStore::new(config.collection_path(R::COLLECTION), config.format)
}
