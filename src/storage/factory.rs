use std::sync::Arc;
use url::Url;

use super::config::SinkConfig;
use super::error::StorageResult;
use super::sink::{HousekeepingSink, ObjectStoreSink};

/// Factory for creating housekeeping sinks
pub struct SinkFactory;

impl SinkFactory {
    /// Create a sink from a configuration
    ///
    /// Works with any object_store backend (AWS S3, Azure, GCS, local
    /// filesystem or memory); the URL path becomes the sink prefix.
    pub fn from_config(config: SinkConfig) -> StorageResult<Arc<dyn HousekeepingSink>> {
        let url = Url::parse(&config.url)?;
        let (store, prefix) = object_store::parse_url_opts(&url, config.options)?;
        Ok(Arc::new(ObjectStoreSink::new(Arc::from(store), prefix)))
    }

    pub fn from_url(url: &str) -> StorageResult<Arc<dyn HousekeepingSink>> {
        Self::from_config(SinkConfig::new(url))
    }
}
