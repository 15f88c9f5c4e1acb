use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Location and options of the housekeeping persistence sink
///
/// `url` is anything `object_store::parse_url_opts` understands
/// (`memory:///`, `file:///tmp/hk`, `s3://bucket/prefix`, ...). Options are
/// forwarded to the object store builder untouched, so credentials use the
/// provider's own keys (`aws_access_key_id`, `azure_storage_account_name`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    pub url: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl SinkConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            options: HashMap::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new("memory:///")
    }

    pub fn local(path: impl AsRef<str>) -> Self {
        Self::new(format!("file://{}", path.as_ref()))
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}
