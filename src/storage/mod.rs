pub mod config;
pub mod error;
pub mod factory;
pub mod memory;
pub mod provider;
pub mod sink;

pub use config::SinkConfig;
pub use error::{StorageError, StorageResult};
pub use factory::SinkFactory;
pub use memory::InMemoryCatalog;
pub use provider::{HistoryEntry, TableCatalog, TableDetail};
pub use sink::{HousekeepingSink, ObjectStoreSink};
