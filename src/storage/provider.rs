use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use super::error::StorageResult;
use crate::table::TableIdentifier;

/// Current snapshot of a table as returned by `DESCRIBE DETAIL`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDetail {
    /// Number of live data files
    pub num_files: i64,

    /// Total size of live data files in bytes
    pub size_in_bytes: i64,

    /// Fully qualified `catalog.schema.table` name
    #[serde(rename = "name")]
    pub qualified_name: String,
}

/// One commit in a table's history as returned by `DESCRIBE HISTORY`
///
/// Metrics and parameters are kept as raw strings, the way the storage engine
/// reports them; `reader::history` turns them into typed maintenance events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Table version created by the commit (if reported)
    #[serde(default)]
    pub version: Option<i64>,

    /// Operation name, e.g. `WRITE`, `OPTIMIZE`, `VACUUM END`
    pub operation: String,

    /// Commit time
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub operation_metrics: HashMap<String, String>,

    #[serde(default)]
    pub operation_parameters: HashMap<String, String>,
}

impl HistoryEntry {
    pub fn new(operation: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            version: None,
            operation: operation.into(),
            timestamp,
            operation_metrics: HashMap::new(),
            operation_parameters: HashMap::new(),
        }
    }

    pub fn with_metric(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.operation_metrics.insert(key.into(), value.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.operation_parameters.insert(key.into(), value.into());
        self
    }
}

/// Introspection interface of the storage engine
///
/// Implementations wrap whatever remote call answers `DESCRIBE DETAIL` and
/// `DESCRIBE HISTORY` for a table. Either call may fail for a single table;
/// the scanner turns such failures into error rows.
#[async_trait]
pub trait TableCatalog: Send + Sync {
    /// Current file count, size and qualified name of the table
    ///
    /// # Arguments
    /// * `table` - The table to describe
    async fn describe_detail(&self, table: &TableIdentifier) -> StorageResult<TableDetail>;

    /// Full commit history of the table
    ///
    /// Implementations may pre-filter to maintenance operations; the scanner
    /// filters again regardless.
    ///
    /// # Arguments
    /// * `table` - The table whose history is requested
    async fn describe_history(&self, table: &TableIdentifier) -> StorageResult<Vec<HistoryEntry>>;

    /// Short label used in log lines
    fn name(&self) -> &str {
        "catalog"
    }
}

impl Debug for dyn TableCatalog {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "TableCatalog(name={})", self.name())
    }
}
