use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::error::ScanError;
use super::summary::{TableSummary, summarize};
use crate::reader::maintenance_events;
use crate::storage::{HousekeepingSink, StorageError, StorageResult, TableCatalog};
use crate::table::TableIdentifier;

/// Default sink table for scan output
pub const DEFAULT_SUMMARY_TABLE: &str = "housekeeping_summary";

/// Builder for constructing a `Scanner` instance.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use delta_housekeeping::scan::Scanner;
/// use delta_housekeeping::storage::{InMemoryCatalog, SinkFactory};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let catalog = Arc::new(InMemoryCatalog::new());
///
/// // Simple case with defaults
/// let scanner = Scanner::builder(catalog.clone()).build();
///
/// // Scan 8 tables at a time and persist the output
/// let scanner = Scanner::builder(catalog)
///     .with_parallelism(8)
///     .with_sink(SinkFactory::from_url("memory:///")?)
///     .with_table_name("housekeeping_summary_v2")
///     .build();
/// # Ok(())
/// # }
/// ```
pub struct ScannerBuilder {
    catalog: Arc<dyn TableCatalog>,
    parallelism: Option<usize>,
    sink: Option<Arc<dyn HousekeepingSink>>,
    table_name: Option<String>,
}

impl ScannerBuilder {
    pub fn new(catalog: Arc<dyn TableCatalog>) -> Self {
        Self {
            catalog,
            parallelism: None,
            sink: None,
            table_name: None,
        }
    }

    /// Sets how many tables are scanned concurrently.
    ///
    /// Values below 1 are treated as 1.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    /// Sets the sink `scan_and_save` appends to.
    pub fn with_sink(mut self, sink: Arc<dyn HousekeepingSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the sink table name, `housekeeping_summary` by default.
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn build(self) -> Scanner {
        Scanner {
            catalog: self.catalog,
            parallelism: self.parallelism.unwrap_or(1).max(1),
            sink: self.sink,
            table_name: self
                .table_name
                .unwrap_or_else(|| DEFAULT_SUMMARY_TABLE.to_string()),
        }
    }
}

/// Turns `DESCRIBE DETAIL` + `DESCRIBE HISTORY` of many tables into summary rows.
///
/// Every input table yields exactly one row: a summary, or an error row when
/// anything about that table failed. One table's failure never affects another.
pub struct Scanner {
    catalog: Arc<dyn TableCatalog>,
    parallelism: usize,
    sink: Option<Arc<dyn HousekeepingSink>>,
    table_name: String,
}

impl Scanner {
    pub fn builder(catalog: Arc<dyn TableCatalog>) -> ScannerBuilder {
        ScannerBuilder::new(catalog)
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    // Detail, history and the fold share one failure boundary: a history
    // failure discards the detail that was already fetched.
    async fn try_scan(&self, table: &TableIdentifier) -> Result<TableSummary, ScanError> {
        let detail = self
            .catalog
            .describe_detail(table)
            .await
            .map_err(ScanError::Detail)?;
        debug!(
            "Described table={}, files={}, bytes={}",
            table, detail.num_files, detail.size_in_bytes
        );

        let history = self
            .catalog
            .describe_history(table)
            .await
            .map_err(ScanError::History)?;
        let events = maintenance_events(table, &history)?;
        debug!(
            "Read history of table={}, entries={}, maintenance events={}",
            table,
            history.len(),
            events.len()
        );

        Ok(summarize(table.clone(), &detail, &events))
    }

    /// Scan a single table.
    ///
    /// Never fails: errors become a row with only identity and `error` set.
    pub async fn scan(&self, table: &TableIdentifier) -> TableSummary {
        let start = Instant::now();
        match self.try_scan(table).await {
            Ok(summary) => {
                info!(
                    "Scanned table={}, took={}",
                    table,
                    start.elapsed().as_millis()
                );
                summary
            }
            Err(e) => {
                warn!(
                    "Failed to scan table={}: {}. Recording error row.",
                    table, e
                );
                TableSummary::failed(table.clone(), e.to_string())
            }
        }
    }

    /// Scan many tables, `parallelism` at a time.
    ///
    /// Row order is unspecified. Repeated identifiers are scanned once.
    pub async fn scan_all<I>(&self, tables: I) -> Vec<TableSummary>
    where
        I: IntoIterator<Item = TableIdentifier>,
    {
        let mut seen = HashSet::new();
        let unique: Vec<TableIdentifier> = tables
            .into_iter()
            .filter(|t| {
                let first = seen.insert(t.clone());
                if !first {
                    warn!("Skipping duplicate table={}", t);
                }
                first
            })
            .collect();

        let start = Instant::now();
        let count = unique.len();
        let summaries: Vec<TableSummary> = stream::iter(unique)
            .map(|table| async move { self.scan(&table).await })
            .buffer_unordered(self.parallelism)
            .collect()
            .await;

        let errors = summaries.iter().filter(|s| s.is_error()).count();
        info!(
            "Scanned count={} tables, errors={}, parallelism={}, took={}",
            count,
            errors,
            self.parallelism,
            start.elapsed().as_millis()
        );
        summaries
    }

    /// Scan many tables and append the rows to the configured sink.
    pub async fn scan_and_save<I>(&self, tables: I) -> StorageResult<Vec<TableSummary>>
    where
        I: IntoIterator<Item = TableIdentifier>,
    {
        let sink = self.sink.as_ref().ok_or_else(|| {
            StorageError::ConfigError("scan_and_save requires a sink".to_string())
        })?;

        let summaries = self.scan_all(tables).await;
        let rows = summaries
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        sink.append(&self.table_name, &rows).await?;
        Ok(summaries)
    }
}
