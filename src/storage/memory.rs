use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::error::{StorageError, StorageResult};
use super::provider::{HistoryEntry, TableCatalog, TableDetail};
use crate::table::TableIdentifier;

#[derive(Debug, Clone)]
struct RegisteredTable {
    detail: TableDetail,
    history: Vec<HistoryEntry>,
}

/// `TableCatalog` answering from registered snapshots
///
/// Useful for tests and for replaying exported `DESCRIBE` output. Unknown
/// tables fail with `TableNotFound`.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    tables: RwLock<HashMap<TableIdentifier, RegisteredTable>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a table with its detail and history
    pub fn register(&self, table: TableIdentifier, detail: TableDetail, history: Vec<HistoryEntry>) {
        let mut tables = match self.tables.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tables.insert(table, RegisteredTable { detail, history });
    }

    pub fn with_table(
        self,
        table: TableIdentifier,
        detail: TableDetail,
        history: Vec<HistoryEntry>,
    ) -> Self {
        self.register(table, detail, history);
        self
    }

    fn lookup(&self, table: &TableIdentifier) -> StorageResult<RegisteredTable> {
        let tables = self
            .tables
            .read()
            .map_err(|e| StorageError::Collaborator(e.to_string()))?;
        tables
            .get(table)
            .cloned()
            .ok_or_else(|| StorageError::TableNotFound(format!("Table or view not found: {table}")))
    }
}

#[async_trait]
impl TableCatalog for InMemoryCatalog {
    async fn describe_detail(&self, table: &TableIdentifier) -> StorageResult<TableDetail> {
        Ok(self.lookup(table)?.detail)
    }

    async fn describe_history(&self, table: &TableIdentifier) -> StorageResult<Vec<HistoryEntry>> {
        Ok(self.lookup(table)?.history)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
