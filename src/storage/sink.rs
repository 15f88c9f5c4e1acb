use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use serde_json::Value;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use super::error::{StorageError, StorageResult};

/// Append-only tabular store for scan and recommendation output
///
/// There is no primary key and no update path: every call appends rows.
/// Rows are self-describing JSON objects, so a row carrying columns the
/// table has never seen before is accepted as-is.
#[async_trait]
pub trait HousekeepingSink: Send + Sync {
    /// Append rows to `table_name`, returning how many were written
    async fn append(&self, table_name: &str, rows: &[Value]) -> StorageResult<usize>;

    /// Read every row ever appended to `table_name`, oldest append first
    async fn read_all(&self, table_name: &str) -> StorageResult<Vec<Value>>;

    /// Human-readable location of the sink
    fn location(&self) -> String;
}

impl Debug for dyn HousekeepingSink {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "HousekeepingSink(location={})", self.location())
    }
}

/// Sink writing one newline-delimited JSON object per append
///
/// Layout: `<prefix>/<table_name>/part-<millis>-<seq>-<uuid>.json`. `seq`
/// counts appends made through this sink, so sequential appends list in
/// append order even within one millisecond. Across sinks only the
/// millisecond orders objects.
pub struct ObjectStoreSink {
    store: Arc<dyn ObjectStore>,
    prefix: ObjectPath,
    sequence: AtomicU64,
}

impl ObjectStoreSink {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: ObjectPath) -> Self {
        Self {
            store,
            prefix,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), ObjectPath::from(""))
    }

    fn table_path(&self, table_name: &str) -> StorageResult<ObjectPath> {
        if table_name.is_empty() || table_name.contains('/') {
            return Err(StorageError::ConfigError(format!(
                "Invalid sink table name '{}'",
                table_name
            )));
        }
        Ok(self.prefix.child(table_name))
    }

    fn encode(rows: &[Value]) -> StorageResult<Vec<u8>> {
        let mut buf = Vec::new();
        for row in rows {
            if !row.is_object() {
                return Err(StorageError::ConfigError(format!(
                    "Sink rows must be JSON objects, got {}",
                    row
                )));
            }
            serde_json::to_writer(&mut buf, row)?;
            buf.push(b'\n');
        }
        Ok(buf)
    }
}

#[async_trait]
impl HousekeepingSink for ObjectStoreSink {
    async fn append(&self, table_name: &str, rows: &[Value]) -> StorageResult<usize> {
        let table_path = self.table_path(table_name)?;
        if rows.is_empty() {
            debug!("Nothing to append, table={}", table_name);
            return Ok(0);
        }

        let body = Self::encode(rows)?;
        let part = table_path.child(format!(
            "part-{:020}-{:020}-{}.json",
            chrono::Utc::now().timestamp_millis(),
            self.sequence.fetch_add(1, Ordering::SeqCst),
            uuid::Uuid::new_v4()
        ));
        self.store.put(&part, PutPayload::from(body)).await?;

        info!(
            "Appended count={} rows to table={}, object={}",
            rows.len(),
            table_name,
            part
        );
        Ok(rows.len())
    }

    async fn read_all(&self, table_name: &str) -> StorageResult<Vec<Value>> {
        let table_path = self.table_path(table_name)?;
        let mut objects: Vec<_> = self
            .store
            .list(Some(&table_path))
            .try_collect::<Vec<_>>()
            .await?;
        objects.sort_by(|a, b| a.location.as_ref().cmp(b.location.as_ref()));

        let mut rows = Vec::new();
        for object in objects {
            let bytes = self.store.get(&object.location).await?.bytes().await?;
            let content = String::from_utf8_lossy(&bytes);
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                rows.push(serde_json::from_str(line)?);
            }
        }
        Ok(rows)
    }

    fn location(&self) -> String {
        format!("{}/{}", self.store, self.prefix)
    }
}
