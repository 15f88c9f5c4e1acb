use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::reader::{MaintenanceEvent, MaintenanceOperation};
use crate::storage::TableDetail;
use crate::table::TableIdentifier;

/// Per-table housekeeping facts, one row per scanned table.
///
/// A failed scan produces a row where only the identity and `error` are set.
/// History fields are `None` when the corresponding event never happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    #[serde(flatten)]
    pub table: TableIdentifier,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_files: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_optimize_timestamp: Option<DateTime<Utc>>,
    #[serde(
        default,
        rename = "2nd_optimize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub second_optimize_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_file_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p50_file_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clustering_keys: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_vacuum_timestamp: Option<DateTime<Utc>>,
    #[serde(
        default,
        rename = "2nd_vacuum_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub second_vacuum_timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableSummary {
    /// Row with identity only; every fact is unknown.
    pub fn empty(table: TableIdentifier) -> Self {
        Self {
            table,
            qualified_name: None,
            number_of_files: None,
            bytes: None,
            max_optimize_timestamp: None,
            second_optimize_timestamp: None,
            min_file_size: None,
            p50_file_size: None,
            max_file_size: None,
            clustering_keys: None,
            max_vacuum_timestamp: None,
            second_vacuum_timestamp: None,
            error: None,
        }
    }

    /// Row recording that scanning `table` failed.
    pub fn failed(table: TableIdentifier, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(table)
        }
    }

    /// Row carrying only the current detail snapshot.
    pub fn from_detail(table: TableIdentifier, detail: &TableDetail) -> Self {
        Self {
            qualified_name: Some(detail.qualified_name.clone()),
            number_of_files: Some(detail.num_files),
            bytes: Some(detail.size_in_bytes),
            ..Self::empty(table)
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn has_clustering_keys(&self) -> bool {
        self.clustering_keys
            .as_ref()
            .is_some_and(|keys| !keys.is_empty())
    }
}

/// Events of each maintenance operation, most recent first.
///
/// Ties on timestamp keep history order, which makes the pick among equal
/// timestamps arbitrary but deterministic.
fn rank_by_operation(
    events: &[MaintenanceEvent],
) -> HashMap<&MaintenanceOperation, Vec<&MaintenanceEvent>> {
    let mut ranked: HashMap<&MaintenanceOperation, Vec<&MaintenanceEvent>> = HashMap::new();
    for event in events.iter().filter(|e| e.operation.is_maintenance()) {
        ranked.entry(&event.operation).or_default().push(event);
    }
    for partition in ranked.values_mut() {
        partition.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
    ranked
}

/// Fold a table's detail snapshot and maintenance events into one row.
///
/// Each history column is filled independently, so a table with VACUUM but no
/// OPTIMIZE history still yields a row with the OPTIMIZE columns left empty.
/// Size metrics and clustering keys come from the latest OPTIMIZE only.
pub fn summarize(
    table: TableIdentifier,
    detail: &TableDetail,
    events: &[MaintenanceEvent],
) -> TableSummary {
    let mut summary = TableSummary::from_detail(table, detail);
    let ranked = rank_by_operation(events);

    let nth = |operation: &MaintenanceOperation, n: usize| {
        ranked.get(operation).and_then(|p| p.get(n)).copied()
    };

    if let Some(latest) = nth(&MaintenanceOperation::Optimize, 0) {
        summary.max_optimize_timestamp = Some(latest.timestamp);
        summary.min_file_size = latest.min_file_size;
        summary.p50_file_size = latest.p50_file_size;
        summary.max_file_size = latest.max_file_size;
        summary.clustering_keys = latest.clustering_keys.clone();
    }
    summary.second_optimize_timestamp =
        nth(&MaintenanceOperation::Optimize, 1).map(|e| e.timestamp);
    summary.max_vacuum_timestamp = nth(&MaintenanceOperation::VacuumEnd, 0).map(|e| e.timestamp);
    summary.second_vacuum_timestamp =
        nth(&MaintenanceOperation::VacuumEnd, 1).map(|e| e.timestamp);

    summary
}
