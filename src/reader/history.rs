use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use thiserror::Error;

use crate::storage::HistoryEntry;
use crate::table::TableIdentifier;

/// Operation names as they appear in the storage engine's history log
pub const OPTIMIZE: &str = "OPTIMIZE";
pub const VACUUM_END: &str = "VACUUM END";

const MIN_FILE_SIZE: &str = "minFileSize";
const P50_FILE_SIZE: &str = "p50FileSize";
const MAX_FILE_SIZE: &str = "maxFileSize";
const Z_ORDER_BY: &str = "zOrderBy";
const CLUSTER_BY: &str = "clusterBy";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaintenanceOperation {
    Optimize,
    VacuumEnd,
    Other(String),
}

impl MaintenanceOperation {
    pub fn parse(operation: &str) -> Self {
        match operation.trim() {
            OPTIMIZE => Self::Optimize,
            VACUUM_END | "VACUUM_END" => Self::VacuumEnd,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether the operation contributes to a housekeeping summary
    pub fn is_maintenance(&self) -> bool {
        matches!(self, Self::Optimize | Self::VacuumEnd)
    }
}

impl Display for MaintenanceOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Optimize => write!(f, "{}", OPTIMIZE),
            Self::VacuumEnd => write!(f, "{}", VACUUM_END),
            Self::Other(op) => write!(f, "{}", op),
        }
    }
}

/// One maintenance-relevant commit of a table, with typed metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceEvent {
    pub table: TableIdentifier,
    pub operation: MaintenanceOperation,
    pub timestamp: DateTime<Utc>,
    pub min_file_size: Option<i64>,
    pub p50_file_size: Option<i64>,
    pub max_file_size: Option<i64>,
    /// `None` when the operation did not report clustering columns at all
    pub clustering_keys: Option<Vec<String>>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryParseError {
    #[error("Invalid {metric} value '{value}' in {operation} at {timestamp}")]
    InvalidMetric {
        operation: String,
        timestamp: String,
        metric: &'static str,
        value: String,
    },

    #[error("Invalid clustering columns '{value}' in {operation} at {timestamp}")]
    InvalidClusteringKeys {
        operation: String,
        timestamp: String,
        value: String,
    },
}

fn parse_metric(
    entry: &HistoryEntry,
    metric: &'static str,
) -> Result<Option<i64>, HistoryParseError> {
    match entry.operation_metrics.get(metric).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| HistoryParseError::InvalidMetric {
                operation: entry.operation.clone(),
                timestamp: entry.timestamp.to_rfc3339(),
                metric,
                value: value.to_string(),
            }),
    }
}

// zOrderBy / clusterBy are JSON-encoded string arrays, e.g. ["id","ts"]
fn parse_clustering_keys(entry: &HistoryEntry) -> Result<Option<Vec<String>>, HistoryParseError> {
    let raw = entry
        .operation_parameters
        .get(Z_ORDER_BY)
        .or_else(|| entry.operation_parameters.get(CLUSTER_BY));

    match raw.map(|v| v.trim()) {
        None => Ok(None),
        Some("") => Ok(Some(Vec::new())),
        Some(value) => serde_json::from_str::<Vec<String>>(value)
            .map(Some)
            .map_err(|_| HistoryParseError::InvalidClusteringKeys {
                operation: entry.operation.clone(),
                timestamp: entry.timestamp.to_rfc3339(),
                value: value.to_string(),
            }),
    }
}

/// Convert one raw history entry into a maintenance event
pub fn parse_entry(
    table: &TableIdentifier,
    entry: &HistoryEntry,
) -> Result<MaintenanceEvent, HistoryParseError> {
    Ok(MaintenanceEvent {
        table: table.clone(),
        operation: MaintenanceOperation::parse(&entry.operation),
        timestamp: entry.timestamp,
        min_file_size: parse_metric(entry, MIN_FILE_SIZE)?,
        p50_file_size: parse_metric(entry, P50_FILE_SIZE)?,
        max_file_size: parse_metric(entry, MAX_FILE_SIZE)?,
        clustering_keys: parse_clustering_keys(entry)?,
    })
}

/// Keep only OPTIMIZE / VACUUM END commits and convert them
///
/// Non-maintenance entries are skipped before their metrics are looked at, so
/// odd metrics on e.g. a WRITE never fail a scan.
pub fn maintenance_events(
    table: &TableIdentifier,
    history: &[HistoryEntry],
) -> Result<Vec<MaintenanceEvent>, HistoryParseError> {
    history
        .iter()
        .filter(|entry| MaintenanceOperation::parse(&entry.operation).is_maintenance())
        .map(|entry| parse_entry(table, entry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    fn table() -> TableIdentifier {
        TableIdentifier::new("main", "db", "events")
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(MaintenanceOperation::parse("OPTIMIZE"), MaintenanceOperation::Optimize);
        assert_eq!(MaintenanceOperation::parse("VACUUM END"), MaintenanceOperation::VacuumEnd);
        assert_eq!(MaintenanceOperation::parse("VACUUM_END"), MaintenanceOperation::VacuumEnd);
        assert_eq!(
            MaintenanceOperation::parse("VACUUM START"),
            MaintenanceOperation::Other("VACUUM START".to_string())
        );
        assert_eq!(MaintenanceOperation::VacuumEnd.to_string(), "VACUUM END");
    }

    #[test]
    fn test_parse_optimize_metrics_and_zorder() {
        let entry = HistoryEntry::new("OPTIMIZE", ts(1))
            .with_metric("minFileSize", "1024")
            .with_metric("p50FileSize", "4096")
            .with_metric("maxFileSize", "8192")
            .with_parameter("zOrderBy", r#"["id","ts"]"#);

        let event = parse_entry(&table(), &entry).unwrap();
        assert_eq!(event.operation, MaintenanceOperation::Optimize);
        assert_eq!(event.min_file_size, Some(1024));
        assert_eq!(event.p50_file_size, Some(4096));
        assert_eq!(event.max_file_size, Some(8192));
        assert_eq!(
            event.clustering_keys,
            Some(vec!["id".to_string(), "ts".to_string()])
        );
    }

    #[test]
    fn test_missing_metrics_are_null() {
        let event = parse_entry(&table(), &HistoryEntry::new("VACUUM END", ts(2))).unwrap();
        assert_eq!(event.min_file_size, None);
        assert_eq!(event.clustering_keys, None);
    }

    #[test]
    fn test_empty_zorder_is_empty_list() {
        let entry = HistoryEntry::new("OPTIMIZE", ts(1)).with_parameter("zOrderBy", "[]");
        let event = parse_entry(&table(), &entry).unwrap();
        assert_eq!(event.clustering_keys, Some(vec![]));
    }

    #[test]
    fn test_cluster_by_fallback() {
        let entry = HistoryEntry::new("OPTIMIZE", ts(1)).with_parameter("clusterBy", r#"["region"]"#);
        let event = parse_entry(&table(), &entry).unwrap();
        assert_eq!(event.clustering_keys, Some(vec!["region".to_string()]));
    }

    #[test]
    fn test_invalid_metric_is_an_error() {
        let entry = HistoryEntry::new("OPTIMIZE", ts(1)).with_metric("p50FileSize", "lots");
        let err = parse_entry(&table(), &entry).unwrap_err();
        assert!(err.to_string().contains("p50FileSize"));
    }

    #[test]
    fn test_filter_skips_other_operations() {
        let history = vec![
            HistoryEntry::new("WRITE", ts(1)).with_metric("p50FileSize", "garbage"),
            HistoryEntry::new("OPTIMIZE", ts(2)),
            HistoryEntry::new("VACUUM START", ts(3)),
            HistoryEntry::new("VACUUM END", ts(3)),
        ];
        let events = maintenance_events(&table(), &history).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].operation, MaintenanceOperation::Optimize);
        assert_eq!(events[1].operation, MaintenanceOperation::VacuumEnd);
    }
}
