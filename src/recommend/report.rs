use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::config::{ConfigError, RecommendationConfig};
use super::engine::{RecommendationEngine, RecommendationSet};
use super::rules::Rule;
use crate::scan::TableSummary;
use crate::storage::{HousekeepingSink, StorageResult};

/// Default sink table for recommendation output
pub const DEFAULT_RECOMMENDATION_TABLE: &str = "housekeeping_recommendations";

/// Recommendations computed for one batch of scanned tables.
///
/// The rule fold runs once in [`HousekeepingActions::new`]; every accessor
/// reads that result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousekeepingActions {
    pub config: RecommendationConfig,
    pub generated_at: DateTime<Utc>,
    pub recommendations: Vec<RecommendationSet>,
}

impl HousekeepingActions {
    pub fn new(
        summaries: &[TableSummary],
        config: RecommendationConfig,
    ) -> Result<Self, ConfigError> {
        let engine = RecommendationEngine::new(config)?;
        Ok(Self::from_engine(&engine, summaries))
    }

    pub fn from_engine(engine: &RecommendationEngine, summaries: &[TableSummary]) -> Self {
        Self {
            config: engine.config().clone(),
            generated_at: Utc::now(),
            recommendations: engine.evaluate(summaries),
        }
    }

    /// Every row with its statistics and all three flag/reason pairs
    pub fn stats(&self) -> &[RecommendationSet] {
        &self.recommendations
    }

    pub fn generate_recommendations(&self) -> Vec<RecommendationSet> {
        self.recommendations.clone()
    }

    /// Rows grouped by the rule that fired; a row appears once per rule
    pub fn explain(&self) -> Explanation<'_> {
        let sections = Rule::ALL
            .iter()
            .map(|rule| ExplanationSection {
                rule: *rule,
                rows: self
                    .recommendations
                    .iter()
                    .filter(|r| r.has_fired(*rule))
                    .collect(),
            })
            .collect();
        Explanation { sections }
    }

    pub fn to_json(&self) -> Result<String, JsonError> {
        serde_json::to_string_pretty(self)
    }

    /// Append the flat recommendation rows to `table_name`
    pub async fn save(
        &self,
        sink: &dyn HousekeepingSink,
        table_name: &str,
    ) -> StorageResult<usize> {
        let rows = self
            .recommendations
            .iter()
            .map(RecommendationSet::to_row)
            .collect::<Result<Vec<_>, _>>()?;
        sink.append(table_name, &rows).await
    }
}

#[derive(Debug, Clone)]
pub struct ExplanationSection<'a> {
    pub rule: Rule,
    pub rows: Vec<&'a RecommendationSet>,
}

/// Human-readable breakdown of which tables tripped which rule
#[derive(Debug, Clone)]
pub struct Explanation<'a> {
    pub sections: Vec<ExplanationSection<'a>>,
}

impl<'a> Explanation<'a> {
    pub fn section(&self, rule: Rule) -> Option<&ExplanationSection<'a>> {
        self.sections.iter().find(|s| s.rule == rule)
    }
}

fn format_bytes(bytes: Option<i64>) -> String {
    match bytes {
        None => "-".to_string(),
        Some(b) => {
            let mb = b as f64 / (1024.0 * 1024.0);
            if mb >= 1024.0 {
                format!("{:.2} GB", mb / 1024.0)
            } else {
                format!("{:.2} MB", mb)
            }
        }
    }
}

fn format_date(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

impl Display for Explanation<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "\n{}", "=".repeat(96))?;
        writeln!(f, "Housekeeping Recommendations")?;
        writeln!(f, "{}", "=".repeat(96))?;

        for section in &self.sections {
            writeln!(
                f,
                "\n{} [{}] ({} tables)",
                section.rule.legend(),
                section.rule,
                section.rows.len()
            )?;
            writeln!(f, "{}", "─".repeat(96))?;
            if section.rows.is_empty() {
                writeln!(f, "  (none)")?;
                continue;
            }
            writeln!(
                f,
                "  {:<40} {:>12} {:>8} {:>12} {:>12} {:>12}",
                "table", "size", "files", "p50 file", "optimized", "vacuumed"
            )?;
            for row in &section.rows {
                let s = &row.summary;
                writeln!(
                    f,
                    "  {:<40} {:>12} {:>8} {:>12} {:>12} {:>12}",
                    s.table.to_string(),
                    format_bytes(s.bytes),
                    s.number_of_files
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    format_bytes(s.p50_file_size),
                    format_date(s.max_optimize_timestamp),
                    format_date(s.max_vacuum_timestamp),
                )?;
            }
        }

        writeln!(f, "\n{}\n", "=".repeat(96))
    }
}
