use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::config::{ConfigError, RecommendationConfig};
use super::rules::{Rule, Target, Verdict};
use crate::scan::TableSummary;
use crate::table::TableIdentifier;

/// Source of "now" for age-based rules
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A summary row extended with the three recommendation flag/reason pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    #[serde(flatten)]
    pub summary: TableSummary,
    pub rec_optimize: Verdict,
    pub rec_vacuum: Verdict,
    pub rec_misc: Verdict,
    /// Rules that fired for this row, in evaluation order
    pub fired: Vec<Rule>,
}

impl RecommendationSet {
    pub fn new(summary: TableSummary) -> Self {
        Self {
            summary,
            rec_optimize: Verdict::default(),
            rec_vacuum: Verdict::default(),
            rec_misc: Verdict::default(),
            fired: Vec::new(),
        }
    }

    pub fn table(&self) -> &TableIdentifier {
        &self.summary.table
    }

    pub fn verdict(&self, target: Target) -> &Verdict {
        match target {
            Target::Optimize => &self.rec_optimize,
            Target::Vacuum => &self.rec_vacuum,
            Target::Misc => &self.rec_misc,
        }
    }

    fn verdict_mut(&mut self, target: Target) -> &mut Verdict {
        match target {
            Target::Optimize => &mut self.rec_optimize,
            Target::Vacuum => &mut self.rec_vacuum,
            Target::Misc => &mut self.rec_misc,
        }
    }

    pub fn has_fired(&self, rule: Rule) -> bool {
        self.fired.contains(&rule)
    }

    /// Flat row for the sink: summary columns plus
    /// `rec_optimize`, `rec_optimize_reason`, ... columns.
    pub fn to_row(&self) -> Result<Value, serde_json::Error> {
        let mut row = match serde_json::to_value(&self.summary)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (column, verdict) in [
            ("rec_optimize", &self.rec_optimize),
            ("rec_vacuum", &self.rec_vacuum),
            ("rec_misc", &self.rec_misc),
        ] {
            row.insert(column.to_string(), Value::Bool(verdict.flag));
            row.insert(
                format!("{}_reason", column),
                Value::String(verdict.reason.clone()),
            );
        }
        Ok(Value::Object(row))
    }
}

/// Apply one rule to the accumulated table, producing the next version.
///
/// The rule's verdicts are computed on the subset of rows it considers, then
/// merged back on the table identity: flags are OR-ed, reasons appended.
/// Rows outside the subset pass through untouched. Error rows are evaluated
/// like any other row; their null columns only satisfy rule conditions that
/// test for absence.
pub fn apply_rule(
    table: Vec<RecommendationSet>,
    rule: Rule,
    config: &RecommendationConfig,
    now: DateTime<Utc>,
) -> Vec<RecommendationSet> {
    let fresh: HashMap<TableIdentifier, Verdict> = table
        .iter()
        .filter(|row| rule.considers(&row.summary))
        .filter(|row| rule.fires(&row.summary, config, now))
        .map(|row| (row.table().clone(), Verdict::fired(rule.legend())))
        .collect();

    debug!("Applied rule={}, fired={}", rule, fresh.len());

    table
        .into_iter()
        .map(|mut row| {
            if let Some(verdict) = fresh.get(row.table()) {
                row.verdict_mut(rule.target()).merge(verdict);
                row.fired.push(rule);
            }
            row
        })
        .collect()
}

/// Rule-based housekeeping recommendations over scanned summaries.
///
/// Thresholds are validated once at construction. The clock is read once per
/// rule application, so rules of one run may see slightly different "now".
pub struct RecommendationEngine {
    config: RecommendationConfig,
    rules: Vec<Rule>,
    clock: Clock,
}

impl RecommendationEngine {
    pub fn new(config: RecommendationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            rules: Rule::ALL.to_vec(),
            clock: Arc::new(Utc::now),
        })
    }

    /// Replace the wall clock, e.g. to pin "now" in tests
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Fold every rule, in order, over the summaries
    pub fn evaluate(&self, summaries: &[TableSummary]) -> Vec<RecommendationSet> {
        let start = Instant::now();
        let initial: Vec<RecommendationSet> = summaries
            .iter()
            .cloned()
            .map(RecommendationSet::new)
            .collect();

        let result = self.rules.iter().fold(initial, |table, rule| {
            apply_rule(table, *rule, &self.config, (self.clock)())
        });

        info!(
            "Evaluated count={} tables, optimize={}, vacuum={}, misc={}, took={}",
            result.len(),
            result.iter().filter(|r| r.rec_optimize.flag).count(),
            result.iter().filter(|r| r.rec_vacuum.flag).count(),
            result.iter().filter(|r| r.rec_misc.flag).count(),
            start.elapsed().as_millis()
        );
        result
    }
}

/// Validate `config` and evaluate `summaries` with the wall clock
pub fn evaluate(
    summaries: &[TableSummary],
    config: &RecommendationConfig,
) -> Result<Vec<RecommendationSet>, ConfigError> {
    Ok(RecommendationEngine::new(config.clone())?.evaluate(summaries))
}
