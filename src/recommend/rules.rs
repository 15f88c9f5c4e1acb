use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::config::RecommendationConfig;
use crate::scan::TableSummary;

const SECONDS_PER_DAY: i64 = 86_400;

/// Separator between reasons of several rules firing on the same flag
pub const REASON_SEPARATOR: &str = " | ";

/// Which of the three recommendation flags a rule sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Optimize,
    Vacuum,
    Misc,
}

/// The housekeeping rules, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    NeedsCompaction,
    NeverCleaned,
    StaleCompaction,
    StaleCleanup,
    OverCompacted,
    OverCleaned,
    CompactionUnneeded,
    SmallFilesPresent,
    ClusteringIneffective,
}

impl Rule {
    pub const ALL: [Rule; 9] = [
        Rule::NeedsCompaction,
        Rule::NeverCleaned,
        Rule::StaleCompaction,
        Rule::StaleCleanup,
        Rule::OverCompacted,
        Rule::OverCleaned,
        Rule::CompactionUnneeded,
        Rule::SmallFilesPresent,
        Rule::ClusteringIneffective,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Rule::NeedsCompaction => "needs-compaction",
            Rule::NeverCleaned => "never-cleaned",
            Rule::StaleCompaction => "stale-compaction",
            Rule::StaleCleanup => "stale-cleanup",
            Rule::OverCompacted => "over-compacted",
            Rule::OverCleaned => "over-cleaned",
            Rule::CompactionUnneeded => "compaction-unneeded",
            Rule::SmallFilesPresent => "small-files-present",
            Rule::ClusteringIneffective => "clustering-ineffective",
        }
    }

    /// Reason text attached to a row when the rule fires
    pub fn legend(&self) -> &'static str {
        match self {
            Rule::NeedsCompaction => "not OPTIMIZED, would benefit",
            Rule::NeverCleaned => "never VACUUM'ed",
            Rule::StaleCompaction => "not OPTIMIZED often enough",
            Rule::StaleCleanup => "not VACUUM'ed often enough",
            Rule::OverCompacted => "OPTIMIZED too often",
            Rule::OverCleaned => "VACUUM'ed too often",
            Rule::CompactionUnneeded => "too small to be OPTIMIZED",
            Rule::SmallFilesPresent => "needs more analysis — small files",
            Rule::ClusteringIneffective => "clustering key not effective",
        }
    }

    pub fn target(&self) -> Target {
        match self {
            Rule::NeedsCompaction
            | Rule::StaleCompaction
            | Rule::OverCompacted
            | Rule::CompactionUnneeded => Target::Optimize,
            Rule::NeverCleaned | Rule::StaleCleanup | Rule::OverCleaned => Target::Vacuum,
            Rule::SmallFilesPresent | Rule::ClusteringIneffective => Target::Misc,
        }
    }

    /// Whether the row belongs to the subset this rule looks at
    pub fn considers(&self, row: &TableSummary) -> bool {
        match self {
            Rule::NeedsCompaction => row.max_optimize_timestamp.is_none() && row.bytes.is_some(),
            Rule::NeverCleaned => row.max_vacuum_timestamp.is_none(),
            Rule::StaleCompaction => row.max_optimize_timestamp.is_some(),
            Rule::StaleCleanup => row.max_vacuum_timestamp.is_some(),
            Rule::OverCompacted => {
                row.max_optimize_timestamp.is_some() && row.second_optimize_timestamp.is_some()
            }
            Rule::OverCleaned => {
                row.max_vacuum_timestamp.is_some() && row.second_vacuum_timestamp.is_some()
            }
            Rule::CompactionUnneeded => row.max_optimize_timestamp.is_some() && row.bytes.is_some(),
            Rule::SmallFilesPresent => {
                row.max_optimize_timestamp.is_some()
                    && row.p50_file_size.is_some()
                    && row.number_of_files.is_some_and(|n| n > 1)
            }
            Rule::ClusteringIneffective => {
                row.max_optimize_timestamp.is_some() && row.p50_file_size.is_some()
            }
        }
    }

    /// Whether the rule fires for a row it considers
    pub fn fires(
        &self,
        row: &TableSummary,
        config: &RecommendationConfig,
        now: DateTime<Utc>,
    ) -> bool {
        match self {
            Rule::NeedsCompaction => row
                .bytes
                .is_some_and(|b| b > config.min_table_size_optimize),
            Rule::NeverCleaned => true,
            Rule::StaleCompaction => row
                .max_optimize_timestamp
                .is_some_and(|t| age_days(t, now) > config.min_days_not_optimized),
            Rule::StaleCleanup => row
                .max_vacuum_timestamp
                .is_some_and(|t| age_days(t, now) > config.min_days_not_vacuumed),
            Rule::OverCompacted => match (row.max_optimize_timestamp, row.second_optimize_timestamp)
            {
                (Some(latest), Some(second)) => {
                    days_between(latest, second) < config.max_optimize_freq
                }
                _ => false,
            },
            Rule::OverCleaned => match (row.max_vacuum_timestamp, row.second_vacuum_timestamp) {
                (Some(latest), Some(second)) => days_between(latest, second) < config.max_vacuum_freq,
                _ => false,
            },
            Rule::CompactionUnneeded => row
                .bytes
                .is_some_and(|b| b < config.min_table_size_optimize),
            Rule::SmallFilesPresent => row
                .p50_file_size
                .is_some_and(|p50| p50 < config.small_file_threshold),
            Rule::ClusteringIneffective => {
                row.has_clustering_keys()
                    && row
                        .number_of_files
                        .is_some_and(|n| n < config.min_number_of_files_for_zorder)
            }
        }
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name())
    }
}

/// Whole days from `earlier` to `later`, rounded towards negative infinity
pub fn days_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> i64 {
    (later - earlier).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Whole days elapsed since `timestamp`
pub fn age_days(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    days_between(now, timestamp)
}

/// Joins two reasons, treating an empty reason as absent
pub fn join_reasons(left: &str, right: &str) -> String {
    match (left.is_empty(), right.is_empty()) {
        (true, _) => right.to_string(),
        (_, true) => left.to_string(),
        _ => format!("{}{}{}", left, REASON_SEPARATOR, right),
    }
}

/// Flag and accumulated reason for one recommendation column pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub flag: bool,
    pub reason: String,
}

impl Verdict {
    pub fn fired(reason: impl Into<String>) -> Self {
        Self {
            flag: true,
            reason: reason.into(),
        }
    }

    /// OR the flags, append the reason
    pub fn merge(&mut self, other: &Verdict) {
        self.flag = self.flag || other.flag;
        self.reason = join_reasons(&self.reason, &other.reason);
    }

    /// Reasons in firing order
    pub fn reasons(&self) -> Vec<&str> {
        self.reason
            .split(REASON_SEPARATOR)
            .filter(|r| !r.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableIdentifier;
    use chrono::{Duration, TimeZone};

    const MIB: i64 = 1024 * 1024;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn row() -> TableSummary {
        let mut summary = TableSummary::empty(TableIdentifier::new("main", "db", "t"));
        summary.number_of_files = Some(100);
        summary.bytes = Some(200 * MIB);
        summary
    }

    #[test]
    fn test_rules_are_in_evaluation_order_with_targets() {
        let targets: Vec<Target> = Rule::ALL.iter().map(|r| r.target()).collect();
        assert_eq!(
            targets,
            vec![
                Target::Optimize,
                Target::Vacuum,
                Target::Optimize,
                Target::Vacuum,
                Target::Optimize,
                Target::Vacuum,
                Target::Optimize,
                Target::Misc,
                Target::Misc,
            ]
        );
    }

    #[test]
    fn test_age_days_floors() {
        let n = now();
        assert_eq!(age_days(n - Duration::hours(47), n), 1);
        assert_eq!(age_days(n - Duration::days(2), n), 2);
        assert_eq!(age_days(n, n), 0);
        assert_eq!(age_days(n + Duration::hours(1), n), -1);
    }

    #[test]
    fn test_join_reasons_skips_empty() {
        assert_eq!(join_reasons("", ""), "");
        assert_eq!(join_reasons("a", ""), "a");
        assert_eq!(join_reasons("", "b"), "b");
        assert_eq!(join_reasons("a", "b"), "a | b");
    }

    #[test]
    fn test_verdict_merge_is_monotone() {
        let mut verdict = Verdict::fired("first");
        verdict.merge(&Verdict::default());
        assert!(verdict.flag);
        assert_eq!(verdict.reason, "first");
        verdict.merge(&Verdict::fired("second"));
        assert_eq!(verdict.reasons(), vec!["first", "second"]);
    }

    #[test]
    fn test_needs_compaction() {
        let config = RecommendationConfig::default();
        let big = row();
        assert!(Rule::NeedsCompaction.considers(&big));
        assert!(Rule::NeedsCompaction.fires(&big, &config, now()));

        let mut small = row();
        small.bytes = Some(10 * MIB);
        assert!(!Rule::NeedsCompaction.fires(&small, &config, now()));

        let mut optimized = row();
        optimized.max_optimize_timestamp = Some(now());
        assert!(!Rule::NeedsCompaction.considers(&optimized));
    }

    #[test]
    fn test_stale_compaction_and_cleanup() {
        let config = RecommendationConfig::default();
        let mut r = row();
        r.max_optimize_timestamp = Some(now() - Duration::days(8));
        r.max_vacuum_timestamp = Some(now() - Duration::days(31));
        assert!(Rule::StaleCompaction.fires(&r, &config, now()));
        assert!(!Rule::StaleCleanup.fires(&r, &config, now()));

        r.max_vacuum_timestamp = Some(now() - Duration::days(32));
        assert!(Rule::StaleCleanup.fires(&r, &config, now()));
    }

    #[test]
    fn test_over_compacted() {
        let config = RecommendationConfig::default();
        let mut r = row();
        r.max_optimize_timestamp = Some(now() - Duration::days(2));
        assert!(!Rule::OverCompacted.considers(&r));

        r.second_optimize_timestamp = Some(now() - Duration::days(3));
        assert!(Rule::OverCompacted.considers(&r));
        assert!(Rule::OverCompacted.fires(&r, &config, now()));

        r.second_optimize_timestamp = Some(now() - Duration::days(4));
        assert!(!Rule::OverCompacted.fires(&r, &config, now()));
    }

    #[test]
    fn test_over_cleaned() {
        let config = RecommendationConfig::default().with_max_vacuum_freq(7);
        let mut r = row();
        r.max_vacuum_timestamp = Some(now() - Duration::days(1));
        r.second_vacuum_timestamp = Some(now() - Duration::days(6));
        assert!(Rule::OverCleaned.fires(&r, &config, now()));
    }

    #[test]
    fn test_compaction_unneeded() {
        let config = RecommendationConfig::default();
        let mut r = row();
        r.max_optimize_timestamp = Some(now());
        r.bytes = Some(MIB);
        assert!(Rule::CompactionUnneeded.considers(&r));
        assert!(Rule::CompactionUnneeded.fires(&r, &config, now()));
        r.bytes = Some(config.min_table_size_optimize);
        assert!(!Rule::CompactionUnneeded.fires(&r, &config, now()));
    }

    #[test]
    fn test_small_files_requires_more_than_one_file() {
        let config = RecommendationConfig::default();
        let mut r = row();
        r.max_optimize_timestamp = Some(now());
        r.p50_file_size = Some(MIB);
        assert!(Rule::SmallFilesPresent.considers(&r));
        assert!(Rule::SmallFilesPresent.fires(&r, &config, now()));

        r.number_of_files = Some(1);
        assert!(!Rule::SmallFilesPresent.considers(&r));
    }

    #[test]
    fn test_clustering_ineffective() {
        let config = RecommendationConfig::default();
        let mut r = row();
        r.max_optimize_timestamp = Some(now());
        r.p50_file_size = Some(64 * MIB);
        r.number_of_files = Some(3);
        assert!(Rule::ClusteringIneffective.considers(&r));
        assert!(!Rule::ClusteringIneffective.fires(&r, &config, now()));

        r.clustering_keys = Some(vec!["id".to_string()]);
        assert!(Rule::ClusteringIneffective.fires(&r, &config, now()));

        r.number_of_files = Some(50);
        assert!(!Rule::ClusteringIneffective.fires(&r, &config, now()));
    }

    #[test]
    fn test_legends_are_distinct() {
        let mut legends: Vec<_> = Rule::ALL.iter().map(|r| r.legend()).collect();
        legends.sort();
        legends.dedup();
        assert_eq!(legends.len(), Rule::ALL.len());
    }
}
