use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIB: i64 = 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid threshold {field}={value}: must not be negative")]
    Negative { field: &'static str, value: i64 },

    #[error("Invalid recommendation config: {0}")]
    Parse(String),
}

/// Thresholds driving the housekeeping rules.
///
/// Sizes are in bytes, frequencies and ages in whole days. Deserialization
/// fills missing fields from [`RecommendationConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Tables at least this large benefit from OPTIMIZE
    pub min_table_size_optimize: i64,
    pub min_days_not_optimized: i64,
    pub min_days_not_vacuumed: i64,
    /// Two OPTIMIZEs closer than this many days are too frequent
    pub max_optimize_freq: i64,
    /// Two VACUUMs closer than this many days are too frequent
    pub max_vacuum_freq: i64,
    /// Median file size below which files count as small
    pub small_file_threshold: i64,
    /// Fewer files than this make clustering keys pointless
    pub min_number_of_files_for_zorder: i64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            min_table_size_optimize: 128 * MIB,
            min_days_not_optimized: 7,
            min_days_not_vacuumed: 31,
            max_optimize_freq: 2,
            max_vacuum_freq: 2,
            small_file_threshold: 32 * MIB,
            min_number_of_files_for_zorder: 8,
        }
    }
}

impl RecommendationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (possibly partial) JSON document and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_min_table_size_optimize(mut self, bytes: i64) -> Self {
        self.min_table_size_optimize = bytes;
        self
    }

    pub fn with_min_days_not_optimized(mut self, days: i64) -> Self {
        self.min_days_not_optimized = days;
        self
    }

    pub fn with_min_days_not_vacuumed(mut self, days: i64) -> Self {
        self.min_days_not_vacuumed = days;
        self
    }

    pub fn with_max_optimize_freq(mut self, days: i64) -> Self {
        self.max_optimize_freq = days;
        self
    }

    pub fn with_max_vacuum_freq(mut self, days: i64) -> Self {
        self.max_vacuum_freq = days;
        self
    }

    pub fn with_small_file_threshold(mut self, bytes: i64) -> Self {
        self.small_file_threshold = bytes;
        self
    }

    pub fn with_min_number_of_files_for_zorder(mut self, files: i64) -> Self {
        self.min_number_of_files_for_zorder = files;
        self
    }

    /// Reject thresholds that would silently produce wrong recommendations.
    ///
    /// Every threshold must be non-negative. A frequency of 0 turns the
    /// matching "too often" rule off.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("min_table_size_optimize", self.min_table_size_optimize),
            ("min_days_not_optimized", self.min_days_not_optimized),
            ("min_days_not_vacuumed", self.min_days_not_vacuumed),
            ("max_optimize_freq", self.max_optimize_freq),
            ("max_vacuum_freq", self.max_vacuum_freq),
            ("small_file_threshold", self.small_file_threshold),
            (
                "min_number_of_files_for_zorder",
                self.min_number_of_files_for_zorder,
            ),
        ];
        if let Some(&(field, value)) = fields.iter().find(|(_, v)| *v < 0) {
            return Err(ConfigError::Negative { field, value });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RecommendationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_table_size_optimize, 134_217_728);
        assert_eq!(config.small_file_threshold, 33_554_432);
        assert_eq!(config.min_days_not_vacuumed, 31);
    }

    #[test]
    fn test_builder_overrides() {
        let config = RecommendationConfig::new()
            .with_min_days_not_optimized(3)
            .with_max_vacuum_freq(5)
            .with_min_number_of_files_for_zorder(20);
        assert_eq!(config.min_days_not_optimized, 3);
        assert_eq!(config.max_vacuum_freq, 5);
        assert_eq!(config.min_number_of_files_for_zorder, 20);
        assert_eq!(config.max_optimize_freq, 2);
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let err = RecommendationConfig::new()
            .with_min_days_not_vacuumed(-1)
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Negative {
                field: "min_days_not_vacuumed",
                value: -1
            }
        );
    }

    #[test]
    fn test_zero_frequency_accepted() {
        let config = RecommendationConfig::new()
            .with_max_optimize_freq(0)
            .with_max_vacuum_freq(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RecommendationConfig::from_json(r#"{"max_optimize_freq": 4}"#).unwrap();
        assert_eq!(config.max_optimize_freq, 4);
        assert_eq!(config.min_days_not_optimized, 7);
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            RecommendationConfig::from_json(r#"{"max_optimize_freq": "often"}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            RecommendationConfig::from_json(r#"{"small_file_threshold": -5}"#),
            Err(ConfigError::Negative { .. })
        ));
    }
}
