pub mod config;
pub mod engine;
pub mod report;
pub mod rules;

pub use config::{ConfigError, RecommendationConfig};
pub use engine::{Clock, RecommendationEngine, RecommendationSet, apply_rule, evaluate};
pub use report::{DEFAULT_RECOMMENDATION_TABLE, Explanation, HousekeepingActions};
pub use rules::{Rule, Target, Verdict};
