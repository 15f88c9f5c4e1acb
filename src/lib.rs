//! Housekeeping recommendations for Delta tables.
//!
//! A [`Scanner`] reads `DESCRIBE DETAIL` and `DESCRIBE HISTORY` for many
//! tables through a [`TableCatalog`] and folds each into a [`TableSummary`].
//! A [`RecommendationEngine`] then runs an ordered list of rules over the
//! summaries and flags tables that need OPTIMIZE, VACUUM, or a closer look.

pub mod reader;
pub mod recommend;
pub mod scan;
pub mod storage;
pub mod table;

pub use recommend::{HousekeepingActions, RecommendationConfig, RecommendationEngine};
pub use scan::{Scanner, TableSummary};
pub use storage::{SinkConfig, TableCatalog};
pub use table::TableIdentifier;
