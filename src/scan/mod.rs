pub mod error;
pub mod scanner;
pub mod summary;

pub use error::ScanError;
pub use scanner::{DEFAULT_SUMMARY_TABLE, Scanner, ScannerBuilder};
pub use summary::{TableSummary, summarize};
