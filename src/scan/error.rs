use thiserror::Error;

use crate::reader::history::HistoryParseError;
use crate::storage::StorageError;

/// Failure while scanning a single table
///
/// The message is the collaborator's own text so that error rows carry it
/// verbatim.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("{0}")]
    Detail(StorageError),

    #[error("{0}")]
    History(StorageError),

    #[error("{0}")]
    MalformedHistory(#[from] HistoryParseError),
}
