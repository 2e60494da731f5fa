use thiserror::Error;

use crate::consolidate::ConsolidationError;
use crate::row::RowError;
use crate::source::SourceError;

/// Failure extracting one file. Carries the file so callers running over
/// many files can report and move on.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("{path}: {source}")]
    Source {
        path: String,
        #[source]
        source: SourceError,
    },
    #[error("{path}, row {index}: {source}")]
    Row {
        path: String,
        index: usize,
        #[source]
        source: RowError,
    },
    #[error("{path}: {source}")]
    Consolidation {
        path: String,
        #[source]
        source: ConsolidationError,
    },
}

impl ImportError {
    pub fn path(&self) -> &str {
        match self {
            ImportError::Source { path, .. }
            | ImportError::Row { path, .. }
            | ImportError::Consolidation { path, .. } => path,
        }
    }
}
