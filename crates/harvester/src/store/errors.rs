use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing a record table.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The table file could not be opened, created or replaced.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The table file is not valid CSV.
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The table has no column the store can key rows by.
    #[error("{path} has no `{column}` column")]
    MissingKeyColumn { path: PathBuf, column: String },

    /// A record could not be keyed.
    #[error("record has no identity: {0}")]
    MissingIdentity(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
