//! Ingest errors
//!
//! Every variant is fatal for the run; there is no partial-success mode.

use std::path::{Path, PathBuf};

use panelcube_store::StoreError;
use thiserror::Error;

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: no header row")]
    MissingHeader { path: PathBuf },

    #[error("{path}: column `{column}` not found in header")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}: {found} feature columns, but the first input has {expected}")]
    FeatureWidthMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("{path}:{line}: column `{column}` value {value:?} is not a number")]
    BadCell {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    #[error("time label {label:?} is not a number (numeric time ordering)")]
    NonNumericTime { label: String },

    #[error("{path}:{line}: key {key:?} appears again after its rows were already written; input is not grouped by key")]
    NonContiguousKey {
        path: PathBuf,
        line: u64,
        key: String,
    },

    #[error("{path}:{line}: second observation for key {key:?} at time {time:?}")]
    DuplicateObservation {
        path: PathBuf,
        line: u64,
        key: String,
        time: String,
    },

    #[error("{path}:{line}: key {key:?} or time {time:?} was not seen while scanning; inputs changed between passes")]
    InputChanged {
        path: PathBuf,
        line: u64,
        key: String,
        time: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IngestError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}
