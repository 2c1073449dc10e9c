//! Store errors

use std::path::PathBuf;

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output {0} already exists and is not empty")]
    OutputExists(PathBuf),

    #[error("invalid dataset or group path `{0}`")]
    InvalidPath(String),

    #[error("group `{0}` already exists")]
    GroupExists(String),

    #[error("parent group `{parent}` of `{path}` does not exist")]
    MissingParent { path: String, parent: String },

    #[error("dataset `{0}` already exists")]
    DatasetExists(String),

    #[error("no dataset named `{0}`")]
    UnknownDataset(String),

    #[error("invalid layout for dataset `{path}`: {message}")]
    InvalidSpec { path: String, message: String },

    #[error("dataset `{path}` holds {expected}, not {actual}")]
    KindMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("slab of shape {actual:?} does not fit dataset `{path}` (slab shape {expected:?})")]
    ShapeMismatch {
        path: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("slab index {index} out of bounds for dataset `{path}` with {len} slabs")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("dataset `{path}` holds {expected} values, got {actual}")]
    LengthMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },

    #[error("failed to create .npy data in {path}: {source}")]
    NpyWrite {
        path: PathBuf,
        #[source]
        source: ndarray_npy::WriteNpyError,
    },

    #[error("failed to map .npy data in {path}: {source}")]
    NpyView {
        path: PathBuf,
        #[source]
        source: ndarray_npy::ViewNpyError,
    },

    #[error("malformed .npy header in {path}: {message}")]
    NpyHeader { path: PathBuf, message: String },

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
