//! Run configuration.

use std::path::{Path, PathBuf};

use panelcube_store::NumericType;
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, IngestResult};

pub const DEFAULT_KEY_COLUMN: &str = "npi";
pub const DEFAULT_TIME_COLUMN: &str = "year";
pub const DEFAULT_HEADER_PREFIX_LEN: usize = 3;
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 5000;

/// What to do when a key shows up again after its block was flushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Assume rows are grouped by key. A recurring key starts a fresh block
    /// that overwrites the earlier one at the same position (logged).
    #[default]
    Trust,
    /// Fail with [`IngestError::NonContiguousKey`] instead.
    Verify,
}

/// What to do with a second row for the same (key, time) inside one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Last row wins.
    #[default]
    Overwrite,
    /// Fail with [`IngestError::DuplicateObservation`].
    Error,
    /// Element-wise sum (saturating for integers).
    Accumulate,
}

/// How the time axis is ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOrder {
    /// Byte-wise string order: `"10" < "9"`.
    #[default]
    Lexicographic,
    /// Labels parsed as numbers; ties broken by string order.
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeConfig {
    /// Input files, in processing order. Order decides key positions.
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub key_column: String,
    pub time_column: String,
    /// Drop a fixed number of characters from the first header cell (some
    /// exports prepend junk such as a mis-decoded byte order mark).
    pub strip_header_prefix: bool,
    pub header_prefix_len: usize,
    /// Extra columns kept off the feature axis.
    pub ignore_columns: Vec<String>,
    pub delimiter: char,
    pub dtype: NumericType,
    /// Log progress every this many rows of a file.
    pub progress_interval: u64,
    pub ordering: OrderingPolicy,
    pub duplicates: DuplicatePolicy,
    pub time_order: TimeOrder,
    /// Replace an existing output instead of failing.
    pub overwrite_output: bool,
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output: PathBuf::from("cube"),
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            time_column: DEFAULT_TIME_COLUMN.to_string(),
            strip_header_prefix: true,
            header_prefix_len: DEFAULT_HEADER_PREFIX_LEN,
            ignore_columns: Vec::new(),
            delimiter: ',',
            dtype: NumericType::Int32,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            ordering: OrderingPolicy::default(),
            duplicates: DuplicatePolicy::default(),
            time_order: TimeOrder::default(),
            overwrite_output: false,
        }
    }
}

impl CubeConfig {
    pub fn new(inputs: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output: output.into(),
            ..Default::default()
        }
    }

    pub fn load(path: &Path) -> IngestResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| IngestError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| IngestError::Config(format!("{}: {e}", path.display())))
    }

    pub fn validate(&self) -> IngestResult<()> {
        let fail = |msg: &str| Err(IngestError::Config(msg.to_string()));
        if self.inputs.is_empty() {
            return fail("at least one input file is required");
        }
        if self.key_column.is_empty() || self.time_column.is_empty() {
            return fail("key and time column names must not be empty");
        }
        if self.key_column == self.time_column {
            return fail("key and time columns must differ");
        }
        if self
            .ignore_columns
            .iter()
            .any(|c| *c == self.key_column || *c == self.time_column)
        {
            return fail("the key or time column cannot also be ignored");
        }
        if !self.delimiter.is_ascii() {
            return fail("delimiter must be a single ASCII character");
        }
        if self.progress_interval == 0 {
            return fail("progress interval must be positive");
        }
        Ok(())
    }

    pub(crate) fn delimiter_byte(&self) -> u8 {
        // validate() guarantees ASCII
        self.delimiter as u8
    }
}
