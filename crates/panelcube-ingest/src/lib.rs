//! Panel ingestion for panelcube
//!
//! Turns delimited files of repeated (key, time, features...) observations
//! into a dense `keys × times × features` cube:
//!
//! ```text
//!  inputs (ordered)          pass 1: Scanner              pass 2: Densifier
//! ┌──────────────┐     ┌─────────────────────────┐    ┌──────────────────────┐
//! │ part0.csv    │────►│ keys   (first-seen)     │───►│ one live entity block│
//! │ part1.csv    │     │ times  (sorted)         │    │ flushed per key      │──► DatasetStore
//! │ ...          │     │ features (header order) │    │ into data/core_array │
//! └──────────────┘     └─────────────────────────┘    └──────────────────────┘
//! ```
//!
//! Memory is bounded by the axis indexes plus one `times × features` block,
//! whatever the row count. The price is a precondition: each key's rows must
//! be contiguous across the ordered inputs (see [`OrderingPolicy`]).

pub mod config;
pub mod densify;
pub mod error;
pub mod index;
pub mod layout;
pub mod reader;
pub mod scan;

use panelcube_store::{match_each_element_type, DatasetStore, NpyDirStore, NumericType};
use std::path::PathBuf;
use tracing::info;

pub use config::{CubeConfig, DuplicatePolicy, OrderingPolicy, TimeOrder};
pub use densify::{DensifyStats, Densifier};
pub use error::{IngestError, IngestResult};
pub use index::{KeyIndex, TimeIndex};
pub use scan::{ScanResult, Scanner};

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CubeSummary {
    pub keys: usize,
    pub times: usize,
    pub features: usize,
    pub dtype: NumericType,
    pub rows_scanned: u64,
    pub densify: DensifyStats,
}

impl CubeSummary {
    pub fn shape(&self) -> [usize; 3] {
        [self.keys, self.times, self.features]
    }
}

/// Run both passes into `store`.
pub fn build_cube<S: DatasetStore>(config: &CubeConfig, store: &mut S) -> IngestResult<CubeSummary> {
    config.validate()?;
    let scan = Scanner::new(config).scan()?;
    write_cube(config, &scan, store)
}

/// Pass 2 only, for a scan the caller already holds.
pub fn write_cube<S: DatasetStore>(
    config: &CubeConfig,
    scan: &ScanResult,
    store: &mut S,
) -> IngestResult<CubeSummary> {
    info!(
        keys = scan.num_keys(),
        times = scan.num_times(),
        features = scan.num_features(),
        "axes fixed"
    );
    layout::create_layout(store, scan, config.dtype)?;

    let densify = match_each_element_type!(config.dtype, |T| {
        Densifier::<T, S>::new(config, scan, &mut *store).run()?
    });

    Ok(CubeSummary {
        keys: scan.num_keys(),
        times: scan.num_times(),
        features: scan.num_features(),
        dtype: config.dtype,
        rows_scanned: scan.rows,
        densify,
    })
}

/// Run both passes into a `.npy` directory container at `config.output`.
///
/// The output is only created once pass 1 has succeeded.
pub fn build_cube_dir(config: &CubeConfig) -> IngestResult<(PathBuf, CubeSummary)> {
    config.validate()?;
    let scan = Scanner::new(config).scan()?;
    let mut store = NpyDirStore::create(&config.output, config.overwrite_output)?;
    let summary = write_cube(config, &scan, &mut store)?;
    let root = store.finish()?;
    Ok((root, summary))
}
