//! Pass 2: stream rows into per-key blocks and flush them into the cube.
//!
//! Only one entity block (times × features) is alive at a time. A block is
//! flushed to its key's slab of the dense array when the next row belongs to
//! a different key, and once more after the last row. This is correct when
//! every key's rows are contiguous across the ordered inputs; a key that
//! comes back later starts a fresh block, and its next flush replaces the
//! earlier slab.

use std::path::Path;

use ndarray::Array2;
use panelcube_store::{DatasetStore, Element};
use tracing::{info, warn};

use crate::config::{CubeConfig, DuplicatePolicy, OrderingPolicy};
use crate::error::{IngestError, IngestResult};
use crate::layout::{CORE_ARRAY, KEY_VALUES};
use crate::reader::{PanelReader, Row};
use crate::scan::ScanResult;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DensifyStats {
    pub rows: u64,
    pub blocks_flushed: u64,
    /// Flushes that replaced an earlier slab of the same key.
    pub blocks_rewritten: u64,
    /// Rows that hit an already observed (key, time) cell.
    pub duplicates: u64,
}

/// Observations of the key currently being processed.
struct EntityBlock<T> {
    values: Array2<T>,
    observed: Vec<bool>,
}

impl<T: Element> EntityBlock<T> {
    fn new(times: usize, features: usize) -> Self {
        Self {
            values: Array2::from_elem((times, features), T::default()),
            observed: vec![false; times],
        }
    }

    fn reset(&mut self) {
        self.values.fill(T::default());
        self.observed.fill(false);
    }
}

pub struct Densifier<'a, T: Element, S: DatasetStore> {
    config: &'a CubeConfig,
    scan: &'a ScanResult,
    store: &'a mut S,
    block: EntityBlock<T>,
    current: Option<usize>,
    flushed: Vec<bool>,
    key_labels: Vec<String>,
    stats: DensifyStats,
}

impl<'a, T: Element, S: DatasetStore> Densifier<'a, T, S> {
    pub fn new(config: &'a CubeConfig, scan: &'a ScanResult, store: &'a mut S) -> Self {
        Self {
            config,
            scan,
            store,
            block: EntityBlock::new(scan.num_times(), scan.num_features()),
            current: None,
            flushed: vec![false; scan.num_keys()],
            key_labels: vec![String::new(); scan.num_keys()],
            stats: DensifyStats::default(),
        }
    }

    /// Re-read every input and write the dense array and key labels.
    pub fn run(mut self) -> IngestResult<DensifyStats> {
        let config = self.config;
        for path in &config.inputs {
            info!(file = %path.display(), "processing");
            let mut reader = PanelReader::open(path, config)?;
            let found = reader.layout().feature_count();
            if found != self.scan.num_features() {
                return Err(IngestError::FeatureWidthMismatch {
                    path: path.clone(),
                    expected: self.scan.num_features(),
                    found,
                });
            }

            while let Some(row) = reader.next_row()? {
                self.ingest_row(path, &row)?;
                let read = reader.rows();
                if read % config.progress_interval == 0 {
                    info!(file = %path.display(), rows = read, "read rows");
                }
            }
        }
        self.finish()
    }

    fn ingest_row(&mut self, path: &Path, row: &Row<'_>) -> IngestResult<()> {
        let (key, time) = (row.key(), row.time());
        let (Some(key_pos), Some(time_pos)) =
            (self.scan.keys.position(key), self.scan.times.position(time))
        else {
            return Err(IngestError::InputChanged {
                path: path.to_path_buf(),
                line: row.line,
                key: key.to_string(),
                time: time.to_string(),
            });
        };

        if self.current != Some(key_pos) {
            if let Some(previous) = self.current {
                self.flush(previous)?;
            }
            if self.flushed[key_pos] {
                match self.config.ordering {
                    OrderingPolicy::Verify => {
                        return Err(IngestError::NonContiguousKey {
                            path: path.to_path_buf(),
                            line: row.line,
                            key: key.to_string(),
                        });
                    }
                    OrderingPolicy::Trust => warn!(
                        file = %path.display(),
                        line = row.line,
                        key,
                        "key reappears after its block was written; earlier rows will be overwritten"
                    ),
                }
            }
            self.current = Some(key_pos);
        }

        let duplicate = self.block.observed[time_pos];
        if duplicate {
            self.stats.duplicates += 1;
            if self.config.duplicates == DuplicatePolicy::Error {
                return Err(IngestError::DuplicateObservation {
                    path: path.to_path_buf(),
                    line: row.line,
                    key: key.to_string(),
                    time: time.to_string(),
                });
            }
        }
        let accumulate = duplicate && self.config.duplicates == DuplicatePolicy::Accumulate;

        let mut slot = self.block.values.row_mut(time_pos);
        for (j, column, cell) in row.features() {
            let parsed = parse_cell(cell).ok_or_else(|| IngestError::BadCell {
                path: path.to_path_buf(),
                line: row.line,
                column: column.to_string(),
                value: cell.to_string(),
            })?;
            let value = T::from_f64(parsed);
            slot[j] = if accumulate {
                slot[j].accumulate(value)
            } else {
                value
            };
        }
        self.block.observed[time_pos] = true;
        self.stats.rows += 1;
        Ok(())
    }

    fn flush(&mut self, position: usize) -> IngestResult<()> {
        self.store
            .write_slab(CORE_ARRAY, position, self.block.values.view().into_dyn())?;
        if self.flushed[position] {
            self.stats.blocks_rewritten += 1;
        }
        self.flushed[position] = true;
        self.key_labels[position] = self
            .scan
            .keys
            .label(position)
            .unwrap_or_default()
            .to_string();
        self.stats.blocks_flushed += 1;
        self.block.reset();
        Ok(())
    }

    fn finish(mut self) -> IngestResult<DensifyStats> {
        // The last block has no successor key to trigger its flush.
        if let Some(position) = self.current.take() {
            self.flush(position)?;
        }
        self.store.write_strings(KEY_VALUES, &self.key_labels)?;
        info!(
            rows = self.stats.rows,
            blocks = self.stats.blocks_flushed,
            rewritten = self.stats.blocks_rewritten,
            "densified"
        );
        Ok(self.stats)
    }
}

/// Feature cells are read as floating point, then cast to the element type.
fn parse_cell(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok()
}
