//! panelcube dataset store
//!
//! A small hierarchical container model: named groups holding named,
//! independently shaped datasets.
//!
//! ```text
//! ┌──────────────────────────────── container ────────────────────────────────┐
//! │                                                                          │
//! │  key/                 time/                 data/                        │
//! │   └─ values (N×1 S32)  └─ values (T×1 S128)  ├─ core_array (N×T×F num)   │
//! │                                             └─ column_labels (1×F S256)  │
//! │                                                                          │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Numeric datasets are written one slab at a time along their first axis
//! ([`DatasetStore::write_slab`]); string datasets are written whole
//! ([`DatasetStore::write_strings`]). Shapes and element types are declared
//! up front and never change.
//!
//! Two stores ship with the crate:
//! - [`MemoryStore`]: everything in process memory, for tests and small runs
//! - [`NpyDirStore`]: a directory per group and a `.npy` file per dataset,
//!   with memory-mapped slab writes so the dense array never has to fit in RAM

pub mod dtype;
pub mod error;
pub mod manifest;
pub mod memory;
pub mod npy_dir;
mod npy_header;

use ndarray::ArrayViewD;

pub use dtype::{Element, NumericType, UnknownNumericType};
pub use error::{StoreError, StoreResult};
pub use manifest::{DatasetEntry, DatasetKind, DatasetSpec, Manifest};
pub use memory::MemoryStore;
pub use npy_dir::{read_manifest, read_string_dataset, NpyDirStore};

// ============================================================================
// Store contract
// ============================================================================

/// A hierarchical container of named datasets.
///
/// Paths are `/`-separated (`data/core_array`); every parent group must be
/// created before anything is placed inside it.
pub trait DatasetStore {
    fn create_group(&mut self, group: &str) -> StoreResult<()>;

    /// Declare a dataset. Numeric datasets start out zero-filled, string
    /// datasets start out as empty strings.
    fn create_dataset(&mut self, path: &str, spec: DatasetSpec) -> StoreResult<()>;

    /// Overwrite the slab at `index` along the first axis of a numeric dataset.
    fn write_slab<T: Element>(
        &mut self,
        path: &str,
        index: usize,
        slab: ArrayViewD<'_, T>,
    ) -> StoreResult<()>;

    /// Overwrite a whole string dataset (values in row-major order).
    ///
    /// Values longer than the dataset width are truncated.
    fn write_strings(&mut self, path: &str, values: &[String]) -> StoreResult<()>;

    fn manifest(&self) -> &Manifest;
}

/// Clip `value` to at most `width` bytes without splitting a UTF-8 sequence.
pub fn truncate_to_width(value: &str, width: usize) -> &str {
    if value.len() <= width {
        return value;
    }
    let mut end = width;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
