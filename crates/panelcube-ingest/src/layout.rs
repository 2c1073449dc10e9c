//! Container layout of a cube.

use panelcube_store::{DatasetSpec, DatasetStore, NumericType, StoreResult};
use tracing::debug;

use crate::scan::ScanResult;

pub const KEY_GROUP: &str = "key";
pub const KEY_VALUES: &str = "key/values";
pub const KEY_LABEL_WIDTH: usize = 32;

pub const TIME_GROUP: &str = "time";
pub const TIME_VALUES: &str = "time/values";
pub const TIME_LABEL_WIDTH: usize = 128;

pub const DATA_GROUP: &str = "data";
pub const CORE_ARRAY: &str = "data/core_array";
pub const COLUMN_LABELS: &str = "data/column_labels";
pub const COLUMN_LABEL_WIDTH: usize = 256;

/// Declare every dataset of the cube and write the ones pass 1 already knows
/// (time labels, column labels). Key labels and the dense array are filled in
/// by the densifier.
pub fn create_layout<S: DatasetStore>(
    store: &mut S,
    scan: &ScanResult,
    dtype: NumericType,
) -> StoreResult<()> {
    let (keys, times, features) = (scan.num_keys(), scan.num_times(), scan.num_features());
    debug!(keys, times, features, %dtype, "creating cube layout");

    store.create_group(KEY_GROUP)?;
    store.create_group(TIME_GROUP)?;
    store.create_group(DATA_GROUP)?;

    store.create_dataset(KEY_VALUES, DatasetSpec::fixed_string(vec![keys, 1], KEY_LABEL_WIDTH))?;
    store.create_dataset(TIME_VALUES, DatasetSpec::fixed_string(vec![times, 1], TIME_LABEL_WIDTH))?;
    store.write_strings(TIME_VALUES, scan.times.labels())?;

    store.create_dataset(CORE_ARRAY, DatasetSpec::numeric(vec![keys, times, features], dtype))?;
    store.create_dataset(
        COLUMN_LABELS,
        DatasetSpec::fixed_string(vec![1, features], COLUMN_LABEL_WIDTH),
    )?;
    store.write_strings(COLUMN_LABELS, &scan.feature_names)?;
    Ok(())
}
