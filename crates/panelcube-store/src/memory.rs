//! In-memory store.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};

use crate::dtype::Element;
use crate::error::{StoreError, StoreResult};
use crate::manifest::{DatasetKind, DatasetSpec, Manifest};
use crate::{match_each_element_type, truncate_to_width, DatasetStore};

/// Keeps every dataset in process memory.
///
/// Numeric datasets are held as `ArrayD<T>` behind `dyn Any` and recovered
/// with [`MemoryStore::array`].
#[derive(Default)]
pub struct MemoryStore {
    manifest: Manifest,
    numeric: HashMap<String, Box<dyn Any + Send + Sync>>,
    strings: HashMap<String, Vec<String>>,
    slab_writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn array<T: Element>(&self, path: &str) -> Option<&ArrayD<T>> {
        self.numeric.get(path)?.downcast_ref::<ArrayD<T>>()
    }

    pub fn strings(&self, path: &str) -> Option<&[String]> {
        self.strings.get(path).map(Vec::as_slice)
    }

    /// Number of successful slab writes so far.
    pub fn slab_writes(&self) -> usize {
        self.slab_writes
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Numeric arrays sit behind `dyn Any`; list their paths only.
        let mut numeric: Vec<&str> = self.numeric.keys().map(String::as_str).collect();
        numeric.sort_unstable();
        f.debug_struct("MemoryStore")
            .field("manifest", &self.manifest)
            .field("numeric", &numeric)
            .field("strings", &self.strings)
            .field("slab_writes", &self.slab_writes)
            .finish()
    }
}

impl DatasetStore for MemoryStore {
    fn create_group(&mut self, group: &str) -> StoreResult<()> {
        self.manifest.add_group(group)
    }

    fn create_dataset(&mut self, path: &str, spec: DatasetSpec) -> StoreResult<()> {
        self.manifest.add_dataset(path, spec.clone())?;
        match spec.kind {
            DatasetKind::Numeric { dtype } => {
                let array: Box<dyn Any + Send + Sync> = match_each_element_type!(dtype, |T| {
                    Box::new(ArrayD::<T>::from_elem(IxDyn(&spec.shape), T::default()))
                });
                self.numeric.insert(path.to_string(), array);
            }
            DatasetKind::FixedString { .. } => {
                self.strings
                    .insert(path.to_string(), vec![String::new(); spec.len()]);
            }
        }
        Ok(())
    }

    fn write_slab<T: Element>(
        &mut self,
        path: &str,
        index: usize,
        slab: ArrayViewD<'_, T>,
    ) -> StoreResult<()> {
        self.manifest.check_slab::<T>(path, index, slab.shape())?;
        let array = self
            .numeric
            .get_mut(path)
            .and_then(|a| a.downcast_mut::<ArrayD<T>>())
            .ok_or_else(|| StoreError::UnknownDataset(path.to_string()))?;
        array.index_axis_mut(Axis(0), index).assign(&slab);
        self.slab_writes += 1;
        Ok(())
    }

    fn write_strings(&mut self, path: &str, values: &[String]) -> StoreResult<()> {
        let (_, width) = self.manifest.check_strings(path, values.len())?;
        let stored = values
            .iter()
            .map(|v| truncate_to_width(v, width).to_string())
            .collect();
        self.strings.insert(path.to_string(), stored);
        Ok(())
    }

    fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NumericType;
    use ndarray::array;

    #[test]
    fn slabs_land_at_their_index() {
        let mut store = MemoryStore::new();
        store.create_group("data").unwrap();
        store
            .create_dataset("data/cube", DatasetSpec::numeric(vec![3, 2, 2], NumericType::Int32))
            .unwrap();

        let slab = array![[1, 2], [3, 4]];
        store
            .write_slab("data/cube", 2, slab.view().into_dyn())
            .unwrap();

        let cube = store.array::<i32>("data/cube").unwrap();
        assert_eq!(cube.shape(), &[3, 2, 2]);
        assert_eq!(cube.index_axis(Axis(0), 2), slab.into_dyn());
        assert!(cube.index_axis(Axis(0), 0).iter().all(|v| *v == 0));
        assert_eq!(store.slab_writes(), 1);
    }

    #[test]
    fn wrong_element_type_is_rejected() {
        let mut store = MemoryStore::new();
        store.create_group("data").unwrap();
        store
            .create_dataset("data/cube", DatasetSpec::numeric(vec![1, 2], NumericType::Float32))
            .unwrap();
        let err = store
            .write_slab("data/cube", 0, array![1i32, 2].view().into_dyn())
            .unwrap_err();
        assert!(matches!(err, StoreError::KindMismatch { .. }));
        assert!(store.array::<i32>("data/cube").is_none());
        assert!(store.array::<f32>("data/cube").is_some());
    }

    #[test]
    fn debug_lists_datasets_without_their_arrays() {
        let mut store = MemoryStore::new();
        store.create_group("data").unwrap();
        store
            .create_dataset("data/cube", DatasetSpec::numeric(vec![1, 2], NumericType::Int64))
            .unwrap();
        let text = format!("{store:?}");
        assert!(text.starts_with("MemoryStore"), "{text}");
        assert!(text.contains("\"data/cube\""), "{text}");
        assert!(text.contains("slab_writes: 0"), "{text}");

        // Results carrying a store can be unwrapped in either direction.
        let failed: Result<MemoryStore, &str> = Err("boom");
        assert_eq!(failed.unwrap_err(), "boom");
    }

    #[test]
    fn strings_are_truncated_to_width() {
        let mut store = MemoryStore::new();
        store.create_group("key").unwrap();
        store
            .create_dataset("key/values", DatasetSpec::fixed_string(vec![2, 1], 4))
            .unwrap();
        assert_eq!(store.strings("key/values").unwrap(), &["", ""]);
        store
            .write_strings("key/values", &["ab".to_string(), "abcdef".to_string()])
            .unwrap();
        assert_eq!(store.strings("key/values").unwrap(), &["ab", "abcd"]);
    }
}
