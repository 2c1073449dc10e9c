//! Directory-backed container.
//!
//! Layout on disk:
//!
//! ```text
//! <root>/
//!   manifest.json            groups + datasets in creation order
//!   <group>/                 one directory per group
//!     <dataset>.npy          one NumPy file per dataset
//! ```
//!
//! Numeric datasets are created zero-filled (the file is extended, not
//! written, so untouched regions stay sparse) and then memory-mapped; each
//! slab write touches only the pages of that slab. The mapping is flushed in
//! [`NpyDirStore::finish`].

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;
use ndarray::{ArrayViewD, ArrayViewMutD, Axis, IxDyn};
use ndarray_npy::ViewMutNpyExt;

use crate::dtype::Element;
use crate::error::{StoreError, StoreResult};
use crate::manifest::{DatasetKind, DatasetSpec, Manifest};
use crate::npy_header::{read_fixed_string_npy, write_fixed_string_npy};
use crate::{match_each_element_type, DatasetStore};

pub const MANIFEST_FILE: &str = "manifest.json";

struct MappedDataset {
    file_path: PathBuf,
    mmap: MmapMut,
}

pub struct NpyDirStore {
    root: PathBuf,
    manifest: Manifest,
    mapped: HashMap<String, MappedDataset>,
}

impl NpyDirStore {
    /// Create a fresh container at `root`.
    ///
    /// An existing non-empty directory (or a file) at `root` is an error
    /// unless `overwrite` is set, in which case it is removed first.
    pub fn create(root: impl AsRef<Path>, overwrite: bool) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        if root.is_dir() {
            let occupied = fs::read_dir(&root)
                .map_err(|e| StoreError::io(&root, e))?
                .next()
                .is_some();
            if occupied {
                if !overwrite {
                    return Err(StoreError::OutputExists(root));
                }
                tracing::info!(path = %root.display(), "replacing existing container");
                fs::remove_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
            }
        } else if root.exists() {
            if !overwrite {
                return Err(StoreError::OutputExists(root));
            }
            fs::remove_file(&root).map_err(|e| StoreError::io(&root, e))?;
        }
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;

        Ok(Self {
            root,
            manifest: Manifest::new(),
            mapped: HashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Flush every mapped dataset and write `manifest.json`.
    pub fn finish(self) -> StoreResult<PathBuf> {
        for dataset in self.mapped.values() {
            dataset
                .mmap
                .flush()
                .map_err(|e| StoreError::io(&dataset.file_path, e))?;
        }
        let manifest_path = self.root.join(MANIFEST_FILE);
        let mut json = serde_json::to_string_pretty(&self.manifest)?;
        json.push('\n');
        fs::write(&manifest_path, json).map_err(|e| StoreError::io(&manifest_path, e))?;
        Ok(self.root)
    }

    fn file_for(&self, path: &str) -> PathBuf {
        dataset_file(&self.root, path)
    }
}

fn dataset_file(root: &Path, path: &str) -> PathBuf {
    let mut file = root.to_path_buf();
    for part in path.split('/') {
        file.push(part);
    }
    file.set_extension("npy");
    file
}

impl DatasetStore for NpyDirStore {
    fn create_group(&mut self, group: &str) -> StoreResult<()> {
        self.manifest.add_group(group)?;
        let mut dir = self.root.clone();
        dir.extend(group.split('/'));
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))
    }

    fn create_dataset(&mut self, path: &str, spec: DatasetSpec) -> StoreResult<()> {
        self.manifest.add_dataset(path, spec.clone())?;
        let file_path = self.file_for(path);
        tracing::debug!(dataset = path, shape = ?spec.shape, file = %file_path.display(), "creating dataset");

        match spec.kind {
            DatasetKind::Numeric { dtype } => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create_new(true)
                    .open(&file_path)
                    .map_err(|e| StoreError::io(&file_path, e))?;
                match_each_element_type!(dtype, |T| {
                    ndarray_npy::write_zeroed_npy::<T, _>(&file, IxDyn(&spec.shape))
                })
                .map_err(|source| StoreError::NpyWrite {
                    path: file_path.clone(),
                    source,
                })?;
                let mmap = map_file(&file, &file_path)?;
                self.mapped
                    .insert(path.to_string(), MappedDataset { file_path, mmap });
            }
            DatasetKind::FixedString { width } => {
                write_fixed_string_npy(&file_path, &spec.shape, width, &[])?;
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
        let dataset = self
            .mapped
            .get_mut(path)
            .ok_or_else(|| StoreError::UnknownDataset(path.to_string()))?;
        let mut view = ArrayViewMutD::<T>::view_mut_npy(&mut dataset.mmap[..]).map_err(|source| {
            StoreError::NpyView {
                path: dataset.file_path.clone(),
                source,
            }
        })?;
        view.index_axis_mut(Axis(0), index).assign(&slab);
        Ok(())
    }

    fn write_strings(&mut self, path: &str, values: &[String]) -> StoreResult<()> {
        let (spec, width) = self.manifest.check_strings(path, values.len())?;
        let file_path = self.file_for(path);
        write_fixed_string_npy(&file_path, &spec.shape, width, values)
    }

    fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

fn map_file(file: &File, path: &Path) -> StoreResult<MmapMut> {
    // SAFETY: the file was created by this store and is not shared with other
    // writers while the mapping is alive.
    unsafe { MmapMut::map_mut(file) }.map_err(|e| StoreError::io(path, e))
}

// ============================================================================
// Reading a finished container
// ============================================================================

pub fn read_manifest(root: impl AsRef<Path>) -> StoreResult<Manifest> {
    let path = root.as_ref().join(MANIFEST_FILE);
    let text = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
    Ok(serde_json::from_str(&text)?)
}

/// Read a string dataset of a finished container: (shape, values).
pub fn read_string_dataset(
    root: impl AsRef<Path>,
    path: &str,
) -> StoreResult<(Vec<usize>, Vec<String>)> {
    let file = dataset_file(root.as_ref(), path);
    let (shape, _, values) = read_fixed_string_npy(&file)?;
    Ok((shape, values))
}

/// Location of a dataset's `.npy` file inside a container.
pub fn dataset_path(root: impl AsRef<Path>, path: &str) -> PathBuf {
    dataset_file(root.as_ref(), path)
}
