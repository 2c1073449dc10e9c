//! Group/dataset catalog shared by every store.
//!
//! The manifest is both the in-process bookkeeping (which groups exist, what
//! shape each dataset was declared with) and, for [`crate::NpyDirStore`], the
//! `manifest.json` persisted next to the data. Entries keep creation order so
//! the serialized form is deterministic.

use serde::{Deserialize, Serialize};

use crate::dtype::{Element, NumericType};
use crate::error::{StoreError, StoreResult};

pub const MANIFEST_FORMAT_V1: &str = "panelcube_manifest_v1";

/// Element layout of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetKind {
    Numeric { dtype: NumericType },
    /// Fixed-width byte strings, NUL padded.
    FixedString { width: usize },
}

impl DatasetKind {
    fn describe(&self) -> String {
        match self {
            DatasetKind::Numeric { dtype } => format!("{dtype} values"),
            DatasetKind::FixedString { width } => format!("{width}-byte strings"),
        }
    }
}

/// Declared shape and element layout of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub shape: Vec<usize>,
    #[serde(flatten)]
    pub kind: DatasetKind,
}

impl DatasetSpec {
    pub fn numeric(shape: impl Into<Vec<usize>>, dtype: NumericType) -> Self {
        Self {
            shape: shape.into(),
            kind: DatasetKind::Numeric { dtype },
        }
    }

    pub fn fixed_string(shape: impl Into<Vec<usize>>, width: usize) -> Self {
        Self {
            shape: shape.into(),
            kind: DatasetKind::FixedString { width },
        }
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub path: String,
    #[serde(flatten)]
    pub spec: DatasetSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub format: String,
    pub groups: Vec<String>,
    pub datasets: Vec<DatasetEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            format: MANIFEST_FORMAT_V1.to_string(),
            groups: Vec::new(),
            datasets: Vec::new(),
        }
    }
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_group(&self, group: &str) -> bool {
        group.is_empty() || self.groups.iter().any(|g| g == group)
    }

    pub fn dataset(&self, path: &str) -> Option<&DatasetEntry> {
        self.datasets.iter().find(|d| d.path == path)
    }

    pub fn add_group(&mut self, group: &str) -> StoreResult<()> {
        let (parent, _) = split_path(group)?;
        if self.has_group(group) || self.dataset(group).is_some() {
            return Err(StoreError::GroupExists(group.to_string()));
        }
        if !self.has_group(parent) {
            return Err(StoreError::MissingParent {
                path: group.to_string(),
                parent: parent.to_string(),
            });
        }
        self.groups.push(group.to_string());
        Ok(())
    }

    pub fn add_dataset(&mut self, path: &str, spec: DatasetSpec) -> StoreResult<()> {
        let (parent, _) = split_path(path)?;
        if self.dataset(path).is_some() || self.has_group(path) {
            return Err(StoreError::DatasetExists(path.to_string()));
        }
        if !self.has_group(parent) {
            return Err(StoreError::MissingParent {
                path: path.to_string(),
                parent: parent.to_string(),
            });
        }
        if let DatasetKind::FixedString { width: 0 } = spec.kind {
            return Err(StoreError::InvalidSpec {
                path: path.to_string(),
                message: "string width must be at least one byte".to_string(),
            });
        }
        if let DatasetKind::Numeric { .. } = spec.kind {
            if spec.shape.is_empty() {
                return Err(StoreError::InvalidSpec {
                    path: path.to_string(),
                    message: "numeric datasets need at least one axis".to_string(),
                });
            }
        }
        self.datasets.push(DatasetEntry {
            path: path.to_string(),
            spec,
        });
        Ok(())
    }

    /// Validate a slab write of `T` at `index` along the first axis.
    pub fn check_slab<T: Element>(
        &self,
        path: &str,
        index: usize,
        slab_shape: &[usize],
    ) -> StoreResult<&DatasetSpec> {
        let entry = self
            .dataset(path)
            .ok_or_else(|| StoreError::UnknownDataset(path.to_string()))?;
        let spec = &entry.spec;
        match spec.kind {
            DatasetKind::Numeric { dtype } if dtype == T::NUMERIC_TYPE => {}
            other => {
                return Err(StoreError::KindMismatch {
                    path: path.to_string(),
                    expected: other.describe(),
                    actual: DatasetKind::Numeric {
                        dtype: T::NUMERIC_TYPE,
                    }
                    .describe(),
                })
            }
        }
        let len = spec.shape[0];
        if index >= len {
            return Err(StoreError::IndexOutOfBounds {
                path: path.to_string(),
                index,
                len,
            });
        }
        if slab_shape != &spec.shape[1..] {
            return Err(StoreError::ShapeMismatch {
                path: path.to_string(),
                expected: spec.shape[1..].to_vec(),
                actual: slab_shape.to_vec(),
            });
        }
        Ok(spec)
    }

    /// Validate a whole-array string write; returns the string width.
    pub fn check_strings(&self, path: &str, count: usize) -> StoreResult<(&DatasetSpec, usize)> {
        let entry = self
            .dataset(path)
            .ok_or_else(|| StoreError::UnknownDataset(path.to_string()))?;
        let spec = &entry.spec;
        let DatasetKind::FixedString { width } = spec.kind else {
            return Err(StoreError::KindMismatch {
                path: path.to_string(),
                expected: spec.kind.describe(),
                actual: "strings".to_string(),
            });
        };
        if count != spec.len() {
            return Err(StoreError::LengthMismatch {
                path: path.to_string(),
                expected: spec.len(),
                actual: count,
            });
        }
        Ok((spec, width))
    }
}

/// Split `a/b/c` into (`a/b`, `c`). Top-level names have an empty parent.
pub(crate) fn split_path(path: &str) -> StoreResult<(&str, &str)> {
    let valid = !path.is_empty()
        && path
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != ".." && !part.contains('\\'));
    if !valid {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(match path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    })
}
