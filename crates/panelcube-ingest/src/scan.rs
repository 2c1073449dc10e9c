//! Pass 1: discover the key axis, the time axis and the feature schema.

use std::collections::BTreeSet;

use tracing::info;

use crate::config::CubeConfig;
use crate::error::{IngestError, IngestResult};
use crate::index::{KeyIndex, TimeIndex};
use crate::reader::PanelReader;

/// Axes and schema fixed by the first pass. Immutable afterward.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub keys: KeyIndex,
    pub times: TimeIndex,
    /// Feature column names of the first input, in header order.
    pub feature_names: Vec<String>,
    pub rows: u64,
}

impl ScanResult {
    pub fn num_keys(&self) -> usize {
        self.keys.len()
    }

    pub fn num_times(&self) -> usize {
        self.times.len()
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }
}

pub struct Scanner<'a> {
    config: &'a CubeConfig,
}

impl<'a> Scanner<'a> {
    pub fn new(config: &'a CubeConfig) -> Self {
        Self { config }
    }

    pub fn scan(&self) -> IngestResult<ScanResult> {
        let mut keys = KeyIndex::new();
        let mut distinct_times = BTreeSet::new();
        let mut feature_names: Option<Vec<String>> = None;
        let mut rows = 0u64;

        for path in &self.config.inputs {
            info!(file = %path.display(), "scanning");
            let mut reader = PanelReader::open(path, self.config)?;

            let found = reader.layout().feature_count();
            match feature_names.as_ref().map(Vec::len) {
                None => feature_names = Some(reader.layout().feature_names.clone()),
                Some(expected) if expected != found => {
                    return Err(IngestError::FeatureWidthMismatch {
                        path: path.clone(),
                        expected,
                        found,
                    });
                }
                Some(_) => {}
            }

            while let Some(row) = reader.next_row()? {
                keys.observe(row.key());
                let time = row.time();
                if !distinct_times.contains(time) {
                    distinct_times.insert(time.to_string());
                }
            }
            rows += reader.rows();
        }

        let times = TimeIndex::build(distinct_times, self.config.time_order)?;
        Ok(ScanResult {
            keys,
            times,
            feature_names: feature_names.unwrap_or_default(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_inputs(dir: &TempDir, files: &[&str]) -> Vec<PathBuf> {
        files
            .iter()
            .enumerate()
            .map(|(i, body)| {
                let path = dir.path().join(format!("part{i}.csv"));
                std::fs::write(&path, body).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn discovers_axes_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = write_inputs(
            &dir,
            &[
                "___npi,year,a,b\nN2,2016,1,2\nN2,2015,3,4\nN1,2015,5,6\n",
                "___npi,year,a,b\nN3,2014,7,8\nN1,2016,9,9\n",
            ],
        );
        let config = CubeConfig::new(inputs, dir.path().join("out"));
        let scan = Scanner::new(&config).scan().unwrap();

        assert_eq!(scan.keys.labels(), &["N2", "N1", "N3"]);
        assert_eq!(scan.times.labels(), &["2014", "2015", "2016"]);
        assert_eq!(scan.feature_names, vec!["a", "b"]);
        assert_eq!(scan.rows, 5);
        assert_eq!((scan.num_keys(), scan.num_times(), scan.num_features()), (3, 3, 2));
    }

    #[test]
    fn missing_key_column_in_a_later_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = write_inputs(
            &dir,
            &["___npi,year,a\nN1,2015,1\n", "___id,year,a\nN2,2015,1\n"],
        );
        let config = CubeConfig::new(inputs.clone(), dir.path().join("out"));
        let err = Scanner::new(&config).scan().unwrap_err();
        match err {
            IngestError::MissingColumn { path, column } => {
                assert_eq!(path, inputs[1]);
                assert_eq!(column, "npi");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn feature_width_must_match_first_file() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = write_inputs(
            &dir,
            &["___npi,year,a,b\nN1,2015,1,2\n", "___npi,year,a\nN2,2015,1\n"],
        );
        let config = CubeConfig::new(inputs, dir.path().join("out"));
        assert!(matches!(
            Scanner::new(&config).scan(),
            Err(IngestError::FeatureWidthMismatch { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn header_only_inputs_give_empty_axes() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = write_inputs(&dir, &["___npi,year,a,b\n"]);
        let config = CubeConfig::new(inputs, dir.path().join("out"));
        let scan = Scanner::new(&config).scan().unwrap();
        assert!(scan.keys.is_empty());
        assert!(scan.times.is_empty());
        assert_eq!(scan.num_features(), 2);
    }
}
