//! Panel file reading: header layout and row access.
//!
//! Both passes read inputs through [`PanelReader`] so they agree on how the
//! header is cleaned and which cells are features.

use std::fs::File;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use csv::StringRecord;

use crate::config::CubeConfig;
use crate::error::{IngestError, IngestResult};

/// Column positions of one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    pub key_index: usize,
    pub time_index: usize,
    /// Positions of feature cells, in header order.
    pub feature_indices: Vec<usize>,
    pub feature_names: Vec<String>,
}

impl HeaderLayout {
    pub fn from_header(path: &Path, header: &StringRecord, config: &CubeConfig) -> IngestResult<Self> {
        let names = clean_header(header, config);

        // Repeated names resolve to their last position.
        let positions: AHashMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        let lookup = |column: &str| {
            positions
                .get(column)
                .copied()
                .ok_or_else(|| IngestError::MissingColumn {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                })
        };
        let key_index = lookup(&config.key_column)?;
        let time_index = lookup(&config.time_column)?;

        let (feature_indices, feature_names) = names
            .iter()
            .enumerate()
            .filter(|(_, name)| {
                **name != config.key_column
                    && **name != config.time_column
                    && !config.ignore_columns.iter().any(|c| c == *name)
            })
            .map(|(i, name)| (i, name.clone()))
            .unzip();

        Ok(Self {
            key_index,
            time_index,
            feature_indices,
            feature_names,
        })
    }

    pub fn feature_count(&self) -> usize {
        self.feature_indices.len()
    }
}

/// Header cell names, with the configured prefix dropped from the first one.
pub fn clean_header(header: &StringRecord, config: &CubeConfig) -> Vec<String> {
    header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            if i == 0 && config.strip_header_prefix {
                cell.chars().skip(config.header_prefix_len).collect()
            } else {
                cell.to_string()
            }
        })
        .collect()
}

/// One data row, viewed through its file's layout.
pub struct Row<'a> {
    record: &'a StringRecord,
    layout: &'a HeaderLayout,
    pub line: u64,
}

impl<'a> Row<'a> {
    pub fn key(&self) -> &'a str {
        self.record.get(self.layout.key_index).unwrap_or_default()
    }

    pub fn time(&self) -> &'a str {
        self.record.get(self.layout.time_index).unwrap_or_default()
    }

    /// (feature position, column name, raw cell) in header order.
    pub fn features(&self) -> impl Iterator<Item = (usize, &'a str, &'a str)> + 'a {
        let (record, layout) = (self.record, self.layout);
        layout
            .feature_indices
            .iter()
            .zip(&layout.feature_names)
            .enumerate()
            .map(move |(j, (&i, name))| (j, name.as_str(), record.get(i).unwrap_or_default()))
    }
}

pub struct PanelReader {
    path: PathBuf,
    reader: csv::Reader<File>,
    layout: HeaderLayout,
    record: StringRecord,
    rows: u64,
}

impl PanelReader {
    pub fn open(path: &Path, config: &CubeConfig) -> IngestResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(config.delimiter_byte())
            .has_headers(false)
            .from_path(path)
            .map_err(|e| IngestError::csv(path, e))?;

        let mut header = StringRecord::new();
        let has_header = reader
            .read_record(&mut header)
            .map_err(|e| IngestError::csv(path, e))?;
        if !has_header {
            return Err(IngestError::MissingHeader {
                path: path.to_path_buf(),
            });
        }
        let layout = HeaderLayout::from_header(path, &header, config)?;

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            layout,
            record: StringRecord::new(),
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> &HeaderLayout {
        &self.layout
    }

    /// Data rows read so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn next_row(&mut self) -> IngestResult<Option<Row<'_>>> {
        let more = self
            .reader
            .read_record(&mut self.record)
            .map_err(|e| IngestError::csv(&self.path, e))?;
        if !more {
            return Ok(None);
        }
        self.rows += 1;
        let line = self.record.position().map_or(0, |p| p.line());
        Ok(Some(Row {
            record: &self.record,
            layout: &self.layout,
            line,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config() -> CubeConfig {
        CubeConfig::new(vec![], "out")
    }

    #[test]
    fn prefix_is_stripped_from_first_cell_only() {
        let header = StringRecord::from(vec!["\u{feff}xxnpi", "year", "a"]);
        assert_eq!(clean_header(&header, &config()), vec!["npi", "year", "a"]);

        let mut keep = config();
        keep.strip_header_prefix = false;
        assert_eq!(clean_header(&header, &keep)[0], "\u{feff}xxnpi");

        // Shorter than the prefix: nothing left.
        let tiny = StringRecord::from(vec!["ab", "year"]);
        assert_eq!(clean_header(&tiny, &config())[0], "");
    }

    #[test]
    fn layout_skips_key_time_and_ignored_columns() {
        let header = StringRecord::from(vec!["___a", "npi", "b", "year", "state", "c"]);
        let mut cfg = config();
        cfg.ignore_columns = vec!["state".to_string()];
        let layout = HeaderLayout::from_header(Path::new("x.csv"), &header, &cfg).unwrap();
        assert_eq!(layout.key_index, 1);
        assert_eq!(layout.time_index, 3);
        assert_eq!(layout.feature_indices, vec![0, 2, 5]);
        assert_eq!(layout.feature_names, vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_time_column_names_the_file() {
        let header = StringRecord::from(vec!["___npi", "period", "a"]);
        let err = HeaderLayout::from_header(Path::new("x.csv"), &header, &config()).unwrap_err();
        match err {
            IngestError::MissingColumn { path, column } => {
                assert_eq!(path, PathBuf::from("x.csv"));
                assert_eq!(column, "year");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rows_expose_key_time_and_features() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "___npi,year,a,b\nN1,2015,1,2\nN2,2016,3.5,x\n").unwrap();

        let mut reader = PanelReader::open(file.path(), &config()).unwrap();
        let row = reader.next_row().unwrap().unwrap();
        assert_eq!((row.key(), row.time(), row.line), ("N1", "2015", 2));
        let cells: Vec<_> = row.features().collect();
        assert_eq!(cells, vec![(0, "a", "1"), (1, "b", "2")]);

        let row = reader.next_row().unwrap().unwrap();
        assert_eq!(row.features().nth(1), Some((1, "b", "x")));
        assert!(reader.next_row().unwrap().is_none());
        assert_eq!(reader.rows(), 2);
    }

    #[test]
    fn empty_file_has_no_header() {
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            PanelReader::open(file.path(), &config()),
            Err(IngestError::MissingHeader { .. })
        ));
    }

    #[test]
    fn ragged_rows_are_fatal() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "___npi,year,a\nN1,2015\n").unwrap();
        let mut reader = PanelReader::open(file.path(), &config()).unwrap();
        assert!(matches!(reader.next_row(), Err(IngestError::Csv { .. })));
    }
}
