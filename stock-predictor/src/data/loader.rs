//! Loader for raw series files.
//!
//! Each record holds `<index-or-timestamp>,<value>[,...]`; the value is always
//! the second field. Records whose fields are all blank are ignored. Anchored
//! reads (`read_window`) count records and never parse the ones they skip.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

use super::types::{RawSeries, SeriesPoint};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl LoaderError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn parse(path: &Path, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}

/// Headerless, flexible-width reader with trimmed fields.
pub(crate) fn open_records(path: &Path) -> Result<csv::Reader<File>, LoaderError> {
    let file = File::open(path).map_err(|e| LoaderError::io(path, e))?;
    Ok(ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file))
}

/// 1-based line on which `record` starts.
pub(crate) fn record_line(record: &StringRecord) -> usize {
    record.position().map_or(0, |p| p.line() as usize)
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(str::is_empty)
}

/// A window of raw records read at a fixed offset.
#[derive(Debug, Clone)]
pub struct RawWindow {
    /// Records skipped before reading.
    pub skipped: usize,
    /// Values read after the skipped records, in order.
    pub values: Vec<f64>,
    /// Total records consumed (skipped plus read).
    pub records_consumed: usize,
}

/// Reader for raw series files.
pub struct SeriesLoader {
    path: PathBuf,
}

impl SeriesLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every non-blank record of the file.
    pub fn load(&self) -> Result<RawSeries, LoaderError> {
        let mut reader = open_records(&self.path)?;
        let mut points = Vec::new();

        for record in reader.records() {
            let record = record.map_err(|e| LoaderError::csv(&self.path, e))?;
            if is_blank(&record) {
                continue;
            }
            points.push(parse_point(&self.path, &record)?);
        }

        Ok(RawSeries::from_points(points).with_source(&self.path))
    }

    /// Skip `skip` records unparsed, then parse the value of the next
    /// `count` records.
    ///
    /// Stops early at end of file; callers compare `values.len()` against
    /// `count` to detect a short read.
    pub fn read_window(&self, skip: usize, count: usize) -> Result<RawWindow, LoaderError> {
        let mut reader = open_records(&self.path)?;
        let mut record = StringRecord::new();
        let mut skipped = 0;
        let mut values = Vec::with_capacity(count);

        while values.len() < count {
            let more = reader
                .read_record(&mut record)
                .map_err(|e| LoaderError::csv(&self.path, e))?;
            if !more {
                break;
            }
            if is_blank(&record) {
                continue;
            }
            if skipped < skip {
                skipped += 1;
            } else {
                values.push(parse_point(&self.path, &record)?.value);
            }
        }

        Ok(RawWindow {
            skipped,
            records_consumed: skipped + values.len(),
            values,
        })
    }
}

/// Parse one `<label>,<value>` record. The value must be a finite number.
pub fn parse_point(path: &Path, record: &StringRecord) -> Result<SeriesPoint, LoaderError> {
    let line = record_line(record);
    let label = record.get(0).unwrap_or_default();
    let raw_value = record
        .get(1)
        .ok_or_else(|| LoaderError::parse(path, line, "missing value column"))?;

    let value = raw_value.parse::<f64>().map_err(|e| {
        LoaderError::parse(path, line, format!("invalid value '{}': {}", raw_value, e))
    })?;
    if !value.is_finite() {
        return Err(LoaderError::parse(
            path,
            line,
            format!("non-finite value '{}'", raw_value),
        ));
    }

    Ok(SeriesPoint::new(label, value))
}
