//! Training dataset file.
//!
//! One headerless record per sample: W features followed by the target.

use std::fs::{self, File};
use std::path::Path;

use csv::WriterBuilder;

use crate::window::{SlidingWindowSample, TrainingDataset};

use super::loader::{open_records, record_line, LoaderError};

/// Write a dataset file, replacing any existing file at `path`.
pub fn write_dataset(path: &Path, dataset: &TrainingDataset) -> Result<(), LoaderError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| LoaderError::io(parent, e))?;
        }
    }

    let file = File::create(path).map_err(|e| LoaderError::io(path, e))?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    for sample in &dataset.samples {
        let record = sample
            .features
            .iter()
            .chain(std::iter::once(&sample.target))
            .map(|v| v.to_string());
        writer
            .write_record(record)
            .map_err(|e| LoaderError::csv(path, e))?;
    }

    writer.flush().map_err(|e| LoaderError::io(path, e))
}

/// Load a dataset file written for windows of `window_size` features.
///
/// Fields beyond the first `window_size + 1` are ignored.
pub fn load_dataset(path: &Path, window_size: usize) -> Result<TrainingDataset, LoaderError> {
    let mut reader = open_records(path)?;
    let mut samples = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| LoaderError::csv(path, e))?;
        let line = record_line(&record);

        if record.len() < window_size + 1 {
            return Err(LoaderError::parse(
                path,
                line,
                format!("expected {} values, got {}", window_size + 1, record.len()),
            ));
        }

        let values = record
            .iter()
            .take(window_size + 1)
            .map(|field| {
                field.parse::<f64>().map_err(|e| {
                    LoaderError::parse(path, line, format!("invalid value '{}': {}", field, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        samples.push(SlidingWindowSample {
            features: values[..window_size].to_vec(),
            target: values[window_size],
        });
    }

    Ok(TrainingDataset {
        window_size,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_dataset() -> TrainingDataset {
        TrainingDataset {
            window_size: 2,
            samples: vec![
                SlidingWindowSample {
                    features: vec![0.1, 0.5],
                    target: 0.3,
                },
                SlidingWindowSample {
                    features: vec![0.5, 0.3],
                    target: 0.7,
                },
            ],
        }
    }

    #[test]
    fn test_written_lines_hold_features_then_target() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/learning_data.csv");
        write_dataset(&path, &sample_dataset()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, vec!["0.1,0.5,0.3", "0.5,0.3,0.7"]);

        let loaded = load_dataset(&path, 2).unwrap();
        assert_eq!(loaded, sample_dataset());
    }

    #[test]
    fn test_load_accepts_spaced_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spaced.csv");
        fs::write(&path, "0.1, 0.9, 0.5\n").unwrap();

        let loaded = load_dataset(&path, 2).unwrap();
        assert_eq!(loaded.samples[0].features, vec![0.1, 0.9]);
        assert_eq!(loaded.samples[0].target, 0.5);
    }

    #[test]
    fn test_short_line_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.csv");
        fs::write(&path, "0.1,0.2,0.3\n0.4,0.5\n").unwrap();

        let err = load_dataset(&path, 2).unwrap_err();
        match err {
            LoaderError::Parse { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("expected 3 values"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_dataset_writes_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let dataset = TrainingDataset::empty(4);
        write_dataset(&path, &dataset).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        assert!(load_dataset(&path, 4).unwrap().is_empty());
    }
}
