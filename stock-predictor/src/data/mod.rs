pub mod dataset;
pub mod loader;
pub mod types;

pub use dataset::{load_dataset, write_dataset};
pub use loader::{parse_point, LoaderError, RawWindow, SeriesLoader};
pub use types::{RawSeries, SeriesPoint};
