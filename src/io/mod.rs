//! File collaborators: CSV loaders for the three line exports, the dataset
//! writer and timestamp parsing shared by both and by the CLI.

pub mod loader;
pub mod timestamp;
pub mod writer;

pub use loader::{
    load_batch_registry, load_cooking_metrics, load_faulty_intervals, CsvFormat, LoadError,
    LoadReport,
};
pub use timestamp::{parse_timestamp, TimestampParseError};
pub use writer::{write_dataset, write_dataset_to_path, WriteError};
