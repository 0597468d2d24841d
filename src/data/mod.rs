pub mod dataset;
pub mod connectors;

pub use dataset::DataSet;
pub use connectors::{ColumnRole, CsvConnector, DatasetMetadata};
