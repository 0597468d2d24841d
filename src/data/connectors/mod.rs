mod csv;
mod types;
mod validator;

pub use csv::CsvConnector;
pub use types::{ColumnRole, DatasetMetadata};
pub use validator::DataValidator;
