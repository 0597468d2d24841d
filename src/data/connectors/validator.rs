use crate::error::{MemeticoError, Result};
use polars::prelude::*;
use super::types::ColumnRole;

pub struct DataValidator;

impl DataValidator {
    /// Validate that the frame has exactly one target column, at least one
    /// variable column and only numeric columns
    pub fn validate_columns(df: &DataFrame) -> Result<()> {
        let columns = df.get_column_names();
        let targets = columns
            .iter()
            .filter(|c| ColumnRole::classify(c.as_str()) == ColumnRole::Target)
            .count();
        if targets != 1 {
            return Err(MemeticoError::DataLoading(format!(
                "Expected exactly one target column 'y', found {}",
                targets
            )));
        }
        if !columns
            .iter()
            .any(|c| ColumnRole::classify(c.as_str()) == ColumnRole::Variable)
        {
            return Err(MemeticoError::DataLoading(
                "No independent variable columns found".to_string(),
            ));
        }

        for col_name in columns {
            let series = df.column(col_name)?;
            if !matches!(series.dtype(), DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32 | DataType::UInt64 | DataType::UInt32) {
                return Err(MemeticoError::DataLoading(format!(
                    "Column '{}' must be numeric, found {:?}",
                    col_name,
                    series.dtype()
                )));
            }
        }

        Ok(())
    }

    /// Check for minimum required rows
    pub fn validate_minimum_rows(df: &DataFrame, min_rows: usize) -> Result<()> {
        if df.height() < min_rows {
            return Err(MemeticoError::DataLoading(format!(
                "Insufficient data: {} rows, minimum {} required",
                df.height(),
                min_rows
            )));
        }
        Ok(())
    }

    /// Columns containing nulls and how many
    pub fn check_nulls(df: &DataFrame) -> Result<Vec<(String, usize)>> {
        let mut null_report = Vec::new();

        for col_name in df.get_column_names() {
            let series = df.column(col_name)?;
            let null_count = series.null_count();
            if null_count > 0 {
                null_report.push((col_name.to_string(), null_count));
            }
        }

        Ok(null_report)
    }
}
