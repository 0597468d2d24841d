use crate::data::DataSet;
use crate::error::{MemeticoError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use super::{
    types::{ColumnRole, DatasetMetadata},
    validator::DataValidator,
};

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into DataFrame
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| MemeticoError::DataLoading(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// Load, validate and convert a CSV file into a [`DataSet`]
    pub fn load_dataset<P: AsRef<Path>>(path: P, min_rows: Option<usize>) -> Result<DataSet> {
        let df = Self::load(&path)?;
        DataValidator::validate_minimum_rows(&df, min_rows.unwrap_or(1))?;
        let data = Self::to_dataset(&df)?;
        log::info!(
            "Loaded {} samples with {} variables from {}",
            data.sample_count(),
            data.iv_count(),
            path.as_ref().display()
        );
        Ok(data)
    }

    /// Split columns by role: `y` target, `w` weight, `dy` uncertainty,
    /// everything else an independent variable.
    pub fn to_dataset(df: &DataFrame) -> Result<DataSet> {
        DataValidator::validate_columns(df)?;

        let null_report = DataValidator::check_nulls(df)?;
        if !null_report.is_empty() {
            return Err(MemeticoError::DataLoading(format!(
                "Null values detected: {:?}",
                null_report
            )));
        }

        let mut ivs = Vec::new();
        let mut columns = Vec::new();
        let mut y = Vec::new();
        let mut weight = None;
        let mut uncertainty = None;

        for col_name in df.get_column_names() {
            let name = col_name.as_str();
            match ColumnRole::classify(name) {
                ColumnRole::Target => y = Self::column_values(df, name)?,
                ColumnRole::Weight => weight = Some(Self::column_values(df, name)?),
                ColumnRole::Uncertainty => uncertainty = Some(Self::column_values(df, name)?),
                ColumnRole::Derivative => {
                    log::warn!("Ignoring derivative column '{}'", name);
                }
                ColumnRole::Variable => {
                    ivs.push(name.to_string());
                    columns.push(Self::column_values(df, name)?);
                }
            }
        }

        DataSet::from_columns(ivs, columns, y, weight, uncertainty)
    }

    /// Inverse of [`Self::to_dataset`]: variables, then `y`, then `w` and
    /// `dy` when present.
    pub fn to_dataframe(data: &DataSet) -> Result<DataFrame> {
        let rows = 0..data.sample_count();
        let mut columns: Vec<Column> = data
            .ivs()
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let values: Vec<f64> = rows.clone().map(|i| data.sample(i)[j]).collect();
                Column::new(name.as_str().into(), values)
            })
            .collect();
        columns.push(Column::new("y".into(), data.targets().to_vec()));
        if data.has_weight() {
            let values: Vec<f64> = rows.clone().map(|i| data.weight(i)).collect();
            columns.push(Column::new("w".into(), values));
        }
        if data.has_uncertainty() {
            let values: Vec<f64> = rows.filter_map(|i| data.uncertainty(i)).collect();
            columns.push(Column::new("dy".into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Write a [`DataSet`] as CSV with a header row
    pub fn save_dataset<P: AsRef<Path>>(data: &DataSet, path: P) -> Result<()> {
        let mut df = Self::to_dataframe(data)?;
        let mut file = File::create(path.as_ref())?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| MemeticoError::DataLoading(format!("Failed to write CSV: {}", e)))?;
        log::debug!("Wrote {} samples to {}", data.sample_count(), path.as_ref().display());
        Ok(())
    }

    pub fn create_metadata<P: AsRef<Path>>(path: P, data: &DataSet) -> DatasetMetadata {
        let (min, max) = data
            .targets()
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let target_range = if data.sample_count() == 0 { (0.0, 0.0) } else { (min, max) };

        DatasetMetadata {
            file_path: path.as_ref().to_string_lossy().to_string(),
            num_rows: data.sample_count(),
            variables: data.ivs().to_vec(),
            has_weight: data.has_weight(),
            has_uncertainty: data.has_uncertainty(),
            target_range,
        }
    }

    fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
        let column = df.column(name)?.cast(&DataType::Float64)?;
        let values = column.f64()?;
        values
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| {
                    MemeticoError::DataLoading(format!("Null in column '{}' at row {}", name, row))
                })
            })
            .collect()
    }
}
