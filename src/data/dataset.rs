use crate::error::{MemeticoError, Result};
use crate::utils::random::Randomness;

/// Training samples: one row of independent variables per target value,
/// with optional per-sample weight and uncertainty.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    ivs: Vec<String>,
    x: Vec<Vec<f64>>,
    y: Vec<f64>,
    weight: Option<Vec<f64>>,
    uncertainty: Option<Vec<f64>>,
}

impl DataSet {
    /// Build from row-major samples
    pub fn from_rows(ivs: Vec<String>, rows: Vec<Vec<f64>>, y: Vec<f64>) -> Result<Self> {
        Self::new(ivs, rows, y, None, None)
    }

    /// Build from one vector per variable
    pub fn from_columns(
        ivs: Vec<String>,
        columns: Vec<Vec<f64>>,
        y: Vec<f64>,
        weight: Option<Vec<f64>>,
        uncertainty: Option<Vec<f64>>,
    ) -> Result<Self> {
        if columns.len() != ivs.len() {
            return Err(MemeticoError::Validation(format!(
                "{} variable names for {} columns",
                ivs.len(),
                columns.len()
            )));
        }
        if let Some(column) = columns.iter().find(|c| c.len() != y.len()) {
            return Err(MemeticoError::Validation(format!(
                "Column of {} values does not match {} targets",
                column.len(),
                y.len()
            )));
        }
        let rows = (0..y.len())
            .map(|i| columns.iter().map(|c| c[i]).collect())
            .collect();
        Self::new(ivs, rows, y, weight, uncertainty)
    }

    pub fn new(
        ivs: Vec<String>,
        x: Vec<Vec<f64>>,
        y: Vec<f64>,
        weight: Option<Vec<f64>>,
        uncertainty: Option<Vec<f64>>,
    ) -> Result<Self> {
        if x.len() != y.len() {
            return Err(MemeticoError::Validation(format!(
                "{} samples but {} targets",
                x.len(),
                y.len()
            )));
        }
        if let Some(row) = x.iter().position(|row| row.len() != ivs.len()) {
            return Err(MemeticoError::Validation(format!(
                "Sample {} has {} values, expected {}",
                row,
                x[row].len(),
                ivs.len()
            )));
        }
        for (name, extra) in [("weight", &weight), ("uncertainty", &uncertainty)] {
            if let Some(values) = extra {
                if values.len() != y.len() {
                    return Err(MemeticoError::Validation(format!(
                        "{} {} values for {} samples",
                        values.len(),
                        name,
                        y.len()
                    )));
                }
            }
        }
        Ok(Self {
            ivs,
            x,
            y,
            weight,
            uncertainty,
        })
    }

    pub fn sample_count(&self) -> usize {
        self.y.len()
    }

    pub fn iv_count(&self) -> usize {
        self.ivs.len()
    }

    pub fn ivs(&self) -> &[String] {
        &self.ivs
    }

    pub fn sample(&self, index: usize) -> &[f64] {
        &self.x[index]
    }

    pub fn target(&self, index: usize) -> f64 {
        self.y[index]
    }

    pub fn targets(&self) -> &[f64] {
        &self.y
    }

    /// Weight of a sample, `1` when the dataset carries none
    pub fn weight(&self, index: usize) -> f64 {
        self.weight.as_ref().map_or(1.0, |w| w[index])
    }

    pub fn uncertainty(&self, index: usize) -> Option<f64> {
        self.uncertainty.as_ref().map(|u| u[index])
    }

    pub fn has_weight(&self) -> bool {
        self.weight.is_some()
    }

    pub fn has_uncertainty(&self) -> bool {
        self.uncertainty.is_some()
    }

    pub fn all_indices(&self) -> Vec<usize> {
        (0..self.sample_count()).collect()
    }

    /// `floor(pct * n)` distinct sample indices chosen uniformly, at least one.
    ///
    /// The full set is returned without drawing when the share covers every
    /// sample.
    pub fn subset(&self, pct: f64, random: &mut Randomness) -> Result<Vec<usize>> {
        if !(pct > 0.0 && pct <= 1.0) {
            return Err(MemeticoError::Configuration(format!(
                "Subset share {} must be in (0, 1]",
                pct
            )));
        }
        let n = self.sample_count();
        let count = ((pct * n as f64).floor() as usize).max(1).min(n);
        if count == n {
            return Ok(self.all_indices());
        }
        random.unique_indices(count, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> DataSet {
        DataSet::from_columns(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]],
            vec![0.1, 0.2, 0.3, 0.4],
            Some(vec![1.0, 2.0, 1.0, 2.0]),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_accessors() {
        let data = small();
        assert_eq!(data.sample_count(), 4);
        assert_eq!(data.iv_count(), 2);
        assert_eq!(data.sample(2), &[3.0, 7.0]);
        assert_eq!(data.target(3), 0.4);
        assert_eq!(data.weight(1), 2.0);
        assert_eq!(data.uncertainty(1), None);
    }

    #[test]
    fn test_default_weight_is_one() {
        let data = DataSet::from_rows(vec!["x".to_string()], vec![vec![1.0], vec![2.0]], vec![3.0, 4.0]).unwrap();
        assert_eq!(data.weight(0), 1.0);
        assert!(!data.has_weight());
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let result = DataSet::from_rows(vec!["x".to_string()], vec![vec![1.0, 2.0]], vec![3.0]);
        assert!(result.is_err());
        let result = DataSet::from_rows(vec!["x".to_string()], vec![vec![1.0]], vec![3.0, 4.0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_subset_sizes() {
        let data = small();
        let mut random = Randomness::seeded(11);
        assert_eq!(data.subset(1.0, &mut random).unwrap(), vec![0, 1, 2, 3]);

        let half = data.subset(0.5, &mut random).unwrap();
        assert_eq!(half.len(), 2);
        assert!(half[0] != half[1]);

        assert_eq!(data.subset(0.1, &mut random).unwrap().len(), 1);
        assert!(data.subset(0.0, &mut random).is_err());
    }
}
