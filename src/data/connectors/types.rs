use serde::{Deserialize, Serialize};

/// What a CSV column holds, decided by its header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRole {
    Target,      // y
    Weight,      // w
    Uncertainty, // dy
    Derivative,  // yd, ydd, yddd
    Variable,    // anything else
}

impl ColumnRole {
    pub fn classify(header: &str) -> Self {
        match header.trim().to_ascii_lowercase().as_str() {
            "y" => Self::Target,
            "w" => Self::Weight,
            "dy" => Self::Uncertainty,
            "yd" | "ydd" | "yddd" => Self::Derivative,
            _ => Self::Variable,
        }
    }
}

/// Summary of a loaded dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub file_path: String,
    pub num_rows: usize,
    pub variables: Vec<String>,
    pub has_weight: bool,
    pub has_uncertainty: bool,
    pub target_range: (f64, f64), // (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_headers() {
        assert_eq!(ColumnRole::classify("y"), ColumnRole::Target);
        assert_eq!(ColumnRole::classify(" Y "), ColumnRole::Target);
        assert_eq!(ColumnRole::classify("w"), ColumnRole::Weight);
        assert_eq!(ColumnRole::classify("dy"), ColumnRole::Uncertainty);
        assert_eq!(ColumnRole::classify("ydd"), ColumnRole::Derivative);
        assert_eq!(ColumnRole::classify("x"), ColumnRole::Variable);
        assert_eq!(ColumnRole::classify("yield"), ColumnRole::Variable);
    }
}
