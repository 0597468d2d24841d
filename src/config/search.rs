use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::MemeticoError;
use crate::types::{LocalSearchKind, ObjectiveKind};
use serde::{Deserialize, Serialize};

/// Objective and local search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSearchConfig {
    pub method: LocalSearchKind,
    pub objective: ObjectiveKind,
    pub runs: usize,
    pub data_pct: f64,
    pub nelder_mead_moves: usize,
    pub nelder_mead_stale: usize,
}

impl Default for LocalSearchConfig {
    fn default() -> Self {
        Self {
            method: LocalSearchKind::NelderMead,
            objective: ObjectiveKind::Mse,
            runs: 4,
            data_pct: 1.0,
            nelder_mead_moves: 250,
            nelder_mead_stale: 10,
        }
    }
}

impl ConfigSection for LocalSearchConfig {
    fn section_name() -> &'static str {
        "local_search"
    }

    fn validate(&self) -> Result<(), MemeticoError> {
        if !(self.data_pct > 0.0 && self.data_pct <= 1.0) {
            return Err(MemeticoError::Configuration(
                "Local search data percentage must be in (0, 1]".to_string(),
            ));
        }
        if self.nelder_mead_stale == 0 {
            return Err(MemeticoError::Configuration(
                "Nelder-Mead stale limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Local search".to_string(),
            fields: vec![
                FieldManifest::new("method", "string", serde_json::json!("cnm"), "Local search: cnm, cnms or none"),
                FieldManifest::new("objective", "string", serde_json::json!("mse"), "Objective: mse, mae, rmse or nmse"),
                FieldManifest::new("runs", "integer", serde_json::json!(4), "Local search runs per agent member"),
                FieldManifest::new("data_pct", "float", serde_json::json!(1.0), "Share of samples used per local search run")
                    .bounded(0.0, 1.0),
                FieldManifest::new("nelder_mead_moves", "integer", serde_json::json!(250), "Simplex moves per run"),
                FieldManifest::new("nelder_mead_stale", "integer", serde_json::json!(10), "Moves without improvement before stopping")
                    .bounded(1.0, f64::MAX),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_pct_bounds() {
        for pct in [0.0, -0.5, 1.01, f64::NAN] {
            let config = LocalSearchConfig {
                data_pct: pct,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{} should be rejected", pct);
        }
        let config = LocalSearchConfig {
            data_pct: 0.25,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
