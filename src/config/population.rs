use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::MemeticoError;
use serde::{Deserialize, Serialize};

/// Shape of the agent tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub degree: usize,
    pub depth: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self { degree: 3, depth: 2 }
    }
}

impl PopulationConfig {
    /// Agents in a complete tree of this degree and depth
    pub fn agent_count(&self) -> usize {
        (0..=self.depth).map(|d| self.degree.pow(d as u32)).sum()
    }
}

impl ConfigSection for PopulationConfig {
    fn section_name() -> &'static str {
        "population"
    }

    fn validate(&self) -> Result<(), MemeticoError> {
        if self.degree == 0 {
            return Err(MemeticoError::Configuration(
                "Agent degree is not set before constructing agents".to_string(),
            ));
        }
        if self.depth > 8 {
            return Err(MemeticoError::Configuration(format!(
                "Population depth {} is too deep",
                self.depth
            )));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Population".to_string(),
            fields: vec![
                FieldManifest::new("degree", "integer", serde_json::json!(3), "Children per agent")
                    .bounded(1.0, f64::MAX),
                FieldManifest::new("depth", "integer", serde_json::json!(2), "Zero-based depth of the leaf agents")
                    .bounded(0.0, 8.0),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_count() {
        assert_eq!(PopulationConfig::default().agent_count(), 13);
        assert_eq!(PopulationConfig { degree: 2, depth: 3 }.agent_count(), 15);
        assert_eq!(PopulationConfig { degree: 1, depth: 3 }.agent_count(), 4);
        assert_eq!(PopulationConfig { degree: 3, depth: 0 }.agent_count(), 1);
    }

    #[test]
    fn test_zero_degree_rejected() {
        let config = PopulationConfig { degree: 0, depth: 2 };
        assert!(config.validate().is_err());
    }
}
