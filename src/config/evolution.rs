use super::traits::{check_unit_interval, ConfigManifest, ConfigSection, FieldManifest};
use crate::error::MemeticoError;
use crate::types::DiversityType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub seed: u64,
    pub generations: usize,
    pub mutate_rate: f64,
    pub stale_reset: usize,
    pub max_time_secs: u64,
    pub diversity: DiversityType,
    pub diversity_count: usize,
    pub local_search_interval: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            generations: 200,
            mutate_rate: 0.2,
            stale_reset: 5,
            max_time_secs: 600,
            diversity: DiversityType::None,
            diversity_count: 3,
            local_search_interval: 1,
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), MemeticoError> {
        check_unit_interval("Mutate rate", self.mutate_rate)?;
        if self.stale_reset == 0 {
            return Err(MemeticoError::Configuration(
                "Stale reset must be at least 1".to_string(),
            ));
        }
        if self.local_search_interval == 0 {
            return Err(MemeticoError::Configuration(
                "Local search interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Evolution".to_string(),
            fields: vec![
                FieldManifest::new("seed", "integer", serde_json::json!(42), "Seed for both random sources"),
                FieldManifest::new("generations", "integer", serde_json::json!(200), "Generations to run"),
                FieldManifest::new("mutate_rate", "float", serde_json::json!(0.2), "Probability an agent's current solution mutates")
                    .bounded(0.0, 1.0),
                FieldManifest::new("stale_reset", "integer", serde_json::json!(5), "Generations without improvement before the root is renewed")
                    .bounded(1.0, f64::MAX),
                FieldManifest::new("max_time_secs", "integer", serde_json::json!(600), "Wall clock limit checked between generations"),
                FieldManifest::new("diversity", "string", serde_json::json!("none"), "Diversity method: none, every, stale or stale-ext"),
                FieldManifest::new("diversity_count", "integer", serde_json::json!(3), "Most similar pairs replaced per diversity pass"),
                FieldManifest::new("local_search_interval", "integer", serde_json::json!(1), "Run local search every n-th generation")
                    .bounded(1.0, f64::MAX),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(EvolutionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_mutate_rate_bounds() {
        let config = EvolutionConfig {
            mutate_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MemeticoError::Configuration(_))));
    }
}
