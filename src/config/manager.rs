use super::{
    evolution::EvolutionConfig,
    model::ModelConfig,
    population::PopulationConfig,
    search::LocalSearchConfig,
    traits::{ConfigManifest, ConfigSection},
};
use crate::error::MemeticoError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Prefix of environment variables overriding configuration values,
/// e.g. `MEMETICO__EVOLUTION__SEED=7`
pub const ENV_PREFIX: &str = "MEMETICO";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub population: PopulationConfig,
    pub model: ModelConfig,
    pub local_search: LocalSearchConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), MemeticoError> {
        self.evolution.validate()?;
        self.population.validate()?;
        self.model.validate()?;
        self.local_search.validate()?;
        Ok(())
    }

    pub fn manifests(&self) -> Vec<ConfigManifest> {
        vec![
            self.evolution.to_manifest(),
            self.population.to_manifest(),
            self.model.to_manifest(),
            self.local_search.to_manifest(),
        ]
    }

    pub fn section_names() -> [&'static str; 4] {
        [
            EvolutionConfig::section_name(),
            PopulationConfig::section_name(),
            ModelConfig::section_name(),
            LocalSearchConfig::section_name(),
        ]
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, AppConfig> {
        self.config.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppConfig> {
        self.config.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), MemeticoError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MemeticoError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| MemeticoError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.write() = config;
        Ok(())
    }

    /// Defaults, then the optional TOML file, then environment variables
    /// starting with `env_prefix`.
    pub fn load_layered<P: AsRef<Path>>(
        &self,
        path: Option<P>,
        env_prefix: &str,
    ) -> Result<(), MemeticoError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path.as_ref())
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| MemeticoError::Configuration(format!("Failed to load config: {}", e)))?;

        config.validate()?;
        log::debug!("Loaded layered configuration: {:?}", config);

        *self.write() = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), MemeticoError> {
        let toml_str = toml::to_string_pretty(&*self.read())
            .map_err(|e| MemeticoError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| MemeticoError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.read().clone()
    }

    /// Apply `f` and keep the result only if it validates
    pub fn update<F>(&self, f: F) -> Result<(), MemeticoError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.write();
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiversityType, DynamicDepth};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("memetico-{}-{}.toml", name, std::process::id()))
    }

    #[test]
    fn test_round_trip_through_file() {
        let manager = ConfigManager::new();
        manager
            .update(|c| {
                c.evolution.generations = 12;
                c.evolution.diversity = DiversityType::StaleExtended;
                c.model.dynamic_depth = DynamicDepth::AdaptiveMutation;
            })
            .unwrap();

        let path = temp_path("round-trip");
        manager.save_to_file(&path).unwrap();

        let loaded = ConfigManager::new();
        loaded.load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.get(), manager.get());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = temp_path("partial");
        std::fs::write(&path, "[evolution]\nseed = 7\n\n[model]\nkind = \"regression\"\n").unwrap();

        let manager = ConfigManager::new();
        manager.load_layered(Some(&path), "MEMETICO_TEST_UNUSED").unwrap();
        std::fs::remove_file(&path).ok();

        let config = manager.get();
        assert_eq!(config.evolution.seed, 7);
        assert_eq!(config.evolution.generations, 200);
        assert_eq!(config.model.kind, crate::types::ModelKind::Regression);
        assert_eq!(config.population.degree, 3);
    }

    #[test]
    fn test_invalid_update_is_rejected() {
        let manager = ConfigManager::new();
        let result = manager.update(|c| c.population.degree = 0);
        assert!(result.is_err());
        assert_eq!(manager.get().population.degree, 3);
    }

    #[test]
    fn test_unknown_enum_name_fails_to_parse() {
        let path = temp_path("bad-enum");
        std::fs::write(&path, "[local_search]\nobjective = \"median\"\n").unwrap();
        let manager = ConfigManager::new();
        assert!(manager.load_from_file(&path).is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_manifests_cover_every_section() {
        let manifests = AppConfig::default().manifests();
        assert_eq!(manifests.len(), AppConfig::section_names().len());
        assert!(manifests.iter().all(|m| !m.fields.is_empty()));
    }
}
