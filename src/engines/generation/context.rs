use crate::config::AppConfig;
use crate::error::Result;
use crate::models::MaskRegistry;
use crate::utils::random::Randomness;

/// Depth assumed for the best solution before any has been found
pub const INITIAL_POCKET_DEPTH: usize = 1;

/// State shared by everything taking part in one run.
///
/// Passed by `&mut` wherever randomness is drawn, so a run is reproducible
/// from its seed and nothing outlives the population that owns it.
pub struct RunContext {
    pub random: Randomness,
    pub config: AppConfig,
    pub masks: MaskRegistry,
    /// Depth of the best solution so far, read by adaptive depth policies
    pub pocket_depth: usize,
    pub generation: usize,
}

impl RunContext {
    /// Context with both random sources seeded from `config.evolution.seed`
    pub fn new(config: AppConfig) -> Result<Self> {
        let random = Randomness::seeded(config.evolution.seed);
        Self::with_randomness(config, random)
    }

    pub fn with_randomness(config: AppConfig, random: Randomness) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            random,
            config,
            masks: MaskRegistry::new(),
            pocket_depth: INITIAL_POCKET_DEPTH,
            generation: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut config = AppConfig::default();
        config.population.degree = 0;
        assert!(RunContext::new(config).is_err());
    }

    #[test]
    fn test_same_seed_same_draws() {
        let mut a = RunContext::new(AppConfig::default()).unwrap();
        let mut b = RunContext::new(AppConfig::default()).unwrap();
        for _ in 0..10 {
            assert_eq!(a.random.int(0, 1000).unwrap(), b.random.int(0, 1000).unwrap());
        }
    }
}
