pub mod traits;
pub mod evolution;
pub mod population;
pub mod model;
pub mod search;
pub mod manager;

pub use manager::{AppConfig, ConfigManager, ENV_PREFIX};
pub use evolution::EvolutionConfig;
pub use population::PopulationConfig;
pub use model::ModelConfig;
pub use search::LocalSearchConfig;
pub use traits::{ConfigManifest, ConfigSection, FieldManifest};
