use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::MemeticoError;
use crate::types::{DynamicDepth, ModelKind, MutationPolicy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub kind: ModelKind,
    pub frac_depth: usize,
    pub branch_depth: usize,
    pub dynamic_depth: DynamicDepth,
    pub mutation: MutationPolicy,
    pub rand_lower: i64,
    pub rand_upper: i64,
    pub penalty: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::ContinuedFraction,
            frac_depth: 4,
            branch_depth: 1,
            dynamic_depth: DynamicDepth::None,
            mutation: MutationPolicy::HardSoft,
            rand_lower: 1,
            rand_upper: 30,
            penalty: 0.35,
        }
    }
}

impl ConfigSection for ModelConfig {
    fn section_name() -> &'static str {
        "model"
    }

    fn validate(&self) -> Result<(), MemeticoError> {
        if self.rand_lower > self.rand_upper {
            return Err(MemeticoError::Configuration(format!(
                "Coefficient range is empty: {} > {}",
                self.rand_lower, self.rand_upper
            )));
        }
        if !(self.penalty >= 0.0) || !self.penalty.is_finite() {
            return Err(MemeticoError::Configuration(
                "Penalty must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Model".to_string(),
            fields: vec![
                FieldManifest::new("kind", "string", serde_json::json!("cont-frac"), "Model shape: regression, cont-frac or branched"),
                FieldManifest::new("frac_depth", "integer", serde_json::json!(4), "Continued fraction depth"),
                FieldManifest::new("branch_depth", "integer", serde_json::json!(1), "Depth of each branched term"),
                FieldManifest::new("dynamic_depth", "string", serde_json::json!("none"), "Depth policy: none, adp, adp-mu or rnd"),
                FieldManifest::new("mutation", "string", serde_json::json!("hard-soft"), "Mutation policy: hard-soft or unique-mask"),
                FieldManifest::new("rand_lower", "integer", serde_json::json!(1), "Lowest random coefficient"),
                FieldManifest::new("rand_upper", "integer", serde_json::json!(30), "Highest random coefficient"),
                FieldManifest::new("penalty", "float", serde_json::json!(0.35), "Fitness penalty per active parameter")
                    .bounded(0.0, f64::MAX),
            ],
        }
    }
}
