use crate::error::MemeticoError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How two parents' active sets are combined during recombination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecombineMethod {
    Union,               // AND of the parents' active flags
    Intersection,        // OR of the parents' active flags
    SymmetricDifference, // XOR of the parents' active flags
}

impl RecombineMethod {
    /// Map a drawn index in `0..=2` to a method
    pub fn from_index(index: i64) -> Self {
        match index {
            0 => RecombineMethod::Union,
            1 => RecombineMethod::Intersection,
            _ => RecombineMethod::SymmetricDifference,
        }
    }

    pub fn combine(&self, a: bool, b: bool) -> bool {
        match self {
            RecombineMethod::Union => a && b,
            RecombineMethod::Intersection => a || b,
            RecombineMethod::SymmetricDifference => a ^ b,
        }
    }
}

/// Policy deciding the depth of freshly built or hard-mutated fractions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum DynamicDepth {
    #[default]
    None,
    Adaptive,
    AdaptiveMutation,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum DiversityType {
    #[default]
    None,
    Every,
    Stale,
    StaleExtended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum ObjectiveKind {
    #[default]
    Mse,
    Mae,
    Rmse,
    Nmse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum LocalSearchKind {
    #[default]
    NelderMead,
    NelderMeadRestart,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum ModelKind {
    Regression,
    #[default]
    ContinuedFraction,
    Branched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum MutationPolicy {
    #[default]
    HardSoft,
    UniqueMask,
}

/// Implements the textual names used in configuration files and on the
/// command line.
macro_rules! named_enum {
    ($ty:ident, $what:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }

            pub fn names() -> &'static [&'static str] {
                &[$($name),+]
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = MemeticoError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    other => Err(MemeticoError::Configuration(format!(
                        "Unknown {} '{}', expected one of {:?}",
                        $what,
                        other,
                        $ty::names()
                    ))),
                }
            }
        }

        impl TryFrom<String> for $ty {
            type Error = MemeticoError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.as_str().to_string()
            }
        }
    };
}

named_enum!(DynamicDepth, "dynamic depth mode", {
    None => "none",
    Adaptive => "adp",
    AdaptiveMutation => "adp-mu",
    Random => "rnd",
});

named_enum!(DiversityType, "diversity method", {
    None => "none",
    Every => "every",
    Stale => "stale",
    StaleExtended => "stale-ext",
});

named_enum!(ObjectiveKind, "objective", {
    Mse => "mse",
    Mae => "mae",
    Rmse => "rmse",
    Nmse => "nmse",
});

named_enum!(LocalSearchKind, "local search method", {
    NelderMead => "cnm",
    NelderMeadRestart => "cnms",
    None => "none",
});

named_enum!(ModelKind, "model kind", {
    Regression => "regression",
    ContinuedFraction => "cont-frac",
    Branched => "branched",
});

named_enum!(MutationPolicy, "mutation policy", {
    HardSoft => "hard-soft",
    UniqueMask => "unique-mask",
});
