pub mod safe_ops;
pub mod objective;
#[cfg(feature = "gpu")]
pub mod accelerated;

pub use objective::Objective;
#[cfg(feature = "gpu")]
pub use accelerated::{accelerated_mse, FlatDataSet, PrefixProgram};
