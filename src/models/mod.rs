pub mod traits;
pub mod element;
pub mod regression;
pub mod continued_fraction;
pub mod branched;
pub mod candidate;
pub mod mutation;
pub mod depth;

pub use traits::{MemeticModel, MutationOutcome, UNKNOWN_FITNESS};
pub use element::Element;
pub use regression::Regression;
pub use continued_fraction::ContinuedFraction;
pub use branched::BranchedFraction;
pub use candidate::Candidate;
pub use mutation::{HardSoft, MaskRegistry, MutationStrategy, UniqueMask};
pub use depth::determine_depth;
