pub mod random;

pub use random::{IntSource, Randomness, RealSource, SeededInt, SeededReal, SequenceSource};
