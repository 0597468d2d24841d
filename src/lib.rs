//! Memetic search for continued-fraction regression models.
//!
//! A tree of agents evolves [`models::Candidate`] models against a
//! [`data::DataSet`], interleaving mutation and recombination with
//! Nelder-Mead refinement of the coefficients. Start from
//! [`engines::generation::Population`].

pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod models;
pub mod types;
pub mod utils;

pub use error::{MemeticoError, NumericError, Result};
