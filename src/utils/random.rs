//! Injectable random sources.
//!
//! Every random draw in a run goes through one bounded-integer source and one
//! bounded-real source. Runs are reproducible given a seed and a fixed call
//! order, and tests can replace either source with a scripted sequence.

use crate::error::{MemeticoError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Draws integers uniformly from an inclusive range
pub trait IntSource: Send {
    fn rand_int(&mut self, min: i64, max: i64) -> Result<i64>;
}

/// Draws reals uniformly from a half-open range
pub trait RealSource: Send {
    fn rand_real(&mut self, min: f64, max: f64) -> Result<f64>;
}

fn check_int_range(min: i64, max: i64) -> Result<()> {
    if min > max {
        return Err(MemeticoError::InvalidRange {
            min: min as f64,
            max: max as f64,
        });
    }
    Ok(())
}

fn check_real_range(min: f64, max: f64) -> Result<()> {
    // Written so that NaN bounds are rejected too
    if !(min <= max) {
        return Err(MemeticoError::InvalidRange { min, max });
    }
    Ok(())
}

pub struct SeededInt {
    rng: StdRng,
}

impl SeededInt {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl IntSource for SeededInt {
    fn rand_int(&mut self, min: i64, max: i64) -> Result<i64> {
        check_int_range(min, max)?;
        Ok(self.rng.gen_range(min..=max))
    }
}

pub struct SeededReal {
    rng: StdRng,
}

impl SeededReal {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RealSource for SeededReal {
    fn rand_real(&mut self, min: f64, max: f64) -> Result<f64> {
        check_real_range(min, max)?;
        if min == max {
            return Ok(min);
        }
        Ok(self.rng.gen_range(min..max))
    }
}

/// Replays a fixed script of values, then falls back to a seeded generator.
///
/// A scripted value outside the requested range is reported as a
/// configuration error so a stale script fails loudly instead of silently
/// steering the run somewhere else.
pub struct SequenceSource<T> {
    script: VecDeque<T>,
    fallback_seed: u64,
    fallback: Option<StdRng>,
}

impl<T> SequenceSource<T> {
    pub fn new<I: IntoIterator<Item = T>>(script: I, fallback_seed: u64) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback_seed,
            fallback: None,
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    fn fallback(&mut self) -> &mut StdRng {
        let seed = self.fallback_seed;
        self.fallback.get_or_insert_with(|| StdRng::seed_from_u64(seed))
    }
}

impl IntSource for SequenceSource<i64> {
    fn rand_int(&mut self, min: i64, max: i64) -> Result<i64> {
        check_int_range(min, max)?;
        match self.script.pop_front() {
            Some(v) if v < min || v > max => Err(MemeticoError::Configuration(format!(
                "Scripted integer {} outside requested range [{}, {}]",
                v, min, max
            ))),
            Some(v) => Ok(v),
            None => Ok(self.fallback().gen_range(min..=max)),
        }
    }
}

impl RealSource for SequenceSource<f64> {
    fn rand_real(&mut self, min: f64, max: f64) -> Result<f64> {
        check_real_range(min, max)?;
        match self.script.pop_front() {
            Some(v) if v < min || v > max => Err(MemeticoError::Configuration(format!(
                "Scripted real {} outside requested range [{}, {}]",
                v, min, max
            ))),
            Some(v) => Ok(v),
            None if min == max => Ok(min),
            None => Ok(self.fallback().gen_range(min..max)),
        }
    }
}

/// Mixed into the seed of the real stream so it does not replay the int stream
const REAL_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// The pair of random sources used by one run
pub struct Randomness {
    ints: Box<dyn IntSource>,
    reals: Box<dyn RealSource>,
}

impl Randomness {
    pub fn seeded(seed: u64) -> Self {
        Self {
            ints: Box::new(SeededInt::new(seed)),
            reals: Box::new(SeededReal::new(seed ^ REAL_STREAM)),
        }
    }

    pub fn from_sources(ints: Box<dyn IntSource>, reals: Box<dyn RealSource>) -> Self {
        Self { ints, reals }
    }

    pub fn int(&mut self, min: i64, max: i64) -> Result<i64> {
        self.ints.rand_int(min, max)
    }

    pub fn real(&mut self, min: f64, max: f64) -> Result<f64> {
        self.reals.rand_real(min, max)
    }

    /// Index in `0..len`
    pub fn index(&mut self, len: usize) -> Result<usize> {
        if len == 0 {
            return Err(MemeticoError::InvalidRange { min: 0.0, max: -1.0 });
        }
        Ok(self.int(0, len as i64 - 1)? as usize)
    }

    pub fn coin(&mut self) -> Result<bool> {
        Ok(self.int(0, 1)? == 1)
    }

    pub fn chance(&mut self, probability: f64) -> Result<bool> {
        Ok(self.real(0.0, 1.0)? < probability)
    }

    /// `count` distinct indices in `0..len`, sorted ascending
    pub fn unique_indices(&mut self, count: usize, len: usize) -> Result<Vec<usize>> {
        let count = count.min(len);
        let mut pool: Vec<usize> = (0..len).collect();
        for i in 0..count {
            let j = self.int(i as i64, len as i64 - 1)? as usize;
            pool.swap(i, j);
        }
        pool.truncate(count);
        pool.sort_unstable();
        Ok(pool)
    }
}
