//! Binomial level generator.

use rand::prelude::*;
use thiserror::Error;

use crate::level_generator::LevelGenerator;

/// Errors that can occur when creating a [`Binomial`] level generator.
#[derive(Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum BinomialError {
    /// The maximum number of levels must be non-zero.
    #[error("max_level must be non-zero.")]
    ZeroMaxLevel,
    /// The probability `p` must be in the range `(0, 1)`.
    #[error("probability must be in (0, 1).")]
    InvalidProbability,
    /// Failed to initialize the random number generator.
    #[error("Failed to initialize the random number generator.")]
    RngInitFailed,
}

/// A level generator drawing from a binomial distribution.
///
/// With `total` levels available, each draw counts the successes of
/// `total - 1` independent trials of probability `p`, so a node occupies
/// `1 + Binomial(total - 1, p)` levels. Levels are drawn exactly once per
/// node creation; the random source is owned by the generator and is not
/// safe for unsynchronized concurrent use.
#[derive(Debug)]
pub struct Binomial {
    /// The total number of levels that are assumed to exist.
    total: usize,
    /// The per-trial success probability.
    p: f64,
    /// The random number generator.
    rng: SmallRng,
}

impl Binomial {
    /// Create a new binomial level generator with `total` number of levels
    /// and per-trial success probability `p`.
    ///
    /// # Errors
    ///
    /// `total` must be greater or equal to 1 and `p` must be strictly
    /// between 0 and 1.
    #[inline]
    pub fn new(total: usize, p: f64) -> Result<Self, BinomialError> {
        let rng = SmallRng::from_rng(thread_rng()).map_err(|_err| BinomialError::RngInitFailed)?;
        Self::with_rng(total, p, rng)
    }

    /// Create a generator with an explicit seed, making the sequence of
    /// levels reproducible.
    ///
    /// # Errors
    ///
    /// The same configuration requirements as [`Binomial::new`] apply.
    #[inline]
    pub fn seeded(total: usize, p: f64, seed: u64) -> Result<Self, BinomialError> {
        Self::with_rng(total, p, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(total: usize, p: f64, rng: SmallRng) -> Result<Self, BinomialError> {
        if total == 0 {
            return Err(BinomialError::ZeroMaxLevel);
        }
        if !(0.0 < p && p < 1.0) {
            return Err(BinomialError::InvalidProbability);
        }
        Ok(Binomial { total, p, rng })
    }

    /// The per-trial success probability.
    #[must_use]
    pub fn probability(&self) -> f64 {
        self.p
    }
}

impl LevelGenerator for Binomial {
    #[inline]
    fn total(&self) -> usize {
        self.total
    }

    #[inline]
    fn random(&mut self) -> usize {
        let mut level = 0;
        for _ in 1..self.total {
            if self.rng.gen_bool(self.p) {
                level += 1;
            }
        }
        level
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, bail};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{Binomial, BinomialError};
    use crate::level_generator::LevelGenerator;

    #[test]
    fn invalid_max_level() {
        assert_eq!(Binomial::new(0, 0.5).err(), Some(BinomialError::ZeroMaxLevel));
        assert_eq!(
            Binomial::seeded(0, 0.5, 0).err(),
            Some(BinomialError::ZeroMaxLevel)
        );
    }

    #[rstest]
    fn invalid_probability(#[values(0.0, 1.0, -0.5, 1.5, f64::NAN)] p: f64) {
        assert_eq!(
            Binomial::new(1, p).err(),
            Some(BinomialError::InvalidProbability)
        );
    }

    #[rstest]
    fn level_within_bounds(
        #[values(1, 2, 16, 128)] total: usize,
        #[values(0.01, 0.5, 0.99)] p: f64,
    ) -> Result<()> {
        let mut generator = Binomial::seeded(total, p, 0x5eed)?;
        assert_eq!(generator.total(), total);
        for _ in 0..10_000 {
            let level = generator.random();
            if !(0..total).contains(&level) {
                bail!("level {} outside [0, {})", level, total);
            }
        }
        Ok(())
    }

    #[test]
    fn single_level_is_always_zero() -> Result<()> {
        let mut generator = Binomial::seeded(1, 0.5, 7)?;
        for _ in 0..100 {
            assert_eq!(generator.random(), 0);
        }
        Ok(())
    }

    #[test]
    fn seeded_is_reproducible() -> Result<()> {
        let mut a = Binomial::seeded(16, 0.5, 0xdead_beef)?;
        let mut b = Binomial::seeded(16, 0.5, 0xdead_beef)?;
        for _ in 0..1_000 {
            assert_eq!(a.random(), b.random());
        }
        Ok(())
    }

    #[test]
    fn mean_matches_binomial_expectation() -> Result<()> {
        // 16 trials at p = 0.5: the mean over many draws should sit near 8.
        let mut generator = Binomial::seeded(17, 0.5, 42)?;
        let draws = 100_000;
        let sum: usize = (0..draws).map(|_| generator.random()).sum();
        let mean = sum as f64 / draws as f64;
        assert!((7.5..=8.5).contains(&mean), "mean was {mean}");
        Ok(())
    }
}
