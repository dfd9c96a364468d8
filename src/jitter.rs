//! Bounded random perturbation used by the market and logistics stages.
//!
//! Every random draw in the pipeline goes through a [`JitterSource`], so a
//! caller can swap the entropy-backed generator for a seeded or constant one.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait JitterSource: Send {
    /// Uniform sample in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Multiplicative factor in `[center - spread, center + spread)`.
    fn factor(&mut self, center: f64, spread: f64) -> f64 {
        center + (self.next_unit() * 2.0 * spread - spread)
    }

    /// Integer in `[lo, hi]`.
    fn int_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        let width = (hi - lo + 1) as f64;
        lo + ((self.next_unit() * width) as u32).min(hi - lo)
    }

    /// Index into a non-empty list of `len` items.
    fn pick(&mut self, len: usize) -> usize {
        ((self.next_unit() * len as f64) as usize).min(len.saturating_sub(1))
    }
}

/// Adapter over any `rand` generator.
pub struct RngJitter<R> {
    rng: R,
}

impl<R: Rng> RngJitter<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngJitter<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Seeded when a seed is configured, entropy-backed otherwise.
    pub fn for_request(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng + Send> JitterSource for RngJitter<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Always returns the same sample.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl FixedJitter {
    /// Makes every symmetric factor land exactly on its center.
    pub fn midpoint() -> Self {
        FixedJitter(0.5)
    }
}

impl JitterSource for FixedJitter {
    fn next_unit(&mut self) -> f64 {
        self.0
    }
}
