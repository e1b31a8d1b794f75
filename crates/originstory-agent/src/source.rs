// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Probability sources sampled by the streaming loop.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Black-box producer of a `(p1, p2)` pair
pub trait ProbabilitySource: Send {
    fn sample(&mut self) -> (f64, f64);
}

impl<F> ProbabilitySource for F
where
    F: FnMut() -> (f64, f64) + Send,
{
    fn sample(&mut self) -> (f64, f64) {
        self()
    }
}

/// Uniform values in `[0, 1)`; stands in for real hardware
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbabilitySource for RandomSource {
    fn sample(&mut self) -> (f64, f64) {
        (self.rng.gen::<f64>(), self.rng.gen::<f64>())
    }
}

/// Always returns the same pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSource(pub f64, pub f64);

impl ProbabilitySource for FixedSource {
    fn sample(&mut self) -> (f64, f64) {
        (self.0, self.1)
    }
}
