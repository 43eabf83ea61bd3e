//! Random sources for backoff jitter.
//!
//! Backoff computation draws one sample in `[-1, 1]` per call. The source is a
//! trait so tests and replay tooling can pin it down.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces jitter samples uniformly distributed in `[-1, 1]`.
pub trait JitterSource {
    fn sample(&self) -> f64;
}

impl<J: JitterSource + ?Sized> JitterSource for &J {
    fn sample(&self) -> f64 {
        (**self).sample()
    }
}

impl<J: JitterSource + ?Sized> JitterSource for Box<J> {
    fn sample(&self) -> f64 {
        (**self).sample()
    }
}

impl<J: JitterSource + ?Sized> JitterSource for std::sync::Arc<J> {
    fn sample(&self) -> f64 {
        (**self).sample()
    }
}

/// Draws from the thread-local generator. Safe to share across threads
/// without locking.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn sample(&self) -> f64 {
        rand::rng().random_range(-1.0..=1.0)
    }
}

/// Deterministic sequence from a fixed seed.
#[derive(Debug)]
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl JitterSource for SeededJitter {
    fn sample(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random_range(-1.0..=1.0)
    }
}

/// Always returns the same sample, clamped to `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedJitter(f64);

impl FixedJitter {
    /// No jitter at all.
    pub const NONE: FixedJitter = FixedJitter(0.0);

    pub fn new(sample: f64) -> Self {
        Self(if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) })
    }
}

impl JitterSource for FixedJitter {
    fn sample(&self) -> f64 {
        self.0
    }
}
