use rand::Rng;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Injectable randomness, in the same spirit as the `Clock` abstraction:
/// production code uses the thread RNG, tests script exact draw sequences.
pub trait RandomSource: Send + Sync {
    /// One uniform draw in `[0, 1)`.
    fn next_unit(&self) -> f64;

    /// Uniform index in `0..len`. Returns 0 when `len` is 0.
    fn pick_index(&self, len: usize) -> usize;
}

/// Thread-RNG backed source for production use.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&self) -> f64 {
        rand::rng().random::<f64>()
    }

    fn pick_index(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            rand::rng().random_range(0..len)
        }
    }
}

/// Scripted draws for tests. Once the script runs out, every further draw
/// returns `fallback` (high by default so chance-gated branches stay off).
#[derive(Debug)]
pub struct ScriptedRandom {
    draws: Mutex<VecDeque<f64>>,
    fallback: f64,
}

impl ScriptedRandom {
    #[must_use]
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: Mutex::new(draws.into_iter().collect()),
            fallback: 0.99,
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&self) -> f64 {
        self.draws
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or(self.fallback)
    }

    fn pick_index(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let unit = self.next_unit().clamp(0.0, 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = (unit * len as f64) as usize;
        index.min(len - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_random_stays_in_unit_range() {
        let source = ThreadRandom;
        for _ in 0..100 {
            let draw = source.next_unit();
            assert!((0.0..1.0).contains(&draw));
        }
    }

    #[test]
    fn scripted_draws_in_order_then_fallback() {
        let source = ScriptedRandom::new([0.1, 0.5]);
        assert!((source.next_unit() - 0.1).abs() < f64::EPSILON);
        assert!((source.next_unit() - 0.5).abs() < f64::EPSILON);
        assert!((source.next_unit() - 0.99).abs() < f64::EPSILON);
    }

    #[test]
    fn scripted_pick_index_maps_unit_to_range() {
        let source = ScriptedRandom::new([0.0, 0.5, 0.999]);
        assert_eq!(source.pick_index(4), 0);
        assert_eq!(source.pick_index(4), 2);
        assert_eq!(source.pick_index(4), 3);
    }
}
