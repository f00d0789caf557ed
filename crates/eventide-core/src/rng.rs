//! Deterministic random number generator
//!
//! Random value sources (`ChangeVariables` random ranges, random move steps)
//! draw from this generator so a fixed seed replays identically. Never reach
//! for an OS entropy source inside command execution.

use serde::{Deserialize, Serialize};

/// A deterministic xorshift64 generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRng {
    state: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        // xorshift requires a non-zero state
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Get the current state (for saving)
    pub fn state(&self) -> u64 {
        self.state
    }

    /// Generate the next raw u64 value
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Generate a random f64 in range [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() as f64) / (u64::MAX as f64 + 1.0)
    }

    /// Generate a random i64 in range [min, max]
    pub fn range_i64(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let range = (max - min + 1) as u64;
        min + (self.next_u64() % range) as i64
    }

    /// Generate a random f64 in range [min, max)
    pub fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Pick a random element from a slice
    pub fn pick<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let i = (self.next_u64() as usize) % slice.len();
            Some(&slice[i])
        }
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::new(0x5eed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let mut a = GameRng::new(7);
        let mut b = GameRng::new(7);
        for _ in 0..64 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn test_ranges() {
        let mut rng = GameRng::new(7);
        for _ in 0..100 {
            let i = rng.range_i64(-3, 3);
            assert!((-3..=3).contains(&i));
        }
        assert_eq!(rng.range_i64(5, 5), 5);
        assert_eq!(rng.range_i64(5, 2), 5);
    }
}
