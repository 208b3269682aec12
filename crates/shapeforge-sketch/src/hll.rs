//! Dense HyperLogLog sketch over pre-hashed 64-bit values.
//!
//! The register array is a pure function of the *set* of hashes
//! inserted, so insertion order never affects the estimate and merging
//! two sketches (register-wise max) equals inserting the union.

use serde::{Deserialize, Serialize};

use crate::traits::Sketch;

/// Approximate distinct counter with `2^precision` one-byte registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HyperLogLog {
    precision: u8,
    registers: Vec<u8>,
}

impl HyperLogLog {
    /// Create a sketch with `2^precision` registers. Precision is
    /// clamped to the usable 4..=18 window.
    pub fn new(precision: u8) -> Self {
        let precision = precision.clamp(4, 18);
        Self {
            precision,
            registers: vec![0; 1 << precision],
        }
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Insert a pre-hashed value.
    pub fn insert_hash(&mut self, hash: u64) {
        let p = self.precision as u32;
        let index = (hash >> (64 - p)) as usize;
        // Rank of the first set bit in the remaining 64-p bits, 1-based;
        // an all-zero suffix ranks 64-p+1.
        let suffix = hash << p;
        let rank = if suffix == 0 {
            (64 - p + 1) as u8
        } else {
            (suffix.leading_zeros() + 1) as u8
        };
        if rank > self.registers[index] {
            self.registers[index] = rank;
        }
    }

    /// Estimated number of distinct hashes inserted.
    pub fn estimate(&self) -> f64 {
        let m = self.registers.len() as f64;
        let mut sum = 0.0;
        let mut zeros = 0usize;
        for &r in &self.registers {
            sum += 1.0 / (1u64 << r) as f64;
            if r == 0 {
                zeros += 1;
            }
        }
        let raw = alpha(self.registers.len()) * m * m / sum;

        // Linear counting handles the small range where HLL itself is
        // biased.
        if raw <= 2.5 * m && zeros > 0 {
            m * (m / zeros as f64).ln()
        } else {
            raw
        }
    }

    /// True when no hash has been inserted.
    pub fn is_empty(&self) -> bool {
        self.registers.iter().all(|&r| r == 0)
    }
}

impl Sketch for HyperLogLog {
    fn merge(&mut self, other: &Self) {
        debug_assert_eq!(
            self.precision, other.precision,
            "merging sketches of different precision"
        );
        if self.precision != other.precision {
            return;
        }
        for (a, b) in self.registers.iter_mut().zip(&other.registers) {
            if *b > *a {
                *a = *b;
            }
        }
    }

    fn clear(&mut self) {
        self.registers.fill(0);
    }
}

fn alpha(m: usize) -> f64 {
    match m {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / m as f64),
    }
}
