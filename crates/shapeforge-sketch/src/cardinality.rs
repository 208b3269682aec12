//! Distinct counting with a one-way exact→approximate transition.
//!
//! Small fields stay exact (a set of 64-bit hashes); once the distinct
//! count passes the configured threshold the set spills into a
//! HyperLogLog and never comes back. Because the sketch's registers are
//! a pure function of the hash set, the transition point does not affect
//! the final state: spilling early or late, or merging shards in any
//! order, lands on the same registers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::hll::HyperLogLog;
use crate::traits::Sketch;

/// Which regime a [`CardinalityCounter`] is operating in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistinctMode {
    Exact,
    Approximate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum State {
    Exact(BTreeSet<u64>),
    Approximate(HyperLogLog),
}

/// Distinct-value counter over pre-hashed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardinalityCounter {
    threshold: usize,
    precision: u8,
    state: State,
}

impl CardinalityCounter {
    /// Track up to `threshold` distinct hashes exactly, then downgrade
    /// to a HyperLogLog of the given precision.
    pub fn new(threshold: usize, precision: u8) -> Self {
        Self {
            threshold,
            precision,
            state: State::Exact(BTreeSet::new()),
        }
    }

    pub fn insert_hash(&mut self, hash: u64) {
        let overflowed = match &mut self.state {
            State::Exact(set) => {
                set.insert(hash);
                set.len() > self.threshold
            }
            State::Approximate(hll) => {
                hll.insert_hash(hash);
                false
            }
        };
        if overflowed {
            self.spill();
        }
    }

    /// Estimated distinct count: exact below the threshold, sketch-based
    /// above it.
    pub fn estimate(&self) -> u64 {
        match &self.state {
            State::Exact(set) => set.len() as u64,
            State::Approximate(hll) => hll.estimate().round() as u64,
        }
    }

    pub fn mode(&self) -> DistinctMode {
        match self.state {
            State::Exact(_) => DistinctMode::Exact,
            State::Approximate(_) => DistinctMode::Approximate,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.mode() == DistinctMode::Exact
    }

    pub fn is_empty(&self) -> bool {
        match &self.state {
            State::Exact(set) => set.is_empty(),
            State::Approximate(hll) => hll.is_empty(),
        }
    }

    fn spill(&mut self) {
        if let State::Exact(set) = &self.state {
            let mut hll = HyperLogLog::new(self.precision);
            for &hash in set {
                hll.insert_hash(hash);
            }
            self.state = State::Approximate(hll);
        }
    }
}

impl Sketch for CardinalityCounter {
    fn merge(&mut self, other: &Self) {
        if matches!(other.state, State::Approximate(_)) && self.is_exact() {
            self.spill();
        }
        let overflowed = match (&mut self.state, &other.state) {
            (State::Exact(set), State::Exact(other_set)) => {
                set.extend(other_set.iter().copied());
                set.len() > self.threshold
            }
            (State::Approximate(hll), State::Exact(other_set)) => {
                for &hash in other_set {
                    hll.insert_hash(hash);
                }
                false
            }
            (State::Approximate(hll), State::Approximate(other_hll)) => {
                hll.merge(other_hll);
                false
            }
            (State::Exact(_), State::Approximate(_)) => {
                unreachable!("exact state was spilled above")
            }
        };
        if overflowed {
            self.spill();
        }
    }

    fn clear(&mut self) {
        self.state = State::Exact(BTreeSet::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stable_hash;

    fn hash(i: u64) -> u64 {
        stable_hash(format!("item_{i}").as_bytes())
    }

    #[test]
    fn exact_below_threshold() {
        let mut counter = CardinalityCounter::new(64, 12);
        for i in 0..64 {
            counter.insert_hash(hash(i));
        }
        assert!(counter.is_exact());
        assert_eq!(counter.estimate(), 64);
    }

    #[test]
    fn downgrade_is_one_way() {
        let mut counter = CardinalityCounter::new(64, 12);
        for i in 0..65 {
            counter.insert_hash(hash(i));
        }
        assert_eq!(counter.mode(), DistinctMode::Approximate);

        // Re-inserting known hashes must not restore exact mode.
        counter.insert_hash(hash(0));
        assert_eq!(counter.mode(), DistinctMode::Approximate);
    }

    #[test]
    fn duplicates_stay_exact() {
        let mut counter = CardinalityCounter::new(4, 12);
        for _ in 0..1_000 {
            counter.insert_hash(hash(1));
            counter.insert_hash(hash(2));
        }
        assert!(counter.is_exact());
        assert_eq!(counter.estimate(), 2);
    }

    #[test]
    fn spill_point_does_not_change_final_state() {
        // Same hash set, different thresholds on the way in: once both
        // are approximate, the registers must be identical.
        let mut early = CardinalityCounter::new(8, 12);
        let mut late = CardinalityCounter::new(512, 12);
        for i in 0..1_000 {
            early.insert_hash(hash(i));
            late.insert_hash(hash(i));
        }
        assert_eq!(early.mode(), DistinctMode::Approximate);
        assert_eq!(late.mode(), DistinctMode::Approximate);
        assert_eq!(early.estimate(), late.estimate());
    }

    #[test]
    fn merge_exact_exact_within_threshold() {
        let mut a = CardinalityCounter::new(64, 12);
        let mut b = CardinalityCounter::new(64, 12);
        for i in 0..20 {
            a.insert_hash(hash(i));
        }
        for i in 10..30 {
            b.insert_hash(hash(i));
        }
        a.merge(&b);
        assert!(a.is_exact());
        assert_eq!(a.estimate(), 30);
    }

    #[test]
    fn merge_matches_single_stream() {
        let mut whole = CardinalityCounter::new(64, 12);
        let mut left = CardinalityCounter::new(64, 12);
        let mut right = CardinalityCounter::new(64, 12);
        for i in 0..2_000 {
            whole.insert_hash(hash(i));
            if i % 2 == 0 {
                left.insert_hash(hash(i));
            } else {
                right.insert_hash(hash(i));
            }
        }
        left.merge(&right);
        assert_eq!(left, whole);
    }

    #[test]
    fn merge_exact_into_approximate() {
        let mut small = CardinalityCounter::new(64, 12);
        for i in 0..10 {
            small.insert_hash(hash(i));
        }
        let mut big = CardinalityCounter::new(64, 12);
        for i in 0..500 {
            big.insert_hash(hash(i));
        }
        small.merge(&big);
        assert_eq!(small.mode(), DistinctMode::Approximate);
        assert_eq!(small, big);
    }
}
