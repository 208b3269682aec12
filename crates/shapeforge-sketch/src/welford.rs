//! Running min/max/mean/variance via Welford's online algorithm.

use serde::{Deserialize, Serialize};

use crate::traits::Sketch;

/// One-pass numeric moments. The mean/variance update is Welford's
/// recurrence; the merge is the parallel (Chan et al.) combination, so
/// shard-wise aggregation matches single-stream aggregation up to float
/// rounding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.mean = value;
            self.m2 = 0.0;
            self.min = value;
            self.max = value;
            return;
        }
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    /// Population variance.
    pub fn variance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.m2 / self.count as f64)
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}

impl Sketch for RunningStats {
    fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let total = self.count + other.count;
        let delta = other.mean - self.mean;
        let weight = other.count as f64 / total as f64;
        self.mean += delta * weight;
        self.m2 += other.m2
            + delta * delta * (self.count as f64 * other.count as f64)
                / total as f64;
        self.count = total;
        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_has_no_moments() {
        let stats = RunningStats::new();
        assert!(stats.is_empty());
        assert_eq!(stats.mean(), None);
        assert_eq!(stats.min(), None);
        assert_eq!(stats.variance(), None);
    }

    #[test]
    fn single_value() {
        let mut stats = RunningStats::new();
        stats.push(4.0);
        assert_eq!(stats.mean(), Some(4.0));
        assert_eq!(stats.min(), Some(4.0));
        assert_eq!(stats.max(), Some(4.0));
        assert_eq!(stats.variance(), Some(0.0));
    }

    #[test]
    fn mean_and_variance_match_closed_form() {
        let mut stats = RunningStats::new();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.push(v);
        }
        assert!(close(stats.mean().unwrap(), 5.0));
        assert!(close(stats.variance().unwrap(), 4.0));
        assert_eq!(stats.min(), Some(2.0));
        assert_eq!(stats.max(), Some(9.0));
    }

    #[test]
    fn stable_on_large_offsets() {
        // Naive sum-of-squares cancels catastrophically here.
        let mut stats = RunningStats::new();
        for i in 0..1_000 {
            stats.push(1e9 + f64::from(i % 10));
        }
        let var = stats.variance().unwrap();
        assert!((var - 8.25).abs() < 1e-3, "variance {var}");
    }

    #[test]
    fn merge_matches_single_stream() {
        let values: Vec<f64> = (0..500).map(|i| (i as f64).sin() * 10.0).collect();

        let mut whole = RunningStats::new();
        for &v in &values {
            whole.push(v);
        }

        let mut left = RunningStats::new();
        let mut right = RunningStats::new();
        for (i, &v) in values.iter().enumerate() {
            if i % 3 == 0 {
                left.push(v);
            } else {
                right.push(v);
            }
        }
        left.merge(&right);

        assert_eq!(left.count(), whole.count());
        assert!(close(left.mean().unwrap(), whole.mean().unwrap()));
        assert!(
            (left.variance().unwrap() - whole.variance().unwrap()).abs() < 1e-6
        );
        assert_eq!(left.min(), whole.min());
        assert_eq!(left.max(), whole.max());
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let mut stats = RunningStats::new();
        stats.push(1.0);
        stats.push(3.0);
        let snapshot = stats;
        stats.merge(&RunningStats::new());
        assert_eq!(stats, snapshot);

        let mut empty = RunningStats::new();
        empty.merge(&snapshot);
        assert_eq!(empty, snapshot);
    }
}
