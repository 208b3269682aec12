//! Deterministic whole-record sampling for the preview.
//!
//! A single seeded reservoir admits records uniformly over the full
//! stream; admitted records are stored already truncated so a slot's
//! memory footprint is bounded no matter what the record looked like.

use serde_json::Value;
use tracing::trace;

use crate::truncate::{self, TruncationPolicy};
use shapeforge_sketch::Reservoir;

/// One sampled record, tagged with its position in the input stream.
#[derive(Debug, Clone)]
pub struct SampleSlot {
    pub index: u64,
    pub record: Value,
}

/// Seeded reservoir of truncated records.
#[derive(Debug)]
pub struct RecordSampler {
    reservoir: Reservoir<SampleSlot>,
    policy: TruncationPolicy,
}

impl RecordSampler {
    pub fn new(capacity: usize, seed: u64, policy: TruncationPolicy) -> Self {
        Self {
            reservoir: Reservoir::new(capacity, seed),
            policy,
        }
    }

    /// Offer a record; truncation only happens when the record is
    /// admitted. Returns whether it entered the reservoir.
    pub fn maybe_sample(&mut self, record: &Value, index: u64) -> bool {
        let policy = &self.policy;
        self.reservoir.offer_with(|| {
            let truncated = truncate::truncate(record, policy);
            if !truncated.annotations.is_empty() {
                trace!(
                    index,
                    cuts = truncated.annotations.len(),
                    "record truncated for preview"
                );
            }
            SampleSlot {
                index,
                record: truncated.value,
            }
        })
    }

    /// Records offered so far.
    pub fn seen(&self) -> u64 {
        self.reservoir.seen()
    }

    /// Current sample ordered by original record index.
    pub fn snapshot(&self) -> Vec<&SampleSlot> {
        let mut slots: Vec<&SampleSlot> =
            self.reservoir.sample().iter().collect();
        slots.sort_by_key(|s| s.index);
        slots
    }

    /// Consume the sampler, yielding slots ordered by record index.
    pub fn into_slots(self) -> Vec<SampleSlot> {
        let mut slots = self.reservoir.into_items();
        slots.sort_by_key(|s| s.index);
        slots
    }
}
