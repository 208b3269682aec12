//! Seeded reservoir sampling (algorithm R).
//!
//! Keeps a uniform sample of fixed capacity over a stream of unknown
//! length in one pass. The PRNG is seeded at construction, so a fixed
//! seed and input order reproduce the exact same sample.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fixed-capacity uniform sample of a stream.
#[derive(Debug, Clone)]
pub struct Reservoir<T> {
    capacity: usize,
    seen: u64,
    items: Vec<T>,
    rng: StdRng,
}

impl<T> Reservoir<T> {
    pub fn new(capacity: usize, seed: u64) -> Self {
        Self {
            capacity,
            seen: 0,
            items: Vec::with_capacity(capacity.min(64)),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Offer the next stream item; returns whether it entered the
    /// reservoir.
    pub fn offer(&mut self, item: T) -> bool {
        self.offer_with(|| item)
    }

    /// Like [`Reservoir::offer`] but only materializes the item if it is
    /// admitted. Useful when admission is cheap and the item is not.
    pub fn offer_with(&mut self, make: impl FnOnce() -> T) -> bool {
        self.seen += 1;
        if self.capacity == 0 {
            return false;
        }
        if self.items.len() < self.capacity {
            self.items.push(make());
            return true;
        }
        // Admit the i-th item (1-based) with probability capacity/i by
        // drawing a slot in [0, i); in-range draws replace that slot.
        let slot = self.rng.gen_range(0..self.seen);
        if (slot as usize) < self.capacity {
            self.items[slot as usize] = make();
            true
        } else {
            false
        }
    }

    /// Items currently held, in admission order.
    pub fn sample(&self) -> &[T] {
        &self.items
    }

    /// Total items offered so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the reservoir, yielding the held items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Deterministic merge: keep this reservoir's sample and top up from
    /// the other until capacity. Not a uniform union sample, but stable
    /// under repetition, which is what artifact diffing needs.
    pub fn absorb(&mut self, other: &Self)
    where
        T: Clone,
    {
        for item in &other.items {
            if self.items.len() >= self.capacity {
                break;
            }
            self.items.push(item.clone());
        }
        self.seen += other.seen;
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.seen = 0;
    }
}
