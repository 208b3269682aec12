//! Streaming summary structures for the shape engine.
//!
//! Everything here is a one-pass, bounded-memory summary with an
//! explicit merge operation, so that partial summaries built over
//! disjoint shards of a stream combine into the same state the whole
//! stream would have produced:
//!
//! - [`Reservoir`]: seeded uniform sampling of a stream of unknown length
//! - [`HyperLogLog`]: approximate distinct counting in fixed memory
//! - [`RunningStats`]: numerically stable min/max/mean/variance
//! - [`CardinalityCounter`]: exact distinct counting that downgrades to
//!   a sketch once, and only once, past a threshold
//!
//! All randomness is seed-driven and all hashing is platform-stable
//! (xxh64), so the same seed and input order reproduce bit-identical
//! state.

mod cardinality;
mod hll;
mod reservoir;
mod traits;
mod welford;

pub use cardinality::{CardinalityCounter, DistinctMode};
pub use hll::HyperLogLog;
pub use reservoir::Reservoir;
pub use traits::Sketch;
pub use welford::RunningStats;

/// Platform-stable 64-bit hash used by the sketches.
pub fn stable_hash(bytes: &[u8]) -> u64 {
    xxhash_rust::xxh64::xxh64(bytes, 0)
}
