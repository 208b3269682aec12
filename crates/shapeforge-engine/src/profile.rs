//! Per-field statistics aggregation.
//!
//! One [`FieldStats`] per observed field path, updated in O(1) per leaf
//! and bounded by the example reservoir capacity — memory never grows
//! with record count, only with the number of distinct paths. Stats for
//! the same path merge as a commutative monoid, so shard-wise
//! aggregation lands on the same state as single-stream aggregation.

use std::collections::BTreeMap;

use serde_json::Value;

use shapeforge_config::ShapeEngineConfig;
use shapeforge_sketch::{
    CardinalityCounter, DistinctMode, Reservoir, RunningStats, Sketch,
    stable_hash,
};

use crate::path::FieldPath;
use crate::walk::JsonType;

/// Mergeable summary of every value observed at one field path.
#[derive(Debug, Clone)]
pub struct FieldStats {
    count: u64,
    null_count: u64,
    types: std::collections::BTreeSet<JsonType>,
    numeric: RunningStats,
    string_len: RunningStats,
    cardinality: CardinalityCounter,
    examples: Reservoir<Value>,
}

impl FieldStats {
    fn new(config: &ShapeEngineConfig, path_seed: u64) -> Self {
        Self {
            count: 0,
            null_count: 0,
            types: std::collections::BTreeSet::new(),
            numeric: RunningStats::new(),
            string_len: RunningStats::new(),
            cardinality: CardinalityCounter::new(
                config.cardinality_small_threshold,
                config.hll_precision,
            ),
            examples: Reservoir::new(config.examples_per_field, path_seed),
        }
    }

    fn observe(&mut self, value: &Value) {
        let json_type = JsonType::of(value);
        self.types.insert(json_type);

        match value {
            Value::Null => {
                self.null_count += 1;
                return;
            }
            Value::Bool(b) => {
                self.cardinality.insert_hash(scalar_hash(json_type, &[*b as u8]));
                self.examples.offer_with(|| value.clone());
            }
            Value::Number(n) => {
                self.numeric.push(number_as_f64(n));
                self.cardinality
                    .insert_hash(scalar_hash(json_type, n.to_string().as_bytes()));
                self.examples.offer_with(|| value.clone());
            }
            Value::String(s) => {
                self.string_len.push(s.chars().count() as f64);
                self.cardinality
                    .insert_hash(scalar_hash(json_type, s.as_bytes()));
                self.examples.offer_with(|| value.clone());
            }
            // Containers observe only their type; their contents arrive
            // as separate walk events.
            Value::Array(_) | Value::Object(_) => {}
        }
        self.count += 1;
    }

    /// Non-null observations.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Null observations.
    pub fn null_count(&self) -> u64 {
        self.null_count
    }

    /// All JSON types seen at this path.
    pub fn types(&self) -> impl Iterator<Item = JsonType> + '_ {
        self.types.iter().copied()
    }

    pub fn has_type(&self, t: JsonType) -> bool {
        self.types.contains(&t)
    }

    /// Numeric moments over integer and number observations.
    pub fn numeric(&self) -> &RunningStats {
        &self.numeric
    }

    /// Length moments (in chars) over string observations.
    pub fn string_len(&self) -> &RunningStats {
        &self.string_len
    }

    /// Estimated distinct scalar values.
    pub fn cardinality(&self) -> u64 {
        self.cardinality.estimate()
    }

    /// Whether distinct counting is still exact.
    pub fn cardinality_mode(&self) -> DistinctMode {
        self.cardinality.mode()
    }

    /// Example values in reservoir order.
    pub fn examples(&self) -> &[Value] {
        self.examples.sample()
    }

    /// Raw string examples, for format detection.
    pub fn string_examples(&self) -> Vec<&str> {
        self.examples
            .sample()
            .iter()
            .filter_map(Value::as_str)
            .collect()
    }

    /// Fold another path's worth of observations into this one.
    pub fn merge(&mut self, other: &Self) {
        self.count += other.count;
        self.null_count += other.null_count;
        self.types.extend(other.types.iter().copied());
        self.numeric.merge(&other.numeric);
        self.string_len.merge(&other.string_len);
        self.cardinality.merge(&other.cardinality);
        self.examples.absorb(&other.examples);
    }
}

fn number_as_f64(n: &serde_json::Number) -> f64 {
    n.as_f64().unwrap_or(0.0)
}

/// Type-tagged stable hash so `1`, `1.0` and `"1"` stay distinct values.
fn scalar_hash(json_type: JsonType, bytes: &[u8]) -> u64 {
    let mut buf = Vec::with_capacity(bytes.len() + 1);
    buf.push(json_type as u8);
    buf.extend_from_slice(bytes);
    stable_hash(&buf)
}

/// Routes walk events into per-path [`FieldStats`].
#[derive(Debug)]
pub struct FieldAggregator {
    config: ShapeEngineConfig,
    fields: BTreeMap<String, FieldStats>,
}

impl FieldAggregator {
    pub fn new(config: ShapeEngineConfig) -> Self {
        Self {
            config,
            fields: BTreeMap::new(),
        }
    }

    /// Record one walk event.
    pub fn observe(&mut self, path: &FieldPath, value: &Value) {
        let key = path.to_string();
        let stats = self.fields.entry(key).or_insert_with_key(|key| {
            // Per-path reservoir seed: engine seed mixed with the path,
            // so example selection is stable per field and independent
            // of which other fields exist.
            let seed = self.config.seed ^ stable_hash(key.as_bytes());
            FieldStats::new(&self.config, seed)
        });
        stats.observe(value);
    }

    /// Number of distinct field paths observed so far.
    pub fn path_count(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, path: &str) -> Option<&FieldStats> {
        self.fields.get(path)
    }

    /// Fold a shard's aggregator into this one.
    pub fn merge(&mut self, other: &Self) {
        for (path, stats) in &other.fields {
            match self.fields.get_mut(path) {
                Some(existing) => existing.merge(stats),
                None => {
                    self.fields.insert(path.clone(), stats.clone());
                }
            }
        }
    }

    /// Freeze into the per-path stats map, keyed by canonical path.
    pub fn finalize(self) -> BTreeMap<String, FieldStats> {
        self.fields
    }

    /// Borrowing view used before finalization.
    pub fn fields(&self) -> &BTreeMap<String, FieldStats> {
        &self.fields
    }
}
