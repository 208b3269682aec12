//! The engine front type: owns all streaming state and drives the
//! walker, aggregator, schema builder and sampler for each record.

use serde_json::Value;
use tracing::{debug, info, trace};

use shapeforge_config::ShapeEngineConfig;

use crate::emit::{self, Artifacts};
use crate::errors::ShapeResult;
use crate::fingerprint::compute_fingerprint;
use crate::profile::FieldAggregator;
use crate::sample::RecordSampler;
use crate::schema::SchemaBuilder;
use crate::truncate::TruncationPolicy;
use crate::walk::ValueWalker;

/// What one observation did to the running schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaChange {
    /// First record: shape discovered.
    First { fingerprint: String },

    /// This record changed the inferred shape.
    Evolved { old: String, new: String },

    /// Shape unchanged.
    Unchanged { fingerprint: String },
}

/// Result of observing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserveOutcome {
    /// Zero-based position of the record in the stream.
    pub index: u64,

    /// Whether the record entered the preview reservoir.
    pub admitted: bool,

    pub schema: SchemaChange,
}

/// Streaming shape engine.
///
/// Consumes decoded JSON values one at a time and, on
/// [`finalize`](ShapeEngine::finalize), emits a per-field profile, a
/// truncated preview and an inferred schema. All state — including the
/// PRNGs — lives in the engine value; two engines never share anything.
///
/// ```
/// use serde_json::json;
/// use shapeforge_engine::ShapeEngine;
///
/// let mut engine = ShapeEngine::with_defaults();
/// engine.observe(&json!({"id": 1, "name": "Alice"}));
/// engine.observe(&json!({"id": 2, "name": "Bob"}));
/// let artifacts = engine.finalize().unwrap();
/// assert_eq!(artifacts.profile["record_count"], json!(2));
/// ```
pub struct ShapeEngine {
    config: ShapeEngineConfig,
    policy: TruncationPolicy,
    aggregator: FieldAggregator,
    builder: SchemaBuilder,
    sampler: RecordSampler,
    record_count: u64,
    fingerprint: Option<String>,
}

impl ShapeEngine {
    /// Build an engine from a validated configuration.
    pub fn new(config: ShapeEngineConfig) -> ShapeResult<Self> {
        config.validate()?;
        let policy = TruncationPolicy::from_config(&config)?;
        Ok(Self {
            aggregator: FieldAggregator::new(config.clone()),
            builder: SchemaBuilder::new(&config),
            sampler: RecordSampler::new(
                config.reservoir_size,
                config.seed,
                policy.clone(),
            ),
            policy,
            config,
            record_count: 0,
            fingerprint: None,
        })
    }

    /// Engine with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ShapeEngineConfig::default())
            .expect("default config is valid")
    }

    pub fn config(&self) -> &ShapeEngineConfig {
        &self.config
    }

    /// Records observed so far.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Current structural fingerprint, if any record has been seen.
    pub fn schema_fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Observe one record. Never fails: oversized or deeply nested
    /// records resolve through truncation and downgrade, not errors.
    pub fn observe(&mut self, value: &Value) -> ObserveOutcome {
        let index = self.record_count;
        self.record_count += 1;

        for ev in ValueWalker::new(value) {
            self.aggregator.observe(&ev.path, ev.node);
        }
        self.builder.add_record(value);
        let admitted = self.sampler.maybe_sample(value, index);

        let fingerprint = compute_fingerprint(self.builder.root());
        let schema = match self.fingerprint.take() {
            None => {
                info!(fingerprint = %fingerprint, "shape discovered");
                SchemaChange::First {
                    fingerprint: fingerprint.clone(),
                }
            }
            Some(old) if old != fingerprint => {
                debug!(
                    old = %old,
                    new = %fingerprint,
                    record = index,
                    "shape evolved"
                );
                SchemaChange::Evolved {
                    old,
                    new: fingerprint.clone(),
                }
            }
            Some(_) => {
                trace!(record = index, "shape unchanged");
                SchemaChange::Unchanged {
                    fingerprint: fingerprint.clone(),
                }
            }
        };
        self.fingerprint = Some(fingerprint);

        ObserveOutcome {
            index,
            admitted,
            schema,
        }
    }

    /// Freeze all state and emit the three artifacts. Safe to call
    /// after any prefix of the stream, including before any record.
    pub fn finalize(self) -> ShapeResult<Artifacts> {
        let stats = self.aggregator.finalize();
        let schema = self.builder.finalize(&stats);
        let slots = self.sampler.into_slots();
        emit::emit(&stats, &schema, &slots, self.record_count, &self.policy)
    }
}

/// Drive a whole stream through a fresh engine.
pub fn profile_stream<I>(
    config: ShapeEngineConfig,
    records: I,
) -> ShapeResult<Artifacts>
where
    I: IntoIterator<Item = Value>,
{
    let mut engine = ShapeEngine::new(config)?;
    for record in records {
        engine.observe(&record);
    }
    engine.finalize()
}
