//! Shapeforge - streaming shape inference for JSON record streams.
//!
//! Feed decoded JSON values through a [`ShapeEngine`] and get three
//! deterministic artifacts back: a per-field statistics profile, a
//! truncated structural preview, and an inferred JSON Schema subset.
//! The engine never materializes the stream — memory is bounded by the
//! number of distinct field paths and the configured reservoir sizes,
//! independent of record count.
//!
//! # Features
//!
//! - **One pass**: statistics, sampling and schema inference share a
//!   single traversal per record
//! - **Deterministic**: fixed seed plus fixed input order reproduces
//!   byte-identical artifacts
//! - **Mergeable**: aggregator and schema builder states combine as
//!   commutative monoids, so sharded ingestion stays an option
//! - **Never aborts on data**: oversized strings, huge arrays and deep
//!   nesting degrade to annotated truncations, not errors
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use shapeforge_engine::{ShapeEngine, ShapeEngineConfig};
//!
//! let config = ShapeEngineConfig { seed: 7, ..Default::default() };
//! let mut engine = ShapeEngine::new(config).unwrap();
//!
//! engine.observe(&json!({"user": "alice", "score": 10}));
//! engine.observe(&json!({"user": "bob", "score": 12, "tags": ["new"]}));
//!
//! let artifacts = engine.finalize().unwrap();
//! let (profile, preview, schema) = artifacts.to_canonical_strings().unwrap();
//! assert!(profile.contains("\"record_count\":2"));
//! assert!(!preview.is_empty());
//! assert!(schema.contains("\"type\":\"object\""));
//! ```

mod emit;
mod engine;
mod errors;
mod fingerprint;
mod format;
mod path;
mod profile;
mod sample;
mod schema;
mod truncate;
mod walk;

pub use emit::{Artifacts, emit};
pub use engine::{ObserveOutcome, SchemaChange, ShapeEngine, profile_stream};
pub use errors::{ShapeError, ShapeResult};
pub use fingerprint::{compute_fingerprint, compute_short_fingerprint};
pub use format::{FormatHint, detect_format};
pub use path::{FieldPath, Segment};
pub use profile::{FieldAggregator, FieldStats};
pub use sample::{RecordSampler, SampleSlot};
pub use schema::{
    EnumTracker, Requiredness, SchemaBuilder, SchemaChild, SchemaDoc,
    SchemaNode, to_schema_doc,
};
pub use truncate::{
    Annotation, AnnotationKind, Truncated, TruncationPolicy, sha256_hex,
    truncate,
};
pub use walk::{JsonType, ValueWalker, WalkEvent};

pub use shapeforge_config::{
    ArraySamplePattern, ConfigError, ShapeEngineConfig,
};
pub use shapeforge_sketch::DistinctMode;
