//! Error types for the shape engine.
//!
//! Oversized strings, deep nesting and cardinality overflow are policy
//! conditions, not errors; they resolve to truncation or downgrade and
//! surface only as annotations in the artifacts. The error surface is
//! correspondingly small.

use thiserror::Error;

/// Errors the shape engine can return.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// Rejected configuration.
    #[error(transparent)]
    Config(#[from] shapeforge_config::ConfigError),

    /// Artifact serialization failed.
    #[error("failed to serialize artifact: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for engine operations.
pub type ShapeResult<T> = Result<T, ShapeError>;
