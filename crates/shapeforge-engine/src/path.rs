//! Field paths: the aggregation key for every per-field structure.
//!
//! A path addresses a position within a JSON document with array indices
//! elided; every element of an array contributes to the same `[]`
//! segment. The canonical string form joins keys with `.` and renders
//! array traversal as `[]`, e.g. `user.tags[]`.

use std::fmt;

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Object key.
    Key(String),
    /// Any array index.
    Index,
}

/// Ordered path from the record root to a value position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// The record root (empty path).
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Extend with an object key.
    pub fn child(&self, key: &str) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(Segment::Key(key.to_string()));
        Self { segments }
    }

    /// Extend with the collapsed array-element segment.
    pub fn element(&self) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(Segment::Index);
        Self { segments }
    }

    /// Canonical string form.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote_key = false;
        for segment in &self.segments {
            match segment {
                Segment::Key(key) => {
                    if wrote_key {
                        write!(f, ".{key}")?;
                    } else {
                        write!(f, "{key}")?;
                        wrote_key = true;
                    }
                }
                Segment::Index => write!(f, "[]")?,
            }
        }
        Ok(())
    }
}
