//! Truncation engine: bounded copies of arbitrary values.
//!
//! `truncate` is a pure function of the value and policy — no engine
//! state, safe to call from anywhere. Truncated positions carry inline
//! annotations so a consumer can tell what was dropped, and truncated
//! strings always carry a SHA-256 of the original, so equal underlying
//! values remain comparable after their payloads are gone.

use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use shapeforge_config::{ArraySamplePattern, ShapeEngineConfig};

use crate::path::FieldPath;

/// Marker appended to truncated string previews.
pub const ELLIPSIS: &str = "…";
/// Key of the depth-pruning marker object.
pub const DEPTH_KEY: &str = "…";
/// Value of the depth-pruning marker.
pub const DEPTH_MARKER: &str = "<depth-exceeded>";

/// How a value should be cut down.
#[derive(Debug, Clone)]
pub struct TruncationPolicy {
    pub max_string_chars: usize,
    pub pattern: ArraySamplePattern,
    pub max_depth: usize,
    pub binary_threshold: f64,
    pub binary_min_len: usize,
}

impl Default for TruncationPolicy {
    fn default() -> Self {
        Self::from_config(&ShapeEngineConfig::default())
            .expect("default config carries a valid pattern")
    }
}

impl TruncationPolicy {
    pub fn from_config(
        config: &ShapeEngineConfig,
    ) -> Result<Self, shapeforge_config::ConfigError> {
        Ok(Self {
            max_string_chars: config.max_string_chars,
            pattern: config.sample_pattern()?,
            max_depth: config.max_depth,
            binary_threshold: config.binary_heuristic_threshold,
            binary_min_len: config.binary_min_len,
        })
    }
}

/// What kind of cut happened at an annotated position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    StringTruncated,
    ArraySampled,
    DepthExceeded,
}

/// One truncation event, addressed by canonical field path.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Annotation {
    pub path: String,
    pub kind: AnnotationKind,
}

/// A truncated copy plus the list of positions that were cut.
#[derive(Debug, Clone)]
pub struct Truncated {
    pub value: Value,
    pub annotations: Vec<Annotation>,
}

/// Produce a bounded copy of `value` under `policy`.
pub fn truncate(value: &Value, policy: &TruncationPolicy) -> Truncated {
    let mut annotations = Vec::new();
    let value =
        truncate_at(value, &FieldPath::root(), 0, policy, &mut annotations);
    Truncated { value, annotations }
}

/// Hex-encoded SHA-256 of a string's bytes (64 hex chars).
pub fn sha256_hex(s: &str) -> String {
    hex::encode(Sha256::digest(s.as_bytes()))
}

/// Truncate a single string under `policy`, returning the annotated
/// marker object, or a plain copy when it fits.
pub fn truncate_string(s: &str, policy: &TruncationPolicy) -> Value {
    let char_count = s.chars().count();
    let binary = looks_binary(s, policy);
    if char_count <= policy.max_string_chars && !binary {
        return Value::String(s.to_string());
    }

    let preview: String =
        s.chars().take(policy.max_string_chars).collect::<String>()
            + ELLIPSIS;
    let mut marker = Map::new();
    marker.insert("$truncated".into(), Value::Bool(true));
    if binary {
        marker.insert("binary".into(), Value::Bool(true));
    }
    marker.insert("original_len".into(), json!(char_count));
    marker.insert("preview".into(), Value::String(preview));
    marker.insert("sha256".into(), Value::String(sha256_hex(s)));
    Value::Object(marker)
}

fn truncate_at(
    value: &Value,
    path: &FieldPath,
    depth: usize,
    policy: &TruncationPolicy,
    annotations: &mut Vec<Annotation>,
) -> Value {
    match value {
        Value::String(s) => {
            let out = truncate_string(s, policy);
            if out.is_object() {
                annotations.push(Annotation {
                    path: path.to_string(),
                    kind: AnnotationKind::StringTruncated,
                });
            }
            out
        }

        Value::Object(map) => {
            if depth >= policy.max_depth {
                annotations.push(Annotation {
                    path: path.to_string(),
                    kind: AnnotationKind::DepthExceeded,
                });
                // Keys survive even when values are dropped: key
                // presence is structurally informative.
                let mut keys: Vec<&str> =
                    map.keys().map(String::as_str).collect();
                keys.sort_unstable();
                let mut marker = Map::new();
                marker.insert(
                    DEPTH_KEY.into(),
                    Value::String(DEPTH_MARKER.into()),
                );
                marker.insert("keys".into(), json!(keys));
                return Value::Object(marker);
            }
            let mut out = Map::new();
            for (key, child) in map {
                out.insert(
                    key.clone(),
                    truncate_at(
                        child,
                        &path.child(key),
                        depth + 1,
                        policy,
                        annotations,
                    ),
                );
            }
            Value::Object(out)
        }

        Value::Array(elements) => {
            if depth >= policy.max_depth {
                annotations.push(Annotation {
                    path: path.to_string(),
                    kind: AnnotationKind::DepthExceeded,
                });
                let mut marker = Map::new();
                marker.insert(
                    DEPTH_KEY.into(),
                    Value::String(DEPTH_MARKER.into()),
                );
                marker.insert("len".into(), json!(elements.len()));
                return Value::Object(marker);
            }
            let elem_path = path.element();
            if elements.len() <= policy.pattern.total() {
                let out: Vec<Value> = elements
                    .iter()
                    .map(|e| {
                        truncate_at(
                            e,
                            &elem_path,
                            depth + 1,
                            policy,
                            annotations,
                        )
                    })
                    .collect();
                return Value::Array(out);
            }

            annotations.push(Annotation {
                path: path.to_string(),
                kind: AnnotationKind::ArraySampled,
            });
            let indices = sample_indices(elements.len(), &policy.pattern);
            let sample: Vec<Value> = indices
                .iter()
                .map(|&i| {
                    truncate_at(
                        &elements[i],
                        &elem_path,
                        depth + 1,
                        policy,
                        annotations,
                    )
                })
                .collect();
            let skipped = elements.len() - sample.len();
            json!({
                "$truncated": true,
                "original_len": elements.len(),
                "sample": sample,
                "skipped": skipped,
            })
        }

        // Null, booleans and numbers pass through whole.
        other => other.clone(),
    }
}

/// Positional first/mid/last selection; always the same indices for the
/// same length and pattern.
fn sample_indices(len: usize, pattern: &ArraySamplePattern) -> Vec<usize> {
    let mut indices: Vec<usize> = Vec::with_capacity(pattern.total());
    indices.extend(0..pattern.first.min(len));
    if pattern.mid > 0 && len > 0 {
        let start = len.saturating_sub(pattern.mid) / 2;
        indices.extend(start..(start + pattern.mid).min(len));
    }
    indices.extend(len.saturating_sub(pattern.last)..len);
    indices.sort_unstable();
    indices.dedup();
    indices
}

/// Base64-ish heuristic: long strings made almost entirely of base64
/// alphabet characters are treated as binary payloads.
fn looks_binary(s: &str, policy: &TruncationPolicy) -> bool {
    if s.len() <= policy.binary_min_len || s.is_empty() {
        return false;
    }
    let base64_chars = s
        .chars()
        .filter(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')
        })
        .count();
    base64_chars as f64 / s.chars().count() as f64 >= policy.binary_threshold
}
