//! Schema fingerprinting.
//!
//! Hashes the *structure* of a schema tree — types, key names,
//! requiredness — never the statistics that shift with every record, so
//! two streams with the same shape share a fingerprint regardless of
//! their values.

use sha2::{Digest, Sha256};

use crate::schema::SchemaNode;
use crate::walk::JsonType;

/// Stable 16-hex-char fingerprint of a schema tree's structure.
pub fn compute_fingerprint(node: &SchemaNode) -> String {
    let mut hasher = Sha256::new();
    hash_structure(node, &mut hasher);
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

/// 8-char form for logs and labels.
pub fn compute_short_fingerprint(node: &SchemaNode) -> String {
    compute_fingerprint(node).chars().take(8).collect()
}

fn hash_structure(node: &SchemaNode, hasher: &mut Sha256) {
    // BTree iteration keeps both type and key order deterministic.
    for json_type in &node.types {
        hasher.update(type_tag(*json_type));
        hasher.update(b"|");
    }
    hasher.update(b"{");
    for (name, child) in &node.properties {
        hasher.update(name.as_bytes());
        hasher.update(b":");
        hasher.update([child.required.is_required() as u8]);
        hash_structure(&child.node, hasher);
        hasher.update(b",");
    }
    hasher.update(b"}");
    if let Some(items) = &node.items {
        hasher.update(b"[");
        hash_structure(items, hasher);
        hasher.update(b"]");
    }
}

fn type_tag(json_type: JsonType) -> &'static [u8] {
    json_type.as_str().as_bytes()
}
