//! Canonical artifact emission.
//!
//! Every emitted object keeps lexicographically ordered keys (serde_json
//! maps are BTree-backed here) and the canonical string forms carry no
//! incidental whitespace, so identical input and seed produce
//! byte-identical artifacts — diffable and cacheable by content hash.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::errors::ShapeResult;
use crate::profile::FieldStats;
use crate::sample::SampleSlot;
use crate::schema::{SchemaNode, to_schema_doc};
use crate::truncate::{TruncationPolicy, truncate_string};
use crate::walk::JsonType;

/// The three artifacts of a finished run.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub profile: Value,
    pub preview: Value,
    pub schema: Value,
}

impl Artifacts {
    /// Compact canonical renderings of (profile, preview, schema).
    pub fn to_canonical_strings(
        &self,
    ) -> ShapeResult<(String, String, String)> {
        Ok((
            serde_json::to_string(&self.profile)?,
            serde_json::to_string(&self.preview)?,
            serde_json::to_string(&self.schema)?,
        ))
    }
}

/// Serialize finalized engine state into the three artifacts.
pub fn emit(
    stats: &BTreeMap<String, FieldStats>,
    schema_root: &SchemaNode,
    samples: &[SampleSlot],
    record_count: u64,
    policy: &TruncationPolicy,
) -> ShapeResult<Artifacts> {
    let mut fields = Map::new();
    for (path, field) in stats {
        fields.insert(path.clone(), field_entry(field, policy));
    }
    let profile = json!({
        "fields": Value::Object(fields),
        "record_count": record_count,
    });

    let preview = Value::Array(
        samples
            .iter()
            .map(|slot| {
                json!({
                    "index": slot.index,
                    "record": slot.record,
                })
            })
            .collect(),
    );

    let schema = serde_json::to_value(to_schema_doc(schema_root))?;

    Ok(Artifacts {
        profile,
        preview,
        schema,
    })
}

fn field_entry(field: &FieldStats, policy: &TruncationPolicy) -> Value {
    let mut entry = Map::new();

    let mut type_names: Vec<&str> =
        field.types().map(|t| t.as_str()).collect();
    type_names.sort_unstable();
    entry.insert("type".into(), json!(type_names));
    entry.insert("count".into(), json!(field.count()));
    entry.insert("nulls".into(), json!(field.null_count()));

    let examples: Vec<Value> = field
        .examples()
        .iter()
        .map(|example| match example {
            Value::String(s) => truncate_string(s, policy),
            other => other.clone(),
        })
        .collect();
    entry.insert("examples".into(), Value::Array(examples));

    let numeric = field.numeric();
    if !numeric.is_empty() {
        entry.insert(
            "numeric".into(),
            json!({
                "avg": numeric.mean(),
                "max": numeric.max(),
                "min": numeric.min(),
            }),
        );
    }

    let lengths = field.string_len();
    if !lengths.is_empty() {
        entry.insert(
            "string_length".into(),
            json!({
                "avg": lengths.mean(),
                "max": lengths.max().map(|v| v as u64),
                "min": lengths.min().map(|v| v as u64),
            }),
        );
    }

    let has_scalars = field.has_type(JsonType::String)
        || field.has_type(JsonType::Boolean)
        || field.has_type(JsonType::Integer)
        || field.has_type(JsonType::Number);
    if has_scalars {
        entry.insert("cardinality".into(), json!(field.cardinality()));
    }

    Value::Object(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::FieldAggregator;
    use crate::schema::SchemaBuilder;
    use crate::walk::ValueWalker;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use shapeforge_config::ShapeEngineConfig;

    fn artifacts_for(records: &[Value]) -> Artifacts {
        let config = ShapeEngineConfig::default();
        let mut agg = FieldAggregator::new(config.clone());
        let mut builder = SchemaBuilder::new(&config);
        for record in records {
            for ev in ValueWalker::new(record) {
                agg.observe(&ev.path, ev.node);
            }
            builder.add_record(record);
        }
        let stats = agg.finalize();
        let schema = builder.finalize(&stats);
        emit(
            &stats,
            &schema,
            &[],
            records.len() as u64,
            &TruncationPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn profile_carries_fields_and_record_count() {
        let artifacts =
            artifacts_for(&[json!({"a": 1}), json!({"a": 2})]);
        assert_eq!(artifacts.profile["record_count"], json!(2));
        let a = &artifacts.profile["fields"]["a"];
        assert_eq!(a["count"], json!(2));
        assert_eq!(a["nulls"], json!(0));
        assert_eq!(a["type"], json!(["integer"]));
        assert_eq!(a["cardinality"], json!(2));
    }

    #[test]
    fn canonical_strings_are_compact_and_stable() {
        let a = artifacts_for(&[json!({"b": 1, "a": "x"})]);
        let b = artifacts_for(&[json!({"b": 1, "a": "x"})]);
        let (pa, va, sa) = a.to_canonical_strings().unwrap();
        let (pb, vb, sb) = b.to_canonical_strings().unwrap();
        assert_eq!(pa, pb);
        assert_eq!(va, vb);
        assert_eq!(sa, sb);
        assert!(!pa.contains('\n'));
        assert!(!pa.contains(": "));
    }

    #[test]
    fn long_example_strings_are_truncated_in_profile() {
        let artifacts = artifacts_for(&[json!({ "s": "q".repeat(200) })]);
        let examples = artifacts.profile["fields"]["s"]["examples"]
            .as_array()
            .unwrap();
        assert_eq!(examples[0]["$truncated"], json!(true));
        assert_eq!(examples[0]["original_len"], json!(200));
        assert_eq!(
            examples[0]["sha256"].as_str().unwrap().len(),
            64
        );
    }

    #[test]
    fn string_length_block_appears_only_for_strings() {
        let artifacts =
            artifacts_for(&[json!({"s": "abc", "n": 7})]);
        let fields = &artifacts.profile["fields"];
        assert!(fields["s"].get("string_length").is_some());
        assert!(fields["s"].get("numeric").is_none());
        assert!(fields["n"].get("numeric").is_some());
        assert!(fields["n"].get("string_length").is_none());
    }

    #[test]
    fn schema_artifact_is_a_json_schema_subset() {
        let artifacts = artifacts_for(&[json!({"id": 1, "tags": ["a"]})]);
        let schema = &artifacts.schema;
        assert_eq!(
            schema["$schema"],
            json!("https://json-schema.org/draft/2020-12/schema")
        );
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["properties"]["id"]["type"], json!("integer"));
        assert_eq!(
            schema["properties"]["tags"]["items"]["type"],
            json!("string")
        );
    }

    #[test]
    fn preview_lists_slots_with_indices() {
        let stats = BTreeMap::new();
        let schema = SchemaNode::default();
        let slots = vec![
            SampleSlot {
                index: 3,
                record: json!({"a": 1}),
            },
            SampleSlot {
                index: 9,
                record: json!({"a": 2}),
            },
        ];
        let artifacts = emit(
            &stats,
            &schema,
            &slots,
            10,
            &TruncationPolicy::default(),
        )
        .unwrap();
        let preview = artifacts.preview.as_array().unwrap();
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0]["index"], json!(3));
        assert_eq!(preview[1]["record"]["a"], json!(2));
    }

    #[test]
    fn container_only_paths_have_no_cardinality() {
        let artifacts = artifacts_for(&[json!({"o": {"inner": 1}})]);
        let o = &artifacts.profile["fields"]["o"];
        assert_eq!(o["type"], json!(["object"]));
        assert!(o.get("cardinality").is_none());
    }

    // Profile keys come out of a BTreeMap; spot-check the invariant the
    // canonical form relies on.
    #[test]
    fn field_paths_emit_sorted() {
        let artifacts = artifacts_for(&[json!({"z": 1, "a": 1, "m": 1})]);
        let keys: Vec<&String> = artifacts.profile["fields"]
            .as_object()
            .unwrap()
            .keys()
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
