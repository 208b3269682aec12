//! Incremental schema inference.
//!
//! The builder merges every record's shape into one [`SchemaNode`]
//! tree. Two pieces of state only ever move one way: a child's
//! requiredness can be demoted but never restored, and enum candidate
//! tracking can be discarded but never resumed. Both transitions are
//! modeled as enums with a single legal direction rather than resettable
//! flags.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use shapeforge_config::ShapeEngineConfig;

use crate::format::{FormatHint, detect_format};
use crate::path::{FieldPath, Segment};
use crate::profile::FieldStats;
use crate::walk::{JsonType, ValueWalker};

/// Whether a key was present in every object sample at its parent path.
/// Starts `Required` on first sight and can only be demoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requiredness {
    Required,
    Optional,
}

impl Requiredness {
    pub fn demote(&mut self) {
        *self = Requiredness::Optional;
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Requiredness::Required)
    }
}

/// Enum candidate tracking for string values at one path. Tracking is
/// abandoned permanently once the distinct count passes the cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumTracker {
    Tracking(BTreeSet<String>),
    Discarded,
}

impl Default for EnumTracker {
    fn default() -> Self {
        EnumTracker::Tracking(BTreeSet::new())
    }
}

impl EnumTracker {
    pub fn observe(&mut self, value: &str, cap: usize) {
        if let EnumTracker::Tracking(set) = self {
            if set.contains(value) {
                return;
            }
            if set.len() >= cap {
                *self = EnumTracker::Discarded;
            } else {
                set.insert(value.to_string());
            }
        }
    }

    pub fn merge(&mut self, other: &Self, cap: usize) {
        match (&mut *self, other) {
            (EnumTracker::Tracking(set), EnumTracker::Tracking(other_set)) => {
                set.extend(other_set.iter().cloned());
                if set.len() > cap {
                    *self = EnumTracker::Discarded;
                }
            }
            _ => *self = EnumTracker::Discarded,
        }
    }

    pub fn candidates(&self) -> Option<&BTreeSet<String>> {
        match self {
            EnumTracker::Tracking(set) => Some(set),
            EnumTracker::Discarded => None,
        }
    }
}

/// One observed key under an object node.
#[derive(Debug, Clone)]
pub struct SchemaChild {
    pub node: SchemaNode,
    /// Object samples of the parent that contained this key.
    pub seen: u64,
    pub required: Requiredness,
}

impl SchemaChild {
    fn new(first_object: bool) -> Self {
        Self {
            node: SchemaNode::default(),
            seen: 0,
            required: if first_object {
                Requiredness::Required
            } else {
                // The key was absent from every earlier object sample.
                Requiredness::Optional
            },
        }
    }
}

impl Default for SchemaChild {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Union shape of everything observed at one path.
#[derive(Debug, Clone, Default)]
pub struct SchemaNode {
    pub types: BTreeSet<JsonType>,
    pub properties: BTreeMap<String, SchemaChild>,
    pub items: Option<Box<SchemaNode>>,
    /// Object samples observed at this path.
    pub object_count: u64,
    pub enums: EnumTracker,
    /// Assigned once, at finalize.
    pub format: Option<FormatHint>,
}

impl SchemaNode {
    fn descend_mut(&mut self, segments: &[Segment]) -> &mut SchemaNode {
        let mut cur = self;
        for segment in segments {
            cur = match segment {
                Segment::Key(key) => {
                    &mut cur
                        .properties
                        .entry(key.clone())
                        .or_default()
                        .node
                }
                Segment::Index => {
                    cur.items.get_or_insert_with(Default::default).as_mut()
                }
            };
        }
        cur
    }

    fn merge_from(&mut self, other: &SchemaNode, enum_cap: usize) {
        let had_objects = self.object_count > 0;
        self.types.extend(other.types.iter().copied());
        self.object_count += other.object_count;
        self.enums.merge(&other.enums, enum_cap);

        for (key, other_child) in &other.properties {
            match self.properties.get_mut(key) {
                Some(child) => {
                    child.seen += other_child.seen;
                    if !other_child.required.is_required() {
                        child.required.demote();
                    }
                    child.node.merge_from(&other_child.node, enum_cap);
                }
                None => {
                    let mut child = other_child.clone();
                    if had_objects {
                        // This side saw objects here without the key.
                        child.required.demote();
                    }
                    self.properties.insert(key.clone(), child);
                }
            }
        }
        if other.object_count > 0 {
            for (key, child) in self.properties.iter_mut() {
                if !other.properties.contains_key(key) {
                    child.required.demote();
                }
            }
        }

        match (&mut self.items, &other.items) {
            (Some(items), Some(other_items)) => {
                items.merge_from(other_items, enum_cap);
            }
            (None, Some(other_items)) => {
                self.items = Some(other_items.clone());
            }
            _ => {}
        }
    }
}

/// Streams records into a [`SchemaNode`] tree.
#[derive(Debug)]
pub struct SchemaBuilder {
    root: SchemaNode,
    enum_cap: usize,
    confidence: f64,
    min_examples: usize,
}

impl SchemaBuilder {
    pub fn new(config: &ShapeEngineConfig) -> Self {
        Self {
            root: SchemaNode::default(),
            enum_cap: config.enum_max_cardinality,
            confidence: config.format_confidence_threshold,
            min_examples: config.format_min_examples,
        }
    }

    /// Merge one record's shape into the tree.
    pub fn add_record(&mut self, value: &Value) {
        for ev in ValueWalker::new(value) {
            let node = self.root.descend_mut(ev.path.segments());
            match ev.node {
                Value::Object(map) => {
                    node.types.insert(JsonType::Object);
                    node.object_count += 1;
                    let first_object = node.object_count == 1;
                    for key in map.keys() {
                        let child = node
                            .properties
                            .entry(key.clone())
                            .or_insert_with(|| SchemaChild::new(first_object));
                        child.seen += 1;
                    }
                    for (key, child) in node.properties.iter_mut() {
                        if !map.contains_key(key) {
                            child.required.demote();
                        }
                    }
                }
                Value::Array(_) => {
                    node.types.insert(JsonType::Array);
                }
                Value::String(s) => {
                    node.types.insert(JsonType::String);
                    node.enums.observe(s, self.enum_cap);
                }
                other => {
                    node.types.insert(JsonType::of(other));
                }
            }
        }
    }

    /// Current tree (mutating observations may still arrive).
    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Fold a shard's builder into this one.
    pub fn merge(&mut self, other: &Self) {
        self.root.merge_from(&other.root, self.enum_cap);
    }

    /// Freeze the tree, assigning format hints from the profile's
    /// string examples. No mutation happens after this.
    pub fn finalize(
        mut self,
        stats: &BTreeMap<String, FieldStats>,
    ) -> SchemaNode {
        let confidence = self.confidence;
        let min_examples = self.min_examples;
        assign_formats(
            &mut self.root,
            &FieldPath::root(),
            stats,
            confidence,
            min_examples,
        );
        self.root
    }
}

fn assign_formats(
    node: &mut SchemaNode,
    path: &FieldPath,
    stats: &BTreeMap<String, FieldStats>,
    confidence: f64,
    min_examples: usize,
) {
    if node.types.contains(&JsonType::String) {
        if let Some(field) = stats.get(&path.to_string()) {
            let examples = field.string_examples();
            node.format = detect_format(&examples, confidence, min_examples);
        }
    }
    for (key, child) in node.properties.iter_mut() {
        assign_formats(
            &mut child.node,
            &path.child(key),
            stats,
            confidence,
            min_examples,
        );
    }
    if let Some(items) = &mut node.items {
        assign_formats(items, &path.element(), stats, confidence, min_examples);
    }
}

/// Serializable JSON Schema subset: type, properties, items, required,
/// format, enum. Nothing else.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDoc {
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Box<SchemaDoc>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaDoc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Render a finalized tree as a JSON Schema document.
pub fn to_schema_doc(root: &SchemaNode) -> SchemaDoc {
    let mut doc = convert(root);
    doc.schema_uri =
        Some("https://json-schema.org/draft/2020-12/schema".to_string());
    doc
}

fn convert(node: &SchemaNode) -> SchemaDoc {
    let mut doc = SchemaDoc::default();

    let mut type_names: Vec<&str> =
        node.types.iter().map(JsonType::as_str).collect();
    type_names.sort_unstable();
    doc.schema_type = match type_names.as_slice() {
        [] => None,
        [single] => Some(Value::String((*single).to_string())),
        many => Some(Value::Array(
            many.iter().map(|t| Value::String((*t).to_string())).collect(),
        )),
    };

    if !node.properties.is_empty() {
        let mut props = BTreeMap::new();
        let mut required = Vec::new();
        for (key, child) in &node.properties {
            props.insert(key.clone(), Box::new(convert(&child.node)));
            if child.required.is_required() && child.seen > 0 {
                required.push(key.clone());
            }
        }
        doc.properties = Some(props);
        if !required.is_empty() {
            doc.required = Some(required);
        }
    }

    if let Some(items) = &node.items {
        doc.items = Some(Box::new(convert(items)));
    }

    if node.types.contains(&JsonType::String) {
        if let Some(set) = node.enums.candidates() {
            if !set.is_empty() {
                doc.enum_values = Some(set.iter().cloned().collect());
            }
        }
    }

    doc.format = node.format.map(|f| f.as_str().to_string());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn builder() -> SchemaBuilder {
        SchemaBuilder::new(&ShapeEngineConfig::default())
    }

    fn node_at<'a>(root: &'a SchemaNode, path: &[&str]) -> &'a SchemaNode {
        let mut cur = root;
        for key in path {
            cur = match *key {
                "[]" => cur.items.as_deref().unwrap(),
                key => &cur.properties.get(key).unwrap().node,
            };
        }
        cur
    }

    #[test]
    fn single_record_marks_all_keys_required() {
        let mut b = builder();
        b.add_record(&json!({"id": 1, "name": "a"}));
        let root = b.root();
        assert!(root.properties["id"].required.is_required());
        assert!(root.properties["name"].required.is_required());
    }

    #[test]
    fn missing_key_demotes_permanently() {
        let mut b = builder();
        b.add_record(&json!({"id": 1, "email": "a@b.co"}));
        b.add_record(&json!({"id": 2}));
        // The key coming back must not restore requiredness.
        b.add_record(&json!({"id": 3, "email": "c@d.co"}));

        let root = b.root();
        assert!(root.properties["id"].required.is_required());
        assert!(!root.properties["email"].required.is_required());
    }

    #[test]
    fn late_key_starts_optional() {
        let mut b = builder();
        b.add_record(&json!({"id": 1}));
        b.add_record(&json!({"id": 2, "extra": true}));
        assert!(!b.root().properties["extra"].required.is_required());
    }

    #[test]
    fn type_unions_accumulate() {
        let mut b = builder();
        b.add_record(&json!({"v": 1}));
        b.add_record(&json!({"v": "one"}));
        b.add_record(&json!({"v": null}));
        let types = &node_at(b.root(), &["v"]).types;
        assert!(types.contains(&JsonType::Integer));
        assert!(types.contains(&JsonType::String));
        assert!(types.contains(&JsonType::Null));
    }

    #[test]
    fn array_elements_merge_into_items() {
        let mut b = builder();
        b.add_record(&json!({"tags": ["a", "b"]}));
        b.add_record(&json!({"tags": [1]}));
        let items = node_at(b.root(), &["tags", "[]"]);
        assert!(items.types.contains(&JsonType::String));
        assert!(items.types.contains(&JsonType::Integer));
    }

    #[test]
    fn enum_candidates_survive_below_cap() {
        let mut b = builder();
        for status in ["open", "closed", "open", "pending"] {
            b.add_record(&json!({ "status": status }));
        }
        let node = node_at(b.root(), &["status"]);
        let set = node.enums.candidates().unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.contains("pending"));
    }

    #[test]
    fn enum_discard_is_permanent() {
        let mut b = builder();
        for i in 0..200 {
            b.add_record(&json!({ "id": format!("value_{i}") }));
        }
        // Repeats of known values must not resurrect tracking.
        b.add_record(&json!({"id": "value_0"}));
        let node = node_at(b.root(), &["id"]);
        assert_eq!(node.enums, EnumTracker::Discarded);
    }

    #[test]
    fn required_in_rendered_doc_is_the_intersection() {
        let mut b = builder();
        b.add_record(&json!({"a": 1, "b": 2}));
        b.add_record(&json!({"a": 3}));
        let doc = to_schema_doc(&b.finalize(&BTreeMap::new()));
        assert_eq!(doc.required, Some(vec!["a".to_string()]));
    }

    #[test]
    fn doc_uses_single_type_or_sorted_union() {
        let mut b = builder();
        b.add_record(&json!({"single": true, "multi": 1}));
        b.add_record(&json!({"single": false, "multi": "x"}));
        let doc = to_schema_doc(&b.finalize(&BTreeMap::new()));
        let props = doc.properties.unwrap();
        assert_eq!(props["single"].schema_type, Some(json!("boolean")));
        assert_eq!(
            props["multi"].schema_type,
            Some(json!(["integer", "string"]))
        );
    }

    #[test]
    fn discarded_enum_renders_plain_string() {
        let mut b = builder();
        for i in 0..200 {
            b.add_record(&json!({ "id": format!("value_{i}") }));
        }
        let doc = to_schema_doc(&b.finalize(&BTreeMap::new()));
        let id = &doc.properties.unwrap()["id"];
        assert_eq!(id.schema_type, Some(json!("string")));
        assert_eq!(id.enum_values, None);
    }

    #[test]
    fn merge_matches_single_stream() {
        let records: Vec<Value> = (0..100)
            .map(|i| {
                let mut rec = json!({
                    "id": i,
                    "kind": if i % 3 == 0 { "a" } else { "b" },
                    "nested": {"flag": i % 2 == 0},
                });
                if i % 5 == 0 {
                    rec["optional"] = json!("sometimes");
                }
                rec
            })
            .collect();

        let mut whole = builder();
        for r in &records {
            whole.add_record(r);
        }

        let mut left = builder();
        let mut right = builder();
        for (i, r) in records.iter().enumerate() {
            if i < 40 {
                left.add_record(r);
            } else {
                right.add_record(r);
            }
        }
        left.merge(&right);

        let whole_doc =
            serde_json::to_value(to_schema_doc(&whole.finalize(&BTreeMap::new())))
                .unwrap();
        let merged_doc =
            serde_json::to_value(to_schema_doc(&left.finalize(&BTreeMap::new())))
                .unwrap();
        assert_eq!(whole_doc, merged_doc);
    }

    #[test]
    fn merge_demotes_keys_unknown_to_one_shard() {
        let mut left = builder();
        left.add_record(&json!({"common": 1, "left_only": true}));
        let mut right = builder();
        right.add_record(&json!({"common": 2}));

        left.merge(&right);
        let root = left.root();
        assert!(root.properties["common"].required.is_required());
        assert!(!root.properties["left_only"].required.is_required());
    }

    #[test]
    fn scalar_records_build_scalar_schema() {
        let mut b = builder();
        b.add_record(&json!("hello"));
        b.add_record(&json!("world"));
        let doc = to_schema_doc(&b.finalize(&BTreeMap::new()));
        assert_eq!(doc.schema_type, Some(json!("string")));
        assert_eq!(
            doc.enum_values,
            Some(vec!["hello".to_string(), "world".to_string()])
        );
    }
}
