//! Structure analysis - describe the nested objects and arrays of a document
//!
//! The resulting tree lets a caller pick, ahead of normalization, which
//! nested object paths should become tables under the custom strategy.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::normalize::naming::join_path;
use crate::normalize::ArrayKind;

/// Number of keys listed in [`StructureNode::sample_keys`]
pub const SAMPLE_KEY_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Object,
    Array,
}

/// One nested object or array found in the document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureNode {
    /// Field name
    pub name: String,
    /// Dotted source path, as used by custom table paths
    pub path: String,
    pub depth: usize,
    pub kind: NodeKind,
    /// First keys of the object, or of the first object in the array
    pub sample_keys: Vec<String>,
    /// Element shape, for arrays
    pub item_type: Option<ArrayKind>,
    /// Number of keys of an object, or elements of an array
    pub item_count: usize,
    pub children: Vec<StructureNode>,
}

/// Describe every nested object and array under `data`.
///
/// Arrays are transparent: the fields of their object elements are reported
/// at the array's own path, merged across elements.
pub fn analyze_json_structure(data: &Value, path: &str, depth: usize) -> Vec<StructureNode> {
    let mut nodes = Vec::new();
    collect(data, path, depth, &mut nodes);
    nodes
}

/// Paths of all nested objects in the tree, depth first
pub fn object_paths(nodes: &[StructureNode]) -> Vec<String> {
    let mut paths = Vec::new();
    for node in nodes {
        if node.kind == NodeKind::Object {
            paths.push(node.path.clone());
        }
        paths.extend(object_paths(&node.children));
    }
    paths
}

fn collect(value: &Value, path: &str, depth: usize, nodes: &mut Vec<StructureNode>) {
    match value {
        Value::Object(obj) => collect_fields(obj, path, depth, nodes),
        Value::Array(items) => {
            for item in items {
                if let Value::Object(obj) = item {
                    collect_fields(obj, path, depth, nodes);
                }
            }
        }
        _ => {}
    }
}

fn collect_fields(obj: &Map<String, Value>, path: &str, depth: usize, nodes: &mut Vec<StructureNode>) {
    for (key, value) in obj {
        let field_path = join_path(path, key);
        let (kind, sample_keys, item_type, item_count) = match value {
            Value::Object(nested) => (NodeKind::Object, sample_keys(nested), None, nested.len()),
            Value::Array(items) => {
                let first_object = items.iter().find_map(Value::as_object);
                (
                    NodeKind::Array,
                    first_object.map(sample_keys).unwrap_or_default(),
                    Some(ArrayKind::of(items)),
                    items.len(),
                )
            }
            _ => continue,
        };

        let mut children = Vec::new();
        collect(value, &field_path, depth + 1, &mut children);

        match nodes.iter_mut().find(|n| n.path == field_path) {
            Some(existing) => merge_children(existing, children),
            None => nodes.push(StructureNode {
                name: key.clone(),
                path: field_path,
                depth,
                kind,
                sample_keys,
                item_type,
                item_count,
                children,
            }),
        }
    }
}

fn merge_children(node: &mut StructureNode, children: Vec<StructureNode>) {
    for child in children {
        match node.children.iter_mut().find(|n| n.path == child.path) {
            Some(existing) => merge_children(existing, child.children),
            None => node.children.push(child),
        }
    }
}

fn sample_keys(obj: &Map<String, Value>) -> Vec<String> {
    obj.keys().take(SAMPLE_KEY_COUNT).cloned().collect()
}
