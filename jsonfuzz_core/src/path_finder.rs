use crate::path::Path;
use serde_json::Value;

/// Maps out the path to every leaf (non-container) value in `structure`.
///
/// Objects are walked in member insertion order and arrays by index, depth
/// first, so the result lists leaves in pre-order. Empty objects and arrays
/// have no leaves and contribute nothing. A structure whose root is itself a
/// leaf yields a single empty path.
pub fn map_structure(structure: &Value) -> Vec<Path> {
    let mut completed = Vec::new();
    walk(structure, Path::new(), &mut completed);
    completed
}

/// Number of leaves reachable from the root; always equal to
/// `map_structure(structure).len()`.
pub fn leaf_count(structure: &Value) -> usize {
    match structure {
        Value::Object(map) => map.values().map(leaf_count).sum(),
        Value::Array(items) => items.iter().map(leaf_count).sum(),
        _ => 1,
    }
}

fn walk(node: &Value, prefix: Path, completed: &mut Vec<Path>) {
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                walk(child, prefix.child(key.as_str()), completed);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                walk(child, prefix.child(index), completed);
            }
        }
        // Hit the bottom, this chain is complete.
        _ => completed.push(prefix),
    }
}
