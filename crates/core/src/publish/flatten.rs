//! Tree to topic flattening

use polestar_domain::Tree;

/// Flatten `tree` into `(topic, payload)` pairs below `prefix`
///
/// Maps recurse with `/key` appended to the topic. Every other value,
/// including lists and `null`, becomes one message carrying its compact JSON
/// text. An empty map yields no messages. Messages are sorted by topic so the
/// result never depends on map enumeration order.
pub fn flatten(prefix: &str, tree: &Tree) -> Vec<(String, String)> {
    let mut out = Vec::new();
    walk(prefix.to_string(), tree, &mut out);
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

fn walk(topic: String, value: &Tree, out: &mut Vec<(String, String)>) {
    match value {
        Tree::Object(map) => {
            for (key, child) in map {
                walk(format!("{topic}/{key}"), child, out);
            }
        }
        leaf => out.push((topic, leaf.to_string())),
    }
}
