//! Canonical content hashing of document trees
//!
//! Two documents that differ only in the order of map keys hash the same.
//! List order, scalar values and scalar kinds all change the hash.

use super::{ConfigNode, key_text};
use serde_yaml::Value;
use sha2::{Digest as _, Sha256};

/// Canonical string form of a node
///
/// - null / virtual: `N:`
/// - map: `M{key:child,...}` with keys sorted
/// - list: `L[child,...]` in document order
/// - scalar: `S:`, `B:`, `I:`, `D:` or `O:` followed by the escaped text
#[must_use]
pub fn canonicalize(node: &ConfigNode<'_>) -> String {
    let mut out = String::new();
    match node.raw() {
        Some(value) => write_value(&mut out, value),
        None => out.push_str("N:"),
    }
    out
}

/// Lowercase hex SHA-256 of the canonical form
#[must_use]
pub fn sha256(node: &ConfigNode<'_>) -> String {
    hex::encode(Sha256::digest(canonicalize(node).as_bytes()))
}

/// Hash of a whole document
#[must_use]
pub fn sha256_value(value: &Value) -> String {
    sha256(&ConfigNode::root(value))
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("N:"),
        Value::Mapping(map) => {
            let mut entries: Vec<(String, &Value)> =
                map.iter().map(|(k, v)| (key_text(k), v)).collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            out.push_str("M{");
            for (index, (key, child)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                escape_into(out, &key, &['\\', ':', ',', '{', '}']);
                out.push(':');
                write_value(out, child);
            }
            out.push('}');
        }
        Value::Sequence(items) => {
            out.push_str("L[");
            for (index, child) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_value(out, child);
            }
            out.push(']');
        }
        Value::String(s) => write_scalar(out, "S:", s),
        Value::Bool(b) => write_scalar(out, "B:", &b.to_string()),
        Value::Number(n) if n.is_f64() => write_scalar(out, "D:", &n.to_string()),
        Value::Number(n) => write_scalar(out, "I:", &n.to_string()),
        Value::Tagged(tagged) => {
            let text = serde_yaml::to_string(tagged.as_ref())
                .map(|s| s.trim_end().to_owned())
                .unwrap_or_default();
            write_scalar(out, "O:", &text);
        }
    }
}

fn write_scalar(out: &mut String, tag: &str, text: &str) {
    out.push_str(tag);
    escape_into(out, text, &['\\', ',', '[', ']', '{', '}']);
}

fn escape_into(out: &mut String, text: &str, special: &[char]) {
    for ch in text.chars() {
        if special.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
}
