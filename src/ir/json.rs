//! Thin JSON adapter: normalizes the loose on-wire node shape into the
//! canonical [`Node`]/[`PropValue`] form, once, at load time.
//!
//! Two normalizations happen here:
//! - a node's `args: { ... }` bag (an alternate, flatter-editor-era way of
//!   storing properties) is merged into the node's top-level properties;
//! - every string property value is split into a syntactic `base`/`swizzle`
//!   pair, applying the inline-swizzle rule before any id lookup happens.
//!   Whether `base` is actually a reference, as opposed to a plain string
//!   literal, is left for edge reconstruction to decide once it has the
//!   enclosing function's id namespace in view.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::types::{Node, PropValue};

const RESERVED_KEYS: [&str; 4] = ["id", "op", "metadata", "edges"];

pub fn deserialize_nodes<'de, D>(deserializer: D) -> Result<Vec<Node>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Value> = Vec::deserialize(deserializer)?;
    raw.iter()
        .map(|v| node_from_value(v).map_err(serde::de::Error::custom))
        .collect()
}

fn node_from_value(v: &Value) -> Result<Node, String> {
    let obj = v.as_object().ok_or("node must be a JSON object")?;

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .ok_or("node missing 'id'")?
        .to_string();
    // A dotted id is structurally loadable (it just collides with the
    // inline-swizzle syntax); whether it is rejected is the validator's
    // call, not the loader's, so it can carry a function/node-id-citing
    // Diagnostic instead of aborting the whole document.

    let op = obj
        .get("op")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("node '{id}' missing 'op'"))?
        .to_string();

    let metadata = obj.get("metadata").cloned();

    let mut flat: BTreeMap<String, Value> = BTreeMap::new();
    for (k, val) in obj {
        if RESERVED_KEYS.contains(&k.as_str()) {
            continue;
        }
        if k == "args" {
            if let Some(bag) = val.as_object() {
                for (bk, bv) in bag {
                    flat.entry(bk.clone()).or_insert_with(|| bv.clone());
                }
            }
            continue;
        }
        flat.insert(k.clone(), val.clone());
    }

    let properties = flat
        .into_iter()
        .map(|(k, val)| (k, prop_from_json(&val)))
        .collect();

    Ok(Node { id, op, metadata, properties })
}

fn prop_from_json(v: &Value) -> PropValue {
    match v {
        Value::Null => PropValue::Null,
        Value::Bool(b) => PropValue::Bool(*b),
        Value::Number(n) => PropValue::Number(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => split_inline_swizzle(s),
        Value::Array(items) => PropValue::Array(items.iter().map(prop_from_json).collect()),
        Value::Object(map) => {
            PropValue::Object(map.iter().map(|(k, v)| (k.clone(), prop_from_json(v))).collect())
        }
    }
}

/// Split `"nodeId.xyz"` into a base id plus swizzle mask, purely
/// syntactically — no id-namespace lookup happens here.
pub fn split_inline_swizzle(s: &str) -> PropValue {
    if let Some(idx) = s.rfind('.') {
        let (base, suffix) = (&s[..idx], &s[idx + 1..]);
        if !base.is_empty() && !base.contains('.') && is_swizzle_mask(suffix) {
            return PropValue::StrRef {
                base: base.to_string(),
                swizzle: Some(suffix.to_string()),
            };
        }
    }
    PropValue::StrRef { base: s.to_string(), swizzle: None }
}

fn is_swizzle_mask(s: &str) -> bool {
    if s.is_empty() || s.len() > 4 {
        return false;
    }
    let all_xyzw = s.chars().all(|c| matches!(c, 'x' | 'y' | 'z' | 'w'));
    let all_rgba = s.chars().all(|c| matches!(c, 'r' | 'g' | 'b' | 'a'));
    all_xyzw || all_rgba
}

/// Parse a full IR document from its JSON text.
pub fn parse_document(text: &str) -> anyhow::Result<super::types::IRDocument> {
    let doc: super::types::IRDocument =
        serde_json::from_str(text).map_err(|e| anyhow::anyhow!("failed to parse IR JSON: {e}"))?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swizzle_split_recognizes_xyzw_and_rgba() {
        assert_eq!(
            split_inline_swizzle("n1.xyz"),
            PropValue::StrRef { base: "n1".into(), swizzle: Some("xyz".into()) }
        );
        assert_eq!(
            split_inline_swizzle("n1.rg"),
            PropValue::StrRef { base: "n1".into(), swizzle: Some("rg".into()) }
        );
    }

    #[test]
    fn swizzle_split_leaves_plain_strings_and_paths_alone() {
        assert_eq!(
            split_inline_swizzle("hello"),
            PropValue::StrRef { base: "hello".into(), swizzle: None }
        );
        // Mixed families, or masks over 4 chars, are not swizzles.
        assert_eq!(
            split_inline_swizzle("n1.xr"),
            PropValue::StrRef { base: "n1.xr".into(), swizzle: None }
        );
        assert_eq!(
            split_inline_swizzle("n1.xyzwx"),
            PropValue::StrRef { base: "n1.xyzwx".into(), swizzle: None }
        );
    }

    #[test]
    fn args_bag_is_hoisted_to_top_level() {
        let v: Value = serde_json::json!({
            "id": "n1",
            "op": "math_add",
            "args": { "a": "n2", "b": 3.0 },
        });
        let node = node_from_value(&v).unwrap();
        assert_eq!(node.prop("a").unwrap().as_plain_str(), Some("n2"));
        assert_eq!(node.prop("b").unwrap().as_number(), Some(3.0));
    }

    #[test]
    fn node_id_with_dot_loads_and_is_left_to_the_validator() {
        // Rejecting this belongs to `validate::structural::check`
        // (`DiagnosticKind::Structural`), not the loader.
        let v: Value = serde_json::json!({ "id": "bad.id", "op": "literal" });
        let node = node_from_value(&v).unwrap();
        assert_eq!(node.id, "bad.id");
    }
}
