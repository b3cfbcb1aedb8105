//! Property: the textual order of a node's JSON properties (and of an
//! `args` bag merged into it) never changes what gets inferred. Properties
//! land in a `BTreeMap` at load time specifically so that downstream passes
//! never see insertion order — this pins that guarantee end to end, through
//! the JSON adapter and into the type inferencer.

use proptest::prelude::*;
use proptest::sample::select;

use shadergraph_compiler::ir::DataType;
use shadergraph_compiler::{load_document, validate};

/// All 24 orderings of 4 distinct items, used to permute the component keys
/// of a `float4` constructor node.
fn permutations_of_four() -> Vec<[usize; 4]> {
    let mut perms = Vec::new();
    for a in 0..4 {
        for b in 0..4 {
            if b == a {
                continue;
            }
            for c in 0..4 {
                if c == a || c == b {
                    continue;
                }
                for d in 0..4 {
                    if d == a || d == b || d == c {
                        continue;
                    }
                    perms.push([a, b, c, d]);
                }
            }
        }
    }
    perms
}

fn document_json(order: [usize; 4]) -> String {
    let keys = ["x", "y", "z", "w"];
    let values = ["lx", "ly", "lz", "lw"];
    let mut args_bag = String::new();
    for (i, &idx) in order.iter().enumerate() {
        if i > 0 {
            args_bag.push(',');
        }
        args_bag.push_str(&format!("\"{}\":\"{}\"", keys[idx], values[idx]));
    }

    format!(
        r#"{{
            "version": "1",
            "entryPoint": "main",
            "functions": [
                {{
                    "id": "main",
                    "kind": "shader",
                    "nodes": [
                        {{"id": "lx", "op": "literal", "value": 1.0, "type": "float"}},
                        {{"id": "ly", "op": "literal", "value": 2.0, "type": "float"}},
                        {{"id": "lz", "op": "literal", "value": 3.0, "type": "float"}},
                        {{"id": "lw", "op": "literal", "value": 4.0, "type": "float"}},
                        {{"id": "v", "op": "float4", "args": {{{args_bag}}}}}
                    ]
                }}
            ]
        }}"#
    )
}

proptest! {
    #[test]
    fn float4_constructor_infers_the_same_type_under_any_key_order(
        order in select(permutations_of_four())
    ) {
        let text = document_json(order);
        let doc = load_document(&text).unwrap();
        let (diagnostics, typed) = validate(&doc);
        prop_assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        prop_assert_eq!(typed.node_type("main", "v"), Some(&DataType::Float4));
    }
}
