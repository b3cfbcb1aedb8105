//! Edge reconstruction: a function's nodes carry no edge list of their own.
//! Every connection is implied by a node's properties — a plain node id
//! string is a dataflow reference, a value under an `exec_*` key is a
//! control-flow successor/predecessor, and identifier-flagged args (the
//! `schema::OpSchema::args` entries with `is_identifier` set) name a
//! resource/variable/function instead of a node output and are resolved
//! separately, by the validator, against the document's own namespaces.

use std::collections::BTreeMap;

use crate::ir::{FunctionDef, Node, PropValue};
use crate::schema::{self, is_exec_port};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Data,
    Exec,
}

/// One reconstructed connection between two nodes in the same function.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from_node: String,
    pub from_swizzle: Option<String>,
    pub to_node: String,
    pub to_arg: String,
    /// Position within a composite arg (`values[2]` of an `array_construct`,
    /// or the member name of a `struct_construct`), `None` for a scalar arg.
    pub to_path: Option<PathSegment>,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

/// All edges reconstructed for one function, keyed by destination node id
/// for quick lookup during type inference and codegen.
#[derive(Debug, Clone, Default)]
pub struct EdgeSet {
    pub edges: Vec<Edge>,
}

impl EdgeSet {
    pub fn incoming(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.to_node == node_id)
    }

    pub fn incoming_data(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
        self.incoming(node_id).filter(|e| e.kind == EdgeKind::Data)
    }

    pub fn incoming_arg(&self, node_id: &str, arg: &str) -> Option<&Edge> {
        self.incoming(node_id).find(|e| e.to_arg == arg && e.to_path.is_none())
    }

    pub fn outgoing_exec(&self, node_id: &str, port: &str) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|e| e.kind == EdgeKind::Exec && e.from_node == node_id && e.to_arg == port)
    }
}

/// Reconstructs every edge in `function` from its nodes' properties.
/// `node_ids` is the set of node ids declared in this function, used to
/// distinguish a genuine node reference from a plain string literal that
/// happens to look like one (e.g. a `comment` node's `text` prop).
pub fn reconstruct(function: &FunctionDef) -> EdgeSet {
    let node_ids: BTreeMap<&str, &Node> =
        function.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut edges = Vec::new();
    for node in &function.nodes {
        let schema = schema::op_table().get(node.op.as_str());
        for (key, value) in &node.properties {
            if is_exec_port(key) {
                collect_exec_edge(node, key, value, &node_ids, &mut edges);
                continue;
            }
            if let Some(schema) = schema {
                if schema.is_identifier_arg(key) {
                    continue;
                }
            }
            collect_data_edges(node, key, value, &node_ids, &mut edges);
        }
    }
    EdgeSet { edges }
}

fn collect_exec_edge(
    node: &Node,
    port: &str,
    value: &PropValue,
    node_ids: &BTreeMap<&str, &Node>,
    out: &mut Vec<Edge>,
) {
    let Some(base) = value.as_plain_str() else { return };
    if !node_ids.contains_key(base) {
        return;
    }
    // `exec_in` names the predecessor; every other exec key (`exec_out`,
    // `exec_true`, `exec_false`, `exec_body`, `exec_completed`) names a
    // successor. Both directions are recorded with `node` as the
    // control-flow-local endpoint so `EdgeSet::outgoing_exec` can look up
    // a node's successor on a given port without caring which side of the
    // connection originally stored the reference.
    if port == "exec_in" {
        out.push(Edge {
            from_node: base.to_string(),
            from_swizzle: None,
            to_node: node.id.clone(),
            to_arg: "exec_in".to_string(),
            to_path: None,
            kind: EdgeKind::Exec,
        });
    } else {
        out.push(Edge {
            from_node: node.id.clone(),
            from_swizzle: None,
            to_node: base.to_string(),
            to_arg: port.to_string(),
            to_path: None,
            kind: EdgeKind::Exec,
        });
    }
}

fn collect_data_edges(
    node: &Node,
    arg: &str,
    value: &PropValue,
    node_ids: &BTreeMap<&str, &Node>,
    out: &mut Vec<Edge>,
) {
    match value {
        PropValue::StrRef { base, swizzle } => {
            if node_ids.contains_key(base.as_str()) {
                out.push(Edge {
                    from_node: base.clone(),
                    from_swizzle: swizzle.clone(),
                    to_node: node.id.clone(),
                    to_arg: arg.to_string(),
                    to_path: None,
                    kind: EdgeKind::Data,
                });
            }
        }
        PropValue::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if let PropValue::StrRef { base, swizzle } = item {
                    if node_ids.contains_key(base.as_str()) {
                        out.push(Edge {
                            from_node: base.clone(),
                            from_swizzle: swizzle.clone(),
                            to_node: node.id.clone(),
                            to_arg: arg.to_string(),
                            to_path: Some(PathSegment::Index(i)),
                            kind: EdgeKind::Data,
                        });
                    }
                }
            }
        }
        PropValue::Object(map) => {
            for (member, item) in map {
                if let PropValue::StrRef { base, swizzle } = item {
                    if node_ids.contains_key(base.as_str()) {
                        out.push(Edge {
                            from_node: base.clone(),
                            from_swizzle: swizzle.clone(),
                            to_node: node.id.clone(),
                            to_arg: arg.to_string(),
                            to_path: Some(PathSegment::Key(member.clone())),
                            kind: EdgeKind::Data,
                        });
                    }
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionKind, PropValue};
    use std::collections::BTreeMap;

    fn node(id: &str, op: &str, props: Vec<(&str, PropValue)>) -> Node {
        Node {
            id: id.to_string(),
            op: op.to_string(),
            metadata: None,
            properties: props.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }

    #[test]
    fn plain_node_reference_becomes_a_data_edge() {
        let func = FunctionDef {
            id: "f".into(),
            kind: FunctionKind::Shader,
            inputs: vec![],
            outputs: vec![],
            local_vars: vec![],
            nodes: vec![
                node("n1", "literal", vec![("value", PropValue::Number(1.0))]),
                node("n2", "math_neg", vec![("value", PropValue::StrRef { base: "n1".into(), swizzle: None })]),
            ],
        };
        let edges = reconstruct(&func);
        let e = edges.incoming_arg("n2", "value").unwrap();
        assert_eq!(e.from_node, "n1");
        assert_eq!(e.kind, EdgeKind::Data);
    }

    #[test]
    fn swizzle_suffix_is_carried_onto_the_edge() {
        let func = FunctionDef {
            id: "f".into(),
            kind: FunctionKind::Shader,
            inputs: vec![],
            outputs: vec![],
            local_vars: vec![],
            nodes: vec![
                node("n1", "float4", vec![]),
                node(
                    "n2",
                    "math_neg",
                    vec![("value", PropValue::StrRef { base: "n1".into(), swizzle: Some("xyz".into()) })],
                ),
            ],
        };
        let edges = reconstruct(&func);
        let e = edges.incoming_arg("n2", "value").unwrap();
        assert_eq!(e.from_swizzle.as_deref(), Some("xyz"));
    }

    #[test]
    fn string_literal_not_matching_a_node_id_is_not_an_edge() {
        let func = FunctionDef {
            id: "f".into(),
            kind: FunctionKind::Shader,
            inputs: vec![],
            outputs: vec![],
            local_vars: vec![],
            nodes: vec![node(
                "n1",
                "comment",
                vec![("text", PropValue::StrRef { base: "hello world".into(), swizzle: None })],
            )],
        };
        let edges = reconstruct(&func);
        assert!(edges.incoming_arg("n1", "text").is_none());
    }

    #[test]
    fn identifier_args_are_not_treated_as_data_edges() {
        let func = FunctionDef {
            id: "f".into(),
            kind: FunctionKind::Shader,
            inputs: vec![],
            outputs: vec![],
            local_vars: vec![],
            nodes: vec![
                node("my_buffer", "literal", vec![]),
                node(
                    "n2",
                    "buffer_load",
                    vec![
                        ("buffer", PropValue::StrRef { base: "my_buffer".into(), swizzle: None }),
                        ("index", PropValue::Number(0.0)),
                    ],
                ),
            ],
        };
        let edges = reconstruct(&func);
        assert!(edges.incoming_arg("n2", "buffer").is_none());
    }

    #[test]
    fn exec_chain_is_reconstructed_in_both_directions() {
        let func = FunctionDef {
            id: "f".into(),
            kind: FunctionKind::Shader,
            inputs: vec![],
            outputs: vec![],
            local_vars: vec![],
            nodes: vec![
                node(
                    "n1",
                    "var_set",
                    vec![("exec_out", PropValue::StrRef { base: "n2".into(), swizzle: None })],
                ),
                node(
                    "n2",
                    "var_set",
                    vec![("exec_in", PropValue::StrRef { base: "n1".into(), swizzle: None })],
                ),
            ],
        };
        let edges = reconstruct(&func);
        let succ = edges.outgoing_exec("n1", "exec_out").unwrap();
        assert_eq!(succ.to_node, "n2");
    }

    #[test]
    fn array_construct_values_produce_indexed_edges() {
        let func = FunctionDef {
            id: "f".into(),
            kind: FunctionKind::Shader,
            inputs: vec![],
            outputs: vec![],
            local_vars: vec![],
            nodes: vec![
                node("n1", "literal", vec![]),
                node("n2", "literal", vec![]),
                node(
                    "n3",
                    "array_construct",
                    vec![(
                        "values",
                        PropValue::Array(vec![
                            PropValue::StrRef { base: "n1".into(), swizzle: None },
                            PropValue::StrRef { base: "n2".into(), swizzle: None },
                        ]),
                    )],
                ),
            ],
        };
        let edges = reconstruct(&func);
        let incoming: Vec<_> = edges.incoming_data("n3").collect();
        assert_eq!(incoming.len(), 2);
        assert!(incoming.iter().any(|e| e.from_node == "n1" && e.to_path == Some(PathSegment::Index(0))));
        assert!(incoming.iter().any(|e| e.from_node == "n2" && e.to_path == Some(PathSegment::Index(1))));
    }
}
