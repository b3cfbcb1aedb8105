//! Structural checks: everything that can be decided without knowing a
//! single node's data type — reference existence, recursion, node-id
//! shape, cpu/shader placement, and draw-target aliasing.

use std::collections::{HashMap, HashSet};

use crate::edges::{reconstruct, EdgeSet};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::ir::{DataType, FixedExtent, FunctionDef, FunctionKind, IRDocument, ResourceSize};
use crate::schema::{self};

pub struct StructuralResult {
    pub diagnostics: Vec<Diagnostic>,
    /// Edge sets, one per function, so later passes do not reconstruct twice.
    pub edges: HashMap<String, EdgeSet>,
}

pub fn check(doc: &IRDocument) -> StructuralResult {
    let mut diagnostics = Vec::new();
    let mut edges = HashMap::new();

    if doc.function(&doc.entry_point).is_none() {
        diagnostics.push(Diagnostic::error(
            DiagnosticKind::Reference,
            format!("entry point function '{}' does not exist", doc.entry_point),
        ));
    }

    check_struct_recursion(doc, &mut diagnostics);
    check_function_recursion(doc, &mut diagnostics);

    for func in &doc.functions {
        check_node_id_shape(func, &mut diagnostics);
        let edge_set = reconstruct(func);
        check_function_body(doc, func, &edge_set, &mut diagnostics);
        edges.insert(func.id.clone(), edge_set);
    }

    StructuralResult { diagnostics, edges }
}

fn check_struct_recursion(doc: &IRDocument, diagnostics: &mut Vec<Diagnostic>) {
    for s in &doc.structs {
        let mut visiting = HashSet::new();
        if has_struct_cycle(doc, &s.id, &mut visiting) {
            diagnostics.push(Diagnostic::error(
                DiagnosticKind::Structural,
                format!("struct '{}' is recursive, directly or transitively", s.id),
            ));
        }
    }
}

fn has_struct_cycle(doc: &IRDocument, id: &str, visiting: &mut HashSet<String>) -> bool {
    if !visiting.insert(id.to_string()) {
        return true;
    }
    if let Some(def) = doc.struct_def(id) {
        for member in &def.members {
            if let crate::ir::DataType::Struct(member_id) = &member.data_type {
                if has_struct_cycle(doc, member_id, visiting) {
                    return true;
                }
            }
        }
    }
    visiting.remove(id);
    false
}

fn check_function_recursion(doc: &IRDocument, diagnostics: &mut Vec<Diagnostic>) {
    for func in &doc.functions {
        let mut visiting = HashSet::new();
        if has_function_cycle(doc, &func.id, &mut visiting) {
            diagnostics.push(Diagnostic::error(
                DiagnosticKind::Structural,
                format!("function '{}' is recursive, directly or transitively", func.id),
            ));
        }
    }
}

fn has_function_cycle(doc: &IRDocument, id: &str, visiting: &mut HashSet<String>) -> bool {
    if !visiting.insert(id.to_string()) {
        return true;
    }
    if let Some(func) = doc.function(id) {
        for node in &func.nodes {
            if node.op == "call_func" || node.op == "cmd_dispatch" {
                if let Some(target) = node.prop("func").and_then(|p| p.as_plain_str()) {
                    if has_function_cycle(doc, target, visiting) {
                        return true;
                    }
                }
            }
        }
    }
    visiting.remove(id);
    false
}

/// A `.` in a node id collides with the inline-swizzle syntax
/// (`"nodeId.xyz"`), so it is rejected here rather than at load time -
/// doing it here lets the diagnostic cite the offending function/node.
fn check_node_id_shape(func: &FunctionDef, diagnostics: &mut Vec<Diagnostic>) {
    for node in &func.nodes {
        if node.id.contains('.') {
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticKind::Structural,
                    format!("node id '{}' must not contain '.' (reserved for inline swizzle)", node.id),
                )
                .in_function(&func.id)
                .at_node(&node.id),
            );
        }
    }
}

fn check_function_body(
    doc: &IRDocument,
    func: &FunctionDef,
    edges: &EdgeSet,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let _ = edges;
    for node in &func.nodes {
        let Some(op_schema) = schema::op_table().get(node.op.as_str()) else {
            diagnostics.push(
                Diagnostic::error(DiagnosticKind::Schema, format!("unknown opcode '{}'", node.op))
                    .in_function(&func.id)
                    .at_node(&node.id),
            );
            continue;
        };

        if op_schema.cpu_only && func.kind == FunctionKind::Shader {
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticKind::Structural,
                    format!("'{}' is a cpu-only op and cannot appear in a shader function", node.op),
                )
                .in_function(&func.id)
                .at_node(&node.id),
            );
        }

        for (arg, is_identifier) in &op_schema.args {
            if !*is_identifier {
                continue;
            }
            let Some(referenced) = node.prop(arg).and_then(|p| p.as_plain_str()) else { continue };
            if !identifier_exists(doc, func, node.op.as_str(), *arg, referenced) {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::Reference,
                        format!("'{}' arg '{arg}' references unknown id '{referenced}'", node.op),
                    )
                    .in_function(&func.id)
                    .at_node(&node.id),
                );
            }
        }

        if matches!(node.op.as_str(), "buffer_store" | "buffer_load") {
            check_buffer_bounds(doc, func, node, diagnostics);
        }

        if node.op == "cmd_draw" {
            check_draw_target_aliasing(doc, func, node, diagnostics);
        }
    }
}

/// A compile-time-constant `index` against a `fixed`-size buffer can be
/// bounds-checked here; a dynamically wired index is checked only at
/// runtime by the backend.
fn check_buffer_bounds(
    doc: &IRDocument,
    func: &FunctionDef,
    node: &crate::ir::Node,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(buffer_id) = node.prop("buffer").and_then(|p| p.as_plain_str()) else { return };
    let Some(resource) = doc.resource(buffer_id) else { return };
    let ResourceSize::Fixed { extent: FixedExtent::Count(count) } = &resource.size else { return };
    let Some(index) = node.prop("index").and_then(|p| p.as_number()) else { return };
    if index < 0.0 || index >= *count as f64 {
        diagnostics.push(
            Diagnostic::error(
                DiagnosticKind::Bounds,
                format!("Static OOB: index {index} out of range for buffer '{buffer_id}' of size {count}"),
            )
            .in_function(&func.id)
            .at_node(&node.id),
        );
    }
}

fn identifier_exists(doc: &IRDocument, func: &FunctionDef, op: &str, arg: &str, id: &str) -> bool {
    match (op, arg) {
        ("var_get" | "var_set", "var") => {
            func.local_vars.iter().any(|v| v.id == id) || doc.inputs.iter().any(|i| i.id == id)
        }
        ("loop_index", "loop") => func.nodes.iter().any(|n| n.id == id),
        ("call_func" | "cmd_dispatch", "func") => doc.function(id).is_some(),
        // A texture arg may name either a `doc.resources` render target or a
        // texture/sampler-typed global input (no separate sampler resource
        // kind exists, so those live in `doc.inputs`).
        (_, "texture") => {
            doc.resource(id).is_some()
                || doc.input(id).is_some_and(|i| {
                    matches!(i.data_type, DataType::Texture2D | DataType::Sampler)
                })
        }
        (_, "buffer" | "resource" | "target" | "src" | "dst" | "array") => doc.resource(id).is_some(),
        ("cmd_draw", "vertex_func" | "fragment_func") => doc.function(id).is_some(),
        ("atomic_load" | "atomic_store" | "atomic_add" | "atomic_sub" | "atomic_min" | "atomic_max"
        | "atomic_exchange", "target") => doc.resource(id).is_some(),
        _ => doc.resource(id).is_some() || doc.function(id).is_some(),
    }
}

/// A `cmd_draw` whose fragment function samples or loads from the same
/// resource it is drawing into reads and writes one resource within a
/// single pass: flagged as a structural error rather than left for the
/// backend to define behavior for.
fn check_draw_target_aliasing(
    doc: &IRDocument,
    _func: &FunctionDef,
    draw_node: &crate::ir::Node,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(target) = draw_node.prop("target").and_then(|p| p.as_plain_str()) else { return };
    let Some(frag_func_id) = draw_node.prop("fragment_func").and_then(|p| p.as_plain_str()) else {
        return;
    };
    let mut visiting = HashSet::new();
    collect_target_reads(doc, frag_func_id, target, frag_func_id, &mut visiting, diagnostics);
}

/// Walks `func_id`'s nodes for `texture_*`/`buffer_*`/`resource_get_size`
/// reads of `target`, following `call_func` callees the same way
/// [`has_function_cycle`] follows them for recursion detection, so a read
/// delegated through a helper function is still caught.
fn collect_target_reads(
    doc: &IRDocument,
    func_id: &str,
    target: &str,
    frag_func_id: &str,
    visiting: &mut HashSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if !visiting.insert(func_id.to_string()) {
        return;
    }
    let Some(func) = doc.function(func_id) else { return };
    for node in &func.nodes {
        match node.op.as_str() {
            "texture_sample" | "texture_load" | "buffer_load" | "resource_get_size" => {
                let arg = if node.op == "buffer_load" { "buffer" } else if node.op == "resource_get_size" { "resource" } else { "texture" };
                if let Some(src) = node.prop(arg).and_then(|p| p.as_plain_str()) {
                    if src == target {
                        diagnostics.push(
                            Diagnostic::error(
                                DiagnosticKind::Structural,
                                format!(
                                    "cmd_draw target '{target}' is also sampled by its own fragment function '{frag_func_id}'"
                                ),
                            )
                            .in_function(&func.id)
                            .at_node(&node.id),
                        );
                    }
                }
            }
            "call_func" => {
                if let Some(callee) = node.prop("func").and_then(|p| p.as_plain_str()) {
                    collect_target_reads(doc, callee, target, frag_func_id, visiting, diagnostics);
                }
            }
            _ => {}
        }
    }
    visiting.remove(func_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;
    use std::collections::BTreeMap;

    fn minimal_doc(functions: Vec<FunctionDef>) -> IRDocument {
        IRDocument {
            version: "1".into(),
            meta: Metadata::default(),
            entry_point: functions.first().map(|f| f.id.clone()).unwrap_or_default(),
            inputs: vec![],
            resources: vec![],
            structs: vec![],
            functions,
        }
    }

    #[test]
    fn missing_entry_point_is_flagged() {
        let doc = IRDocument { entry_point: "missing".into(), ..minimal_doc(vec![]) };
        let result = check(&doc);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Reference && d.message.contains("entry point")));
    }

    #[test]
    fn direct_struct_recursion_is_flagged() {
        let doc = IRDocument {
            structs: vec![StructDef {
                id: "S".into(),
                members: vec![StructMember { id: "next".into(), data_type: DataType::Struct("S".into()) }],
            }],
            ..minimal_doc(vec![])
        };
        let result = check(&doc);
        assert!(result.diagnostics.iter().any(|d| d.kind == DiagnosticKind::Structural));
    }

    #[test]
    fn dotted_node_id_is_flagged() {
        let func = FunctionDef {
            id: "main".into(),
            kind: FunctionKind::Shader,
            inputs: vec![],
            outputs: vec![],
            local_vars: vec![],
            nodes: vec![Node {
                id: "bad.id".into(),
                op: "literal".into(),
                metadata: None,
                properties: Default::default(),
            }],
        };
        let doc = minimal_doc(vec![func]);
        let result = check(&doc);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Structural && d.message.contains("must not contain '.'")));
    }

    fn str_ref(id: &str) -> PropValue {
        PropValue::StrRef { base: id.to_string(), swizzle: None }
    }

    #[test]
    fn draw_target_aliasing_is_caught_through_a_call_func_indirection() {
        let helper = FunctionDef {
            id: "sample_helper".into(),
            kind: FunctionKind::Shader,
            inputs: vec![],
            outputs: vec![],
            local_vars: vec![],
            nodes: vec![Node {
                id: "t1".into(),
                op: "texture_sample".into(),
                metadata: None,
                properties: BTreeMap::from([
                    ("texture".to_string(), str_ref("rt")),
                    ("uv".to_string(), str_ref("uv_in")),
                ]),
            }],
        };
        let frag = FunctionDef {
            id: "frag".into(),
            kind: FunctionKind::Shader,
            inputs: vec![],
            outputs: vec![],
            local_vars: vec![],
            nodes: vec![Node {
                id: "c1".into(),
                op: "call_func".into(),
                metadata: None,
                properties: BTreeMap::from([("func".to_string(), str_ref("sample_helper"))]),
            }],
        };
        let main = FunctionDef {
            id: "main".into(),
            kind: FunctionKind::Shader,
            inputs: vec![],
            outputs: vec![],
            local_vars: vec![],
            nodes: vec![Node {
                id: "d1".into(),
                op: "cmd_draw".into(),
                metadata: None,
                properties: BTreeMap::from([
                    ("target".to_string(), str_ref("rt")),
                    ("vertex_func".to_string(), str_ref("frag")),
                    ("fragment_func".to_string(), str_ref("frag")),
                ]),
            }],
        };
        let mut doc = minimal_doc(vec![main, frag, helper]);
        doc.resources.push(ResourceDef {
            id: "rt".into(),
            kind: ResourceKind::Texture2d { format: TextureFormat::Rgba8 },
            size: ResourceSize::Viewport { scale: None },
            persistence: Persistence::default(),
        });
        let result = check(&doc);
        assert!(result.diagnostics.iter().any(|d| d.kind == DiagnosticKind::Structural
            && d.message.contains("also sampled by its own fragment function")));
    }

    #[test]
    fn cpu_only_op_in_shader_function_is_flagged() {
        let func = FunctionDef {
            id: "main".into(),
            kind: FunctionKind::Shader,
            inputs: vec![],
            outputs: vec![],
            local_vars: vec![],
            nodes: vec![Node {
                id: "n1".into(),
                op: "cmd_dispatch".into(),
                metadata: None,
                properties: Default::default(),
            }],
        };
        let doc = minimal_doc(vec![func]);
        let result = check(&doc);
        assert!(result.diagnostics.iter().any(|d| d.message.contains("cpu-only")));
    }
}
