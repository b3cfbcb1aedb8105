//! Target generator orchestration: reachability from the entry point, the
//! per-target code emitter ([`msl`]), and output-manifest assembly. A
//! generator is only ever run against a document with zero error-severity
//! diagnostics (see [`crate::error::has_fatal`]); unlike the validator it
//! is allowed to fail with a thrown error for unrecoverable conditions
//! (recursion, an unknown function reference).

pub mod msl;

use std::collections::{BTreeSet, HashMap, HashSet};

use anyhow::{anyhow, bail, Result};

use crate::edges;
use crate::ir::{FunctionKind, IRDocument};
use crate::validate::TypedDocument;

use self::msl::layout::{build_layout, Layout};
use self::msl::FunctionRole;

/// The generator output manifest (spec 6.3): generated source plus the
/// layout the host harness needs to bind resources and pack/unpack the
/// globals buffer.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub code: String,
    pub resource_bindings: HashMap<String, u32>,
    pub global_buffer_size: u32,
    pub var_map: HashMap<String, u32>,
}

/// DFS over `call_func`/`cmd_dispatch`/`cmd_draw` references starting at the
/// document's entry point. Returns the functions that need MSL emitted, in
/// dependency order (callees before callers) so every helper is declared
/// before its first use.
pub fn reachable_functions(doc: &IRDocument) -> Result<Vec<(String, FunctionRole)>> {
    let mut order = Vec::new();
    let mut roles = HashMap::new();
    let mut visiting = HashSet::new();
    let mut visited = HashSet::new();

    let entry = doc
        .function(&doc.entry_point)
        .ok_or_else(|| anyhow!("unknown entry point function '{}'", doc.entry_point))?;
    let entry_role = if matches!(entry.kind, FunctionKind::Shader) { FunctionRole::Kernel } else { FunctionRole::Helper };

    visit(doc, &doc.entry_point, entry_role, &mut order, &mut roles, &mut visiting, &mut visited)?;

    Ok(order.into_iter().map(|id| { let role = roles[&id]; (id, role) }).collect())
}

fn visit(
    doc: &IRDocument,
    id: &str,
    role: FunctionRole,
    order: &mut Vec<String>,
    roles: &mut HashMap<String, FunctionRole>,
    visiting: &mut HashSet<String>,
    visited: &mut HashSet<String>,
) -> Result<()> {
    if visited.contains(id) {
        return Ok(());
    }
    if !visiting.insert(id.to_string()) {
        bail!("Recursion detected at function '{id}'");
    }
    let func = doc.function(id).ok_or_else(|| anyhow!("unknown function '{id}' referenced"))?;

    for node in &func.nodes {
        match node.op.as_str() {
            "call_func" => {
                if let Some(callee) = node.prop("func").and_then(|p| p.as_plain_str()) {
                    visit(doc, callee, FunctionRole::Helper, order, roles, visiting, visited)?;
                }
            }
            "cmd_dispatch" => {
                if let Some(callee) = node.prop("func").and_then(|p| p.as_plain_str()) {
                    visit(doc, callee, FunctionRole::Kernel, order, roles, visiting, visited)?;
                }
            }
            "cmd_draw" => {
                if let Some(callee) = node.prop("vertex_func").and_then(|p| p.as_plain_str()) {
                    visit(doc, callee, FunctionRole::Helper, order, roles, visiting, visited)?;
                }
                if let Some(callee) = node.prop("fragment_func").and_then(|p| p.as_plain_str()) {
                    visit(doc, callee, FunctionRole::Helper, order, roles, visiting, visited)?;
                }
            }
            _ => {}
        }
    }

    visiting.remove(id);
    visited.insert(id.to_string());
    if matches!(func.kind, FunctionKind::Shader) {
        order.push(id.to_string());
        roles.insert(id.to_string(), role);
    }
    Ok(())
}

fn builtins_used(doc: &IRDocument, shader_ids: &[String]) -> BTreeSet<String> {
    let mut used = BTreeSet::new();
    for id in shader_ids {
        let Some(func) = doc.function(id) else { continue };
        for node in &func.nodes {
            if node.op == "builtin_get" {
                if let Some(name) = node.prop("name").and_then(|p| p.as_plain_str()) {
                    if crate::schema::BUILTIN_CPU_ALLOWED.contains(&name) {
                        used.insert(name.to_string());
                    }
                }
            }
        }
    }
    used
}

/// Compiles every reachable shader function to MSL and assembles the full
/// source plus its output manifest.
pub fn generate_msl(doc: &IRDocument, typed: &TypedDocument) -> Result<Manifest> {
    let reachable = reachable_functions(doc)?;
    let shader_ids: Vec<String> = reachable.iter().map(|(id, _)| id.clone()).collect();
    let shader_funcs: Vec<&crate::ir::FunctionDef> =
        shader_ids.iter().filter_map(|id| doc.function(id)).collect();

    let used = builtins_used(doc, &shader_ids);
    let layout: Layout = build_layout(doc, &shader_funcs, &used);

    let mut sections = Vec::new();
    sections.push(msl::helpers::HELPER_BLOCK.to_string());
    let structs = msl::emit_struct_defs(doc);
    if !structs.is_empty() {
        sections.push(structs);
    }

    for (id, role) in &reachable {
        let func = doc
            .function(id)
            .ok_or_else(|| anyhow!("unknown function '{id}' referenced during emission"))?;
        let func_edges = edges::reconstruct(func);
        sections.push(msl::emit_function(doc, func, &func_edges, typed, &layout, *role));
    }

    Ok(Manifest {
        code: sections.join("\n"),
        resource_bindings: layout.resource_bindings,
        global_buffer_size: layout.global_buffer_size,
        var_map: layout.var_map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionDef, Metadata, Node, PropValue};

    fn doc_with_cycle() -> IRDocument {
        IRDocument {
            version: "1".into(),
            meta: Metadata::default(),
            entry_point: "a".into(),
            inputs: vec![],
            resources: vec![],
            structs: vec![],
            functions: vec![
                FunctionDef {
                    id: "a".into(),
                    kind: FunctionKind::Shader,
                    inputs: vec![],
                    outputs: vec![],
                    local_vars: vec![],
                    nodes: vec![Node {
                        id: "call".into(),
                        op: "call_func".into(),
                        metadata: None,
                        properties: [("func".to_string(), PropValue::StrRef { base: "b".into(), swizzle: None })]
                            .into_iter()
                            .collect(),
                    }],
                },
                FunctionDef {
                    id: "b".into(),
                    kind: FunctionKind::Shader,
                    inputs: vec![],
                    outputs: vec![],
                    local_vars: vec![],
                    nodes: vec![Node {
                        id: "call".into(),
                        op: "call_func".into(),
                        metadata: None,
                        properties: [("func".to_string(), PropValue::StrRef { base: "a".into(), swizzle: None })]
                            .into_iter()
                            .collect(),
                    }],
                },
            ],
        }
    }

    #[test]
    fn cyclic_call_func_is_a_recursion_error() {
        let doc = doc_with_cycle();
        let err = reachable_functions(&doc).unwrap_err();
        assert!(err.to_string().contains("Recursion detected"));
    }

    #[test]
    fn single_shader_entry_is_reachable_as_a_kernel() {
        let doc = IRDocument {
            version: "1".into(),
            meta: Metadata::default(),
            entry_point: "main".into(),
            inputs: vec![],
            resources: vec![],
            structs: vec![],
            functions: vec![FunctionDef {
                id: "main".into(),
                kind: FunctionKind::Shader,
                inputs: vec![],
                outputs: vec![],
                local_vars: vec![],
                nodes: vec![],
            }],
        };
        let reachable = reachable_functions(&doc).unwrap();
        assert_eq!(reachable, vec![("main".to_string(), FunctionRole::Kernel)]);
    }
}
