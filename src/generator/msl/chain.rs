//! Execution-chain linearization: walks the `exec_*` graph of one function,
//! turning it into an ordered sequence of MSL statements. Pure nodes are
//! only ever emitted on first reference, via [`ExprEmitter::ensure`].

use crate::edges::EdgeSet;
use crate::ir::{FunctionDef, IRDocument, Node};
use crate::schema::is_executable_op;
use crate::validate::TypedDocument;

use super::expr::ExprEmitter;

pub fn emit_body(doc: &IRDocument, func: &FunctionDef, edges: &EdgeSet, types: &TypedDocument) -> String {
    let mut emitter = ExprEmitter::new(doc, func, edges, types);
    let roots = entry_nodes(func, edges);
    for root in &roots {
        emit_chain(&mut emitter, root);
    }
    let scope = emitter.pop_scope();
    scope.lines.join("\n    ")
}

fn entry_nodes<'f>(func: &'f FunctionDef, edges: &EdgeSet) -> Vec<&'f str> {
    func.nodes
        .iter()
        .filter(|n| is_executable_op(&n.op))
        .filter(|n| edges.incoming(&n.id).all(|e| e.to_arg != "exec_in"))
        .map(|n| n.id.as_str())
        .collect()
}

fn emit_chain(emitter: &mut ExprEmitter, start_id: &str) {
    let mut current = Some(start_id.to_string());
    while let Some(node_id) = current {
        let Some(node) = emitter.func.nodes.iter().find(|n| n.id == node_id).cloned() else { break };
        current = emit_node(emitter, &node);
    }
}

/// Emits one executable node's statement(s) and returns the id of the
/// node that continues the chain, if the op has a single successor.
fn emit_node(emitter: &mut ExprEmitter, node: &Node) -> Option<String> {
    match node.op.as_str() {
        "var_set" => {
            let var = node.prop("var").and_then(|p| p.as_plain_str()).unwrap_or("");
            let value = arg(emitter, &node.id, "val");
            push_line(emitter, format!("{var} = {value};"));
            successor(emitter, &node.id, "exec_out")
        }
        "array_set" => {
            let array = node.prop("array").and_then(|p| p.as_plain_str()).unwrap_or("");
            let index = arg(emitter, &node.id, "index");
            let value = arg(emitter, &node.id, "value");
            push_line(emitter, format!("{array}[{index}] = {value};"));
            successor(emitter, &node.id, "exec_out")
        }
        "buffer_store" => {
            let buffer = node.prop("buffer").and_then(|p| p.as_plain_str()).unwrap_or("");
            let index = arg(emitter, &node.id, "index");
            let value = arg(emitter, &node.id, "value");
            push_line(emitter, format!("{buffer}[{index}] = {value};"));
            successor(emitter, &node.id, "exec_out")
        }
        "texture_store" => {
            let tex = node.prop("texture").and_then(|p| p.as_plain_str()).unwrap_or("");
            let coord = arg(emitter, &node.id, "coord");
            let value = arg(emitter, &node.id, "value");
            push_line(emitter, format!("{tex}.write({value}, uint2({coord}));"));
            successor(emitter, &node.id, "exec_out")
        }
        "atomic_store" => {
            let target = node.prop("target").and_then(|p| p.as_plain_str()).unwrap_or("");
            let value = arg(emitter, &node.id, "value");
            push_line(emitter, format!("atomic_store_explicit(&{target}, {value}, memory_order_relaxed);"));
            successor(emitter, &node.id, "exec_out")
        }
        "call_func" => {
            let callee_id = node.prop("func").and_then(|p| p.as_plain_str()).unwrap_or("");
            let mut call_args = vec!["b_globals".to_string()];
            if let Some(callee) = emitter.doc.function(callee_id) {
                for io in &callee.inputs {
                    call_args.push(match emitter.edges.incoming_arg(&node.id, &io.id) {
                        Some(edge) => {
                            let edge = edge.clone();
                            let base = emitter.ensure(&edge.from_node);
                            match &edge.from_swizzle {
                                Some(mask) => format!("{base}.{mask}"),
                                None => base,
                            }
                        }
                        None => "0.0f".to_string(),
                    });
                }
            }
            push_line(emitter, format!("{callee_id}({});", call_args.join(", ")));
            successor(emitter, &node.id, "exec_out")
        }
        "func_return" => {
            match emitter.edges.incoming_arg(&node.id, "value") {
                Some(_) => {
                    let value = arg(emitter, &node.id, "value");
                    push_line(emitter, format!("return {value};"));
                }
                None => push_line(emitter, "return;".to_string()),
            }
            None
        }
        "flow_branch" => {
            let cond = arg(emitter, &node.id, "cond");
            emitter.push_scope();
            if let Some(true_start) = successor(emitter, &node.id, "exec_true") {
                emit_chain(emitter, &true_start);
            }
            let true_scope = emitter.pop_scope();
            emitter.push_scope();
            if let Some(false_start) = successor(emitter, &node.id, "exec_false") {
                emit_chain(emitter, &false_start);
            }
            let false_scope = emitter.pop_scope();
            push_line(emitter, format!("if ({cond}) {{"));
            for line in true_scope.lines {
                push_line(emitter, format!("    {line}"));
            }
            if !false_scope.lines.is_empty() {
                push_line(emitter, "} else {".to_string());
                for line in false_scope.lines {
                    push_line(emitter, format!("    {line}"));
                }
            }
            push_line(emitter, "}".to_string());
            None
        }
        "flow_loop" => {
            let loop_var = format!("_loop_{}", sanitize(&node.id));
            let start = node.prop("start").and_then(|p| p.as_number()).unwrap_or(0.0) as i64;
            let count = node
                .prop("count")
                .and_then(|p| p.as_number())
                .or_else(|| {
                    node.prop("end")
                        .and_then(|p| p.as_number())
                        .map(|end| end - start as f64)
                })
                .unwrap_or(0.0) as i64;
            emitter.push_scope();
            if let Some(body_start) = successor(emitter, &node.id, "exec_body") {
                emit_chain(emitter, &body_start);
            }
            let body_scope = emitter.pop_scope();
            push_line(
                emitter,
                format!(
                    "for (int {loop_var} = {start}; {loop_var} < {}; {loop_var}++) {{",
                    start + count
                ),
            );
            for line in body_scope.lines {
                push_line(emitter, format!("    {line}"));
            }
            push_line(emitter, "}".to_string());
            successor(emitter, &node.id, "exec_completed")
        }
        _ => successor(emitter, &node.id, "exec_out"),
    }
}

fn arg(emitter: &mut ExprEmitter, node_id: &str, name: &str) -> String {
    match emitter.edges.incoming_arg(node_id, name) {
        Some(edge) => {
            let edge = edge.clone();
            let base = emitter.ensure(&edge.from_node);
            match &edge.from_swizzle {
                Some(mask) => format!("{base}.{mask}"),
                None => base,
            }
        }
        None => "0".to_string(),
    }
}

fn successor(emitter: &ExprEmitter, node_id: &str, port: &str) -> Option<String> {
    emitter.edges.outgoing_exec(node_id, port).map(|e| e.to_node.clone())
}

fn push_line(emitter: &mut ExprEmitter, line: String) {
    emitter.scopes.last_mut().expect("at least one scope").lines.push(line);
}

fn sanitize(s: &str) -> String {
    s.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect()
}
