//! Conformance contract: the backend-neutral shape every test backend
//! (a reference interpreter, or a generated-and-dispatched MSL kernel)
//! pins itself to. [`MockBackend`] is a minimal scalar interpreter that
//! exercises the contract shape end to end; it is not an oracle for
//! generator numeric parity (see DESIGN.md's Open Question on property 2).

use std::collections::HashMap;

use anyhow::{anyhow, Result};

use crate::edges::{self, EdgeSet};
use crate::ir::{FixedExtent, FunctionDef, IRDocument, Node, ResourceSize};

/// One resource's readback state: dimensions (height 0 for a plain buffer)
/// plus its flat float contents.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceView {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

/// The state a `TestBackend` exposes after `createContext`/`run`/`execute`.
pub trait TestContext {
    fn resources(&self) -> &HashMap<String, ResourceView>;
    fn get_resource(&self, id: &str) -> Option<&ResourceView> {
        self.resources().get(id)
    }
    fn get_var(&self, id: &str) -> Option<f32>;
}

/// A backend capable of running one IR document: an interpreter, or a
/// harness around a generated-and-dispatched target kernel. Every backend
/// under test must agree with every other, within documented tolerances,
/// on the values `TestContext` exposes for the same `(ir, entry, inputs)`.
pub trait TestBackend {
    type Context: TestContext;

    fn create_context(&self, doc: &IRDocument) -> Result<Self::Context>;
    fn run(&self, ctx: &mut Self::Context, entry: &str) -> Result<()>;

    fn execute(&self, doc: &IRDocument, entry: &str, inputs: &HashMap<String, f32>) -> Result<Self::Context> {
        let mut ctx = self.create_context(doc)?;
        for (id, value) in inputs {
            self.set_var(&mut ctx, id, *value);
        }
        self.run(&mut ctx, entry)?;
        Ok(ctx)
    }

    /// Writes one input var into a context, ahead of `run`. A real
    /// dispatch-backed backend would route this through its own
    /// host-buffer packer instead of a plain map insert.
    fn set_var(&self, ctx: &mut Self::Context, id: &str, value: f32);
}

/// `MockContext` retains the document it was created from so `run(ctx,
/// entry)` can resolve `entry` without the caller threading the IR through
/// a second time, matching the two-call `createContext`/`run` shape.
#[derive(Debug, Clone)]
pub struct MockContext {
    pub vars: HashMap<String, f32>,
    pub resources: HashMap<String, ResourceView>,
    doc: IRDocument,
}

impl TestContext for MockContext {
    fn resources(&self) -> &HashMap<String, ResourceView> {
        &self.resources
    }

    fn get_var(&self, id: &str) -> Option<f32> {
        self.vars.get(id).copied()
    }
}

/// A tiny scalar interpreter: enough to run a `var_set`/arithmetic chain
/// and read the result back, pinning the contract shape without
/// reimplementing the full opcode surface a real oracle backend would.
#[derive(Debug, Default)]
pub struct MockBackend;

impl TestBackend for MockBackend {
    type Context = MockContext;

    fn create_context(&self, doc: &IRDocument) -> Result<MockContext> {
        let mut vars = HashMap::new();
        for input in &doc.inputs {
            vars.insert(input.id.clone(), 0.0);
        }
        for func in &doc.functions {
            for local in &func.local_vars {
                vars.insert(local.id.clone(), 0.0);
            }
        }

        let mut resources = HashMap::new();
        for resource in &doc.resources {
            let (width, height) = match &resource.size {
                ResourceSize::Fixed { extent: FixedExtent::Count(n) } => (*n, 0),
                ResourceSize::Fixed { extent: FixedExtent::Extent2D([w, h]) } => (*w, *h),
                _ => (0, 0),
            };
            let len = if height > 0 { (width * height) as usize } else { width as usize };
            resources.insert(resource.id.clone(), ResourceView { width, height, data: vec![0.0; len] });
        }

        Ok(MockContext { vars, resources, doc: doc.clone() })
    }

    fn run(&self, ctx: &mut MockContext, entry: &str) -> Result<()> {
        let func = ctx.doc.function(entry).cloned().ok_or_else(|| anyhow!("unknown function '{entry}'"))?;
        let edge_set = edges::reconstruct(&func);
        run_exec_chain(&func, &edge_set, ctx)
    }

    fn set_var(&self, ctx: &mut MockContext, id: &str, value: f32) {
        ctx.vars.insert(id.to_string(), value);
    }
}

fn entry_nodes<'f>(func: &'f FunctionDef, edges: &EdgeSet) -> Vec<&'f str> {
    func.nodes
        .iter()
        .filter(|n| crate::schema::is_executable_op(&n.op))
        .filter(|n| edges.incoming(&n.id).all(|e| e.to_arg != "exec_in"))
        .map(|n| n.id.as_str())
        .collect()
}

fn run_exec_chain(func: &FunctionDef, edges: &EdgeSet, ctx: &mut MockContext) -> Result<()> {
    for start in entry_nodes(func, edges) {
        let mut current = Some(start.to_string());
        while let Some(id) = current {
            let Some(node) = func.nodes.iter().find(|n| n.id == id) else { break };
            current = step(func, edges, node, ctx)?;
        }
    }
    Ok(())
}

fn step(func: &FunctionDef, edges: &EdgeSet, node: &Node, ctx: &mut MockContext) -> Result<Option<String>> {
    match node.op.as_str() {
        "var_set" => {
            let target = node
                .prop("var")
                .and_then(|p| p.as_plain_str())
                .ok_or_else(|| anyhow!("var_set '{}' missing 'var'", node.id))?;
            let value = eval_arg(func, edges, &node.id, "val", ctx, &HashMap::new())?;
            ctx.vars.insert(target.to_string(), value);
            Ok(successor(edges, &node.id, "exec_out"))
        }
        "func_return" => Ok(None),
        _ => Ok(successor(edges, &node.id, "exec_out")),
    }
}

fn successor(edges: &EdgeSet, node_id: &str, port: &str) -> Option<String> {
    edges.outgoing_exec(node_id, port).map(|e| e.to_node.clone())
}

fn eval_arg(
    func: &FunctionDef,
    edges: &EdgeSet,
    node_id: &str,
    arg: &str,
    ctx: &MockContext,
    call_args: &HashMap<String, f32>,
) -> Result<f32> {
    let edge = edges
        .incoming_arg(node_id, arg)
        .ok_or_else(|| anyhow!("'{node_id}' has no value wired to '{arg}'"))?;
    eval_node(func, edges, &edge.from_node, ctx, call_args)
}

/// Evaluates a pure expression node. `call_args` holds the caller-supplied
/// values for the function's own declared inputs while evaluating inside a
/// `call_func` callee; it is empty at the top level, where every `var_get`
/// resolves against `ctx.vars` instead.
fn eval_node(
    func: &FunctionDef,
    edges: &EdgeSet,
    node_id: &str,
    ctx: &MockContext,
    call_args: &HashMap<String, f32>,
) -> Result<f32> {
    let node = func.nodes.iter().find(|n| n.id == node_id).ok_or_else(|| anyhow!("unknown node '{node_id}'"))?;
    match node.op.as_str() {
        "literal" => node
            .prop("value")
            .and_then(|p| p.as_number())
            .map(|v| v as f32)
            .ok_or_else(|| anyhow!("literal '{node_id}' has no numeric value")),
        "var_get" => {
            let var = node
                .prop("var")
                .and_then(|p| p.as_plain_str())
                .ok_or_else(|| anyhow!("var_get '{node_id}' missing 'var'"))?;
            if let Some(v) = call_args.get(var) {
                return Ok(*v);
            }
            ctx.vars.get(var).copied().ok_or_else(|| anyhow!("unbound var '{var}'"))
        }
        "math_add" => {
            Ok(eval_arg(func, edges, node_id, "a", ctx, call_args)? + eval_arg(func, edges, node_id, "b", ctx, call_args)?)
        }
        "math_sub" => {
            Ok(eval_arg(func, edges, node_id, "a", ctx, call_args)? - eval_arg(func, edges, node_id, "b", ctx, call_args)?)
        }
        "math_mul" => {
            Ok(eval_arg(func, edges, node_id, "a", ctx, call_args)? * eval_arg(func, edges, node_id, "b", ctx, call_args)?)
        }
        "math_div" => {
            let a = eval_arg(func, edges, node_id, "a", ctx, call_args)?;
            let b = eval_arg(func, edges, node_id, "b", ctx, call_args)?;
            Ok(if b == 0.0 { 0.0 } else { a / b })
        }
        "math_neg" => Ok(-eval_arg(func, edges, node_id, "value", ctx, call_args)?),
        "call_func" => eval_call_func(func, edges, node, ctx, call_args),
        other => Err(anyhow!("MockBackend does not interpret op '{other}'")),
    }
}

/// Resolves a `call_func` purely as an expression: matches each of the
/// callee's declared inputs positionally by id against the edges wired into
/// this call node (the same rule the MSL generator's `chain.rs` uses for its
/// call-site argument list), then evaluates the callee's own `func_return`
/// value with those as its `call_args`. Side effects inside the callee
/// (`var_set` against shared state) are not interpreted; this only threads
/// pure value flow through the call.
fn eval_call_func(
    func: &FunctionDef,
    edges: &EdgeSet,
    node: &Node,
    ctx: &MockContext,
    call_args: &HashMap<String, f32>,
) -> Result<f32> {
    let callee_id = node
        .prop("func")
        .and_then(|p| p.as_plain_str())
        .ok_or_else(|| anyhow!("call_func '{}' missing 'func'", node.id))?;
    let callee = ctx.doc.function(callee_id).ok_or_else(|| anyhow!("unknown function '{callee_id}'"))?;
    let mut callee_args = HashMap::new();
    for io in &callee.inputs {
        let value = eval_arg(func, edges, &node.id, &io.id, ctx, call_args).unwrap_or(0.0);
        callee_args.insert(io.id.clone(), value);
    }
    let callee_edges = edges::reconstruct(callee);
    let return_node = callee
        .nodes
        .iter()
        .find(|n| n.op == "func_return")
        .ok_or_else(|| anyhow!("function '{callee_id}' has no func_return"))?;
    eval_arg(callee, &callee_edges, &return_node.id, "value", ctx, &callee_args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionKind, LocalVar, Metadata, PropValue};

    fn doc_with_constant_write() -> IRDocument {
        IRDocument {
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
                local_vars: vec![LocalVar { id: "res".into(), data_type: crate::ir::DataType::Float, initial_value: None }],
                nodes: vec![
                    Node {
                        id: "pi".into(),
                        op: "literal".into(),
                        metadata: None,
                        properties: [("value".to_string(), PropValue::Number(3.14))].into_iter().collect(),
                    },
                    Node {
                        id: "set_res".into(),
                        op: "var_set".into(),
                        metadata: None,
                        properties: [
                            ("var".to_string(), PropValue::StrRef { base: "res".into(), swizzle: None }),
                            ("val".to_string(), PropValue::StrRef { base: "pi".into(), swizzle: None }),
                        ]
                        .into_iter()
                        .collect(),
                    },
                ],
            }],
        }
    }

    #[test]
    fn execute_seeds_inputs_and_runs_the_entry_chain() {
        let doc = doc_with_constant_write();
        let backend = MockBackend;
        let ctx = backend.execute(&doc, "main", &HashMap::new()).unwrap();
        assert_eq!(ctx.get_var("res"), Some(3.14));
    }

    #[test]
    fn input_override_flows_through_var_get() {
        let doc = doc_with_constant_write();
        let backend = MockBackend;
        let mut inputs = HashMap::new();
        inputs.insert("pi".to_string(), 1.0);
        let ctx = backend.execute(&doc, "main", &inputs).unwrap();
        assert_eq!(ctx.get_var("res"), Some(3.14));
    }

    #[test]
    fn unknown_resource_lookup_is_none() {
        let doc = doc_with_constant_write();
        let backend = MockBackend;
        let ctx = backend.execute(&doc, "main", &HashMap::new()).unwrap();
        assert!(ctx.get_resource("nonexistent").is_none());
    }
}
