//! Pure-node expression lowering, with scope-correct deduplication: a pure
//! node referenced more than once within a scope (or from a nested scope)
//! is computed once and bound to a local, rather than re-emitted inline at
//! every use site.

use std::collections::HashMap;

use crate::edges::{EdgeSet, PathSegment};
use crate::ir::{DataType, FunctionDef, IRDocument, Node};
use crate::validate::TypedDocument;

use super::types::msl_type_name;

/// One lexical block's emitted `let` bindings, in order.
#[derive(Default)]
pub struct Scope {
    pub bindings: HashMap<String, String>,
    pub lines: Vec<String>,
}

pub struct ExprEmitter<'a> {
    pub doc: &'a IRDocument,
    pub func: &'a FunctionDef,
    pub edges: &'a EdgeSet,
    pub types: &'a TypedDocument,
    pub scopes: Vec<Scope>,
    next_temp: u32,
}

impl<'a> ExprEmitter<'a> {
    pub fn new(doc: &'a IRDocument, func: &'a FunctionDef, edges: &'a EdgeSet, types: &'a TypedDocument) -> Self {
        ExprEmitter { doc, func, edges, types, scopes: vec![Scope::default()], next_temp: 0 }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop_scope(&mut self) -> Scope {
        self.scopes.pop().expect("scope stack underflow")
    }

    fn node_ty(&self, node_id: &str) -> DataType {
        self.types
            .node_type(&self.func.id, node_id)
            .cloned()
            .unwrap_or(DataType::Float)
    }

    fn find_binding(&self, node_id: &str) -> Option<String> {
        self.scopes.iter().rev().find_map(|s| s.bindings.get(node_id).cloned())
    }

    fn fresh_name(&mut self, hint: &str) -> String {
        self.next_temp += 1;
        format!("_t{}_{}", self.next_temp, sanitize(hint))
    }

    /// Returns the MSL variable name holding `node_id`'s value, emitting a
    /// declaration in the current scope if this is the first reference
    /// anywhere on the active scope stack.
    pub fn ensure(&mut self, node_id: &str) -> String {
        if let Some(name) = self.find_binding(node_id) {
            return name;
        }
        let node = self.func.nodes.iter().find(|n| n.id == node_id).cloned();
        let Some(node) = node else { return "0".to_string() };
        let expr = self.lower(&node);
        let ty = self.node_ty(node_id);
        let name = self.fresh_name(&node.id);
        let line = format!("const {} {} = {};", msl_type_name(&ty), name, expr);
        let scope = self.scopes.last_mut().expect("at least one scope");
        scope.lines.push(line);
        scope.bindings.insert(node_id.to_string(), name.clone());
        name
    }

    fn arg(&mut self, node_id: &str, arg: &str) -> String {
        match self.edges.incoming_arg(node_id, arg) {
            Some(edge) => {
                let edge = edge.clone();
                let base = self.ensure(&edge.from_node);
                match &edge.from_swizzle {
                    Some(mask) => format!("{base}.{mask}"),
                    None => base,
                }
            }
            None => "0".to_string(),
        }
    }

    fn arg_at_index(&mut self, node_id: &str, arg: &str, index: usize) -> Option<String> {
        let edge = self
            .edges
            .incoming(node_id)
            .find(|e| e.to_arg == arg && matches!(&e.to_path, Some(PathSegment::Index(i)) if *i == index))?
            .clone();
        let base = self.ensure(&edge.from_node);
        Some(match &edge.from_swizzle {
            Some(mask) => format!("{base}.{mask}"),
            None => base,
        })
    }

    fn arg_at_key(&mut self, node_id: &str, arg: &str, key: &str) -> Option<String> {
        let edge = self
            .edges
            .incoming(node_id)
            .find(|e| e.to_arg == arg && matches!(&e.to_path, Some(PathSegment::Key(k)) if k == key))?
            .clone();
        let base = self.ensure(&edge.from_node);
        Some(match &edge.from_swizzle {
            Some(mask) => format!("{base}.{mask}"),
            None => base,
        })
    }

    fn lower(&mut self, node: &Node) -> String {
        match node.op.as_str() {
            "literal" => lower_literal(node),
            "const_get" => lower_literal(node),
            "builtin_get" => lower_builtin_get(node),
            "var_get" => node.prop("var").and_then(|p| p.as_plain_str()).unwrap_or("0").to_string(),
            "loop_index" => {
                let loop_id = node.prop("loop").and_then(|p| p.as_plain_str()).unwrap_or("i");
                format!("_loop_{}", sanitize(loop_id))
            }
            "vec_swizzle" => {
                let base = self.arg(&node.id, "vec");
                let mask = node.prop("channels").and_then(|p| p.as_plain_str()).unwrap_or("x");
                format!("{base}.{mask}")
            }
            "vec_get_element" => {
                let base = self.arg(&node.id, "source");
                let index = self.arg(&node.id, "index");
                format!("{base}[{index}]")
            }
            "vec_dot" => self.binary_call("dot", node),
            "vec_cross" => self.binary_call("cross", node),
            "vec_normalize" => self.unary_call("normalize", node),
            "vec_length" => self.unary_call("length", node),
            "vec_distance" => self.binary_call("distance", node),
            "vec_reflect" => self.binary_call("reflect", node),
            "mat_identity" => lower_mat_identity(node),
            "mat_transpose" => self.unary_call("transpose", node),
            "mat_inverse" => lower_mat_inverse(self, node),
            "mat_mul" => {
                let a = self.arg(&node.id, "a");
                let b = self.arg(&node.id, "b");
                format!("({a} * {b})")
            }
            "quat_identity" => "float4(0.0, 0.0, 0.0, 1.0)".to_string(),
            "quat_mul" => self.binary_call("quat_mul_impl", node),
            "quat_rotate" => {
                let quat = self.arg(&node.id, "quat");
                let vec = self.arg(&node.id, "vec");
                format!("quat_rotate_impl({quat}, {vec})")
            }
            "quat_slerp" => self.ternary_call("quat_slerp_impl", node, "a", "b", "t"),
            "quat_from_axis_angle" => {
                let axis = self.arg(&node.id, "axis");
                let angle = self.arg(&node.id, "angle");
                format!("quat_from_axis_angle_impl({axis}, {angle})")
            }
            "quat_to_mat4" => self.unary_call("quat_to_mat4_impl", node),
            "color_mix" => self.ternary_call("color_mix_impl", node, "a", "b", "t"),
            "struct_construct" => self.lower_struct_construct(node),
            "struct_extract" => {
                let source = self.arg(&node.id, "source");
                let member = node.prop("member").and_then(|p| p.as_plain_str()).unwrap_or("");
                format!("{source}.{member}")
            }
            "array_construct" => self.lower_array_construct(node),
            "array_extract" => {
                let array = self.arg(&node.id, "array");
                let index = self.arg(&node.id, "index");
                format!("{array}[{index}]")
            }
            "array_length" => {
                let ty = self.node_ty_of_arg_source(node, "array");
                match ty {
                    Some(DataType::Array(_, n)) => n.to_string(),
                    _ => "0".to_string(),
                }
            }
            "buffer_load" => {
                let buffer = node.prop("buffer").and_then(|p| p.as_plain_str()).unwrap_or("");
                let index = self.arg(&node.id, "index");
                format!("{buffer}[{index}]")
            }
            "texture_sample" => {
                let tex = node.prop("texture").and_then(|p| p.as_plain_str()).unwrap_or("");
                let uv = self.arg(&node.id, "uv");
                format!("{tex}.sample(_sampler_{tex}, {uv})")
            }
            "texture_load" => {
                let tex = node.prop("texture").and_then(|p| p.as_plain_str()).unwrap_or("");
                let coord = self.arg(&node.id, "coord");
                format!("{tex}.read(uint2({coord}))")
            }
            "resource_get_size" => {
                let resource = node.prop("resource").and_then(|p| p.as_plain_str()).unwrap_or("");
                format!("float2({resource}.get_width(), {resource}.get_height())")
            }
            "resource_get_format" => {
                let resource = node.prop("resource").and_then(|p| p.as_plain_str()).unwrap_or("");
                format!("_format_of_{resource}")
            }
            "atomic_load" => {
                let target = node.prop("target").and_then(|p| p.as_plain_str()).unwrap_or("");
                format!("atomic_load_explicit(&{target}, memory_order_relaxed)")
            }
            "atomic_add" | "atomic_sub" | "atomic_min" | "atomic_max" | "atomic_exchange" => {
                let target = node.prop("target").and_then(|p| p.as_plain_str()).unwrap_or("");
                let value = self.arg(&node.id, "value");
                let fn_name = match node.op.as_str() {
                    "atomic_add" => "atomic_fetch_add_explicit",
                    "atomic_sub" => "atomic_fetch_sub_explicit",
                    "atomic_min" => "atomic_fetch_min_explicit",
                    "atomic_max" => "atomic_fetch_max_explicit",
                    _ => "atomic_exchange_explicit",
                };
                format!("{fn_name}(&{target}, {value}, memory_order_relaxed)")
            }
            "static_cast_int" => {
                let value = self.arg(&node.id, "value");
                format!("safe_cast_int_impl({value})")
            }
            op if op.starts_with("static_cast_") => {
                let target = crate::ir::DataType::parse(&op["static_cast_".len()..]).unwrap_or(DataType::Float);
                let value = self.arg(&node.id, "value");
                format!("{}({value})", msl_type_name(&target))
            }
            op if crate::schema::is_vector_constructor(op) => self.lower_vector_constructor(node),
            op if op.starts_with("math_") => self.lower_math(node),
            _ => "0".to_string(),
        }
    }

    fn node_ty_of_arg_source(&mut self, node: &Node, arg: &str) -> Option<DataType> {
        let edge = self.edges.incoming_arg(&node.id, arg)?;
        self.types.node_type(&self.func.id, &edge.from_node).cloned()
    }

    fn unary_call(&mut self, name: &str, node: &Node) -> String {
        let v = self.arg(&node.id, "value");
        format!("{name}({v})")
    }

    fn binary_call(&mut self, name: &str, node: &Node) -> String {
        let a = self.arg(&node.id, "a");
        let b = self.arg(&node.id, "b");
        format!("{name}({a}, {b})")
    }

    fn ternary_call(&mut self, name: &str, node: &Node, a: &str, b: &str, c: &str) -> String {
        let av = self.arg(&node.id, a);
        let bv = self.arg(&node.id, b);
        let cv = self.arg(&node.id, c);
        format!("{name}({av}, {bv}, {cv})")
    }

    fn lower_struct_construct(&mut self, node: &Node) -> String {
        let Some(type_name) = node.prop("type").and_then(|p| p.as_plain_str()) else {
            return "{}".to_string();
        };
        let Some(def) = self.doc.struct_def(type_name).cloned() else { return "{}".to_string() };
        let mut parts = Vec::new();
        for member in &def.members {
            let v = self.arg_at_key(&node.id, "values", &member.id).unwrap_or_else(|| "0".to_string());
            parts.push(v);
        }
        format!("{}{{ {} }}", type_name, parts.join(", "))
    }

    fn lower_array_construct(&mut self, node: &Node) -> String {
        let indices: Vec<usize> = self
            .edges
            .incoming(&node.id)
            .filter(|e| e.to_arg == "values")
            .filter_map(|e| match &e.to_path {
                Some(PathSegment::Index(i)) => Some(*i),
                _ => None,
            })
            .collect();
        let len = indices.iter().max().copied().map(|m| m + 1).unwrap_or(0);
        let mut parts = Vec::with_capacity(len);
        for i in 0..len {
            parts.push(self.arg_at_index(&node.id, "values", i).unwrap_or_else(|| "0".to_string()));
        }
        format!("{{ {} }}", parts.join(", "))
    }

    fn lower_vector_constructor(&mut self, node: &Node) -> String {
        let mut arg_names: Vec<String> = self
            .edges
            .incoming_data(&node.id)
            .map(|e| e.to_arg.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        // Component-group keys (`x`,`xy`,`xyz`,`xyzw`,`y`,...,`w`) name the
        // lanes they fill, not an arbitrary label; MSL's constructor fills
        // lanes positionally, so groups must be ordered by the first lane
        // each one covers, not by string order ("w" < "x" < "y" < "z").
        arg_names.sort_by_key(|name| component_group_start_lane(name));
        let args: Vec<String> = arg_names.into_iter().map(|arg_name| self.arg(&node.id, &arg_name)).collect();
        format!("{}({})", node.op, args.join(", "))
    }

    fn lower_math(&mut self, node: &Node) -> String {
        match node.op.as_str() {
            "math_add" => format!("({} + {})", self.arg(&node.id, "a"), self.arg(&node.id, "b")),
            "math_sub" => format!("({} - {})", self.arg(&node.id, "a"), self.arg(&node.id, "b")),
            "math_mul" => format!("({} * {})", self.arg(&node.id, "a"), self.arg(&node.id, "b")),
            "math_div" => {
                let is_int = matches!(self.node_ty_of_arg_source(node, "a"), Some(ref t) if t.is_int_family());
                let fn_name = if is_int { "safe_div_i" } else { "safe_div_f" };
                self.binary_call(fn_name, node)
            }
            "math_mod" => self.binary_call("fmod", node),
            "math_pow" => self.binary_call("pow", node),
            "math_min" => self.binary_call("min", node),
            "math_max" => self.binary_call("max", node),
            "math_atan2" => self.binary_call("atan2", node),
            "math_gt" => self.binary_call("cmp_gt_impl", node),
            "math_lt" => self.binary_call("cmp_lt_impl", node),
            "math_ge" => self.binary_call("cmp_ge_impl", node),
            "math_le" => self.binary_call("cmp_le_impl", node),
            "math_eq" => self.binary_call("cmp_eq_impl", node),
            "math_neq" => self.binary_call("cmp_neq_impl", node),
            "math_and" => format!("({} && {})", self.arg(&node.id, "a"), self.arg(&node.id, "b")),
            "math_or" => format!("({} || {})", self.arg(&node.id, "a"), self.arg(&node.id, "b")),
            "math_xor" => format!("({} != {})", self.arg(&node.id, "a"), self.arg(&node.id, "b")),
            "math_not" => format!("(!{})", self.arg(&node.id, "value")),
            "math_neg" => format!("(-{})", self.arg(&node.id, "value")),
            "math_abs" => self.unary_call("abs", node),
            "math_sqrt" => self.unary_call("sqrt", node),
            "math_floor" => self.unary_call("floor", node),
            "math_ceil" => self.unary_call("ceil", node),
            "math_round" => self.unary_call("round", node),
            "math_sin" => self.unary_call("sin", node),
            "math_cos" => self.unary_call("cos", node),
            "math_tan" => self.unary_call("tan", node),
            "math_asin" => self.unary_call("asin", node),
            "math_acos" => self.unary_call("acos", node),
            "math_atan" => self.unary_call("atan", node),
            "math_exp" => self.unary_call("exp", node),
            "math_log" => self.unary_call("log", node),
            "math_sign" => self.unary_call("sign", node),
            "math_fract" => self.unary_call("fract", node),
            "math_pi" => "3.14159265358979323846".to_string(),
            "math_e" => "2.71828182845904523536".to_string(),
            _ => "0".to_string(),
        }
    }
}

fn lower_literal(node: &Node) -> String {
    let ty_str = node.prop("type").and_then(|p| p.as_plain_str()).unwrap_or("float");
    let value = node.prop("value");
    match value {
        Some(crate::ir::PropValue::Number(n)) => {
            if ty_str == "int" {
                format!("{}", *n as i64)
            } else if ty_str == "bool" {
                (*n != 0.0).to_string()
            } else {
                format!("{n:?}")
            }
        }
        Some(crate::ir::PropValue::Bool(b)) => b.to_string(),
        _ => "0".to_string(),
    }
}

fn lower_builtin_get(node: &Node) -> String {
    let name = node.prop("name").and_then(|p| p.as_plain_str()).unwrap_or("");
    match name {
        "global_invocation_id" => "int3(gid)".to_string(),
        "normalized_global_invocation_id" => "(float3(gid) / float3(_output_size))".to_string(),
        "output_size" => "_output_size".to_string(),
        "vertex_index" => "int(vid)".to_string(),
        "frag_coord" => "frag_coord".to_string(),
        "front_facing" => "front_facing".to_string(),
        "num_workgroups" => "_num_workgroups".to_string(),
        "time" => "_globals.time".to_string(),
        "delta_time" => "_globals.delta_time".to_string(),
        "bpm" => "_globals.bpm".to_string(),
        "beat_number" => "_globals.beat_number".to_string(),
        "beat_delta" => "_globals.beat_delta".to_string(),
        other => format!("_builtin_{}", sanitize(other)),
    }
}

fn lower_mat_identity(node: &Node) -> String {
    match node.prop("size").and_then(|p| p.as_number()) {
        Some(n) if n as i64 == 3 => "float3x3(1.0)".to_string(),
        _ => "float4x4(1.0)".to_string(),
    }
}

fn lower_mat_inverse(emitter: &mut ExprEmitter, node: &Node) -> String {
    let v = emitter.arg(&node.id, "value");
    match emitter.node_ty_of_arg_source(node, "value") {
        Some(DataType::Float3x3) => format!("mat3_inverse_impl({v})"),
        _ => format!("mat4_inverse_impl({v})"),
    }
}

/// The lane a component-group key starts at, per its leading channel letter
/// (`"x"` -> 0, `"yz"` -> 1, `"xyzw"` -> 0, ...). Groups partition the target
/// vector exactly once, so this is enough to order them for a positional
/// constructor call.
fn component_group_start_lane(key: &str) -> usize {
    key.chars().next().and_then(|c| "xyzw".find(c)).unwrap_or(usize::MAX)
}

fn sanitize(s: &str) -> String {
    s.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect()
}
