//! Type inference: resolves every pure node's output [`DataType`], memoized
//! per `(function, node)` so a value fanning out to many consumers is only
//! ever type-checked once.

use std::collections::HashMap;

use crate::edges::EdgeSet;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::ir::{DataType, FunctionDef, IRDocument, Node};
use crate::schema::{self, TypeToken};

use super::coerce::{coercion_from_to, violates_strict_vector_rule};

pub struct InferResult {
    pub types: HashMap<String, DataType>,
    pub diagnostics: Vec<Diagnostic>,
}

enum Resolution {
    Ok(DataType),
    /// Already reported; callers should not double-report for this node.
    Failed,
}

pub fn infer_function(doc: &IRDocument, func: &FunctionDef, edges: &EdgeSet) -> InferResult {
    let mut ctx = Ctx {
        doc,
        func,
        edges,
        cache: HashMap::new(),
        visiting: Default::default(),
        diagnostics: Vec::new(),
    };
    for node in &func.nodes {
        if schema::is_pure_op(&node.op) {
            ctx.resolve(&node.id);
        }
    }
    for node in &func.nodes {
        if node.op == "buffer_store" {
            ctx.check_buffer_store(node);
        }
    }
    InferResult { types: ctx.cache, diagnostics: ctx.diagnostics }
}

struct Ctx<'a> {
    doc: &'a IRDocument,
    func: &'a FunctionDef,
    edges: &'a EdgeSet,
    cache: HashMap<String, DataType>,
    visiting: std::collections::HashSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Ctx<'a> {
    fn resolve(&mut self, node_id: &str) -> Resolution {
        if let Some(ty) = self.cache.get(node_id) {
            return Resolution::Ok(ty.clone());
        }
        if !self.visiting.insert(node_id.to_string()) {
            self.err(node_id, DiagnosticKind::Structural, "data dependency cycle detected");
            return Resolution::Failed;
        }
        let node = match self.func.nodes.iter().find(|n| n.id == node_id) {
            Some(n) => n,
            None => {
                self.visiting.remove(node_id);
                return Resolution::Failed;
            }
        };
        let result = self.infer_node(node);
        self.visiting.remove(node_id);
        if let Resolution::Ok(ty) = &result {
            self.cache.insert(node_id.to_string(), ty.clone());
        }
        result
    }

    fn err(&mut self, node_id: &str, kind: DiagnosticKind, message: impl Into<String>) {
        self.diagnostics.push(
            Diagnostic::error(kind, message).in_function(&self.func.id).at_node(node_id),
        );
    }

    fn input_type(&mut self, node_id: &str, arg: &str) -> Option<DataType> {
        let Some(edge) = self.edges.incoming_arg(node_id, arg) else {
            self.err(node_id, DiagnosticKind::Reference, format!("arg '{arg}' has no connected input"));
            return None;
        };
        let edge = edge.clone();
        match self.resolve(&edge.from_node) {
            Resolution::Ok(mut ty) => {
                if let Some(mask) = &edge.from_swizzle {
                    ty = self.apply_swizzle(node_id, &ty, mask)?;
                }
                Some(ty)
            }
            Resolution::Failed => None,
        }
    }

    fn apply_swizzle(&mut self, node_id: &str, source: &DataType, mask: &str) -> Option<DataType> {
        let lanes = source.lanes()?;
        for c in mask.chars() {
            let Some(idx) = "xyzw".find(c).or_else(|| "rgba".find(c)) else {
                self.err(node_id, DiagnosticKind::Type, format!("Invalid swizzle component '{c}'"));
                return None;
            };
            if idx as u32 >= lanes {
                self.err(
                    node_id,
                    DiagnosticKind::Type,
                    format!("swizzle '{mask}' out of bounds for a {lanes}-lane vector"),
                );
                return None;
            }
        }
        let elem_is_float = source.is_float_family();
        Some(match (mask.len(), elem_is_float) {
            (1, true) => DataType::Float,
            (1, false) => DataType::Int,
            (2, true) => DataType::Float2,
            (2, false) => DataType::Int2,
            (3, true) => DataType::Float3,
            (3, false) => DataType::Int3,
            (4, true) => DataType::Float4,
            (4, false) => DataType::Int4,
            _ => return None,
        })
    }

    fn infer_node(&mut self, node: &Node) -> Resolution {
        let op = node.op.as_str();
        match op {
            "literal" => self.infer_literal(node),
            "const_get" => self.infer_literal(node),
            "builtin_get" => self.infer_builtin_get(node),
            "loop_index" => Resolution::Ok(DataType::Int),
            "var_get" => self.infer_var_get(node),
            "struct_construct" => self.infer_struct_construct(node),
            "struct_extract" => self.infer_struct_extract(node),
            "array_construct" => self.infer_array_construct(node),
            "array_extract" => self.infer_array_extract(node),
            "array_length" => {
                let _ = self.input_type(&node.id, "array");
                Resolution::Ok(DataType::Int)
            }
            "vec_swizzle" => self.infer_vec_swizzle(node),
            "vec_get_element" => self.infer_vec_get_element(node),
            "buffer_load" => self.infer_buffer_load(node),
            "texture_sample" | "texture_load" => Resolution::Ok(DataType::Float4),
            "resource_get_size" => Resolution::Ok(DataType::Float2),
            "resource_get_format" => Resolution::Ok(DataType::Int),
            "atomic_load" | "atomic_add" | "atomic_sub" | "atomic_min" | "atomic_max"
            | "atomic_exchange" => Resolution::Ok(DataType::Int),
            _ if schema::is_vector_constructor(op) => self.infer_vector_constructor(node),
            _ if op.starts_with("mat_") || op.starts_with("quat_") || op == "color_mix"
                || op.starts_with("static_cast_") =>
            {
                self.infer_via_signatures(node)
            }
            _ if op.starts_with("math_") => self.infer_math(node),
            _ if op.starts_with("vec_") => self.infer_via_signatures(node),
            _ => Resolution::Failed,
        }
    }

    fn infer_literal(&mut self, node: &Node) -> Resolution {
        let Some(ty_str) = node.prop("type").and_then(|p| p.as_plain_str()) else {
            self.err(&node.id, DiagnosticKind::Schema, "missing 'type' property");
            return Resolution::Failed;
        };
        match DataType::parse(ty_str) {
            Ok(ty) => Resolution::Ok(ty),
            Err(e) => {
                self.err(&node.id, DiagnosticKind::Schema, e);
                Resolution::Failed
            }
        }
    }

    fn infer_builtin_get(&mut self, node: &Node) -> Resolution {
        let Some(name) = node.prop("name").and_then(|p| p.as_plain_str()) else {
            self.err(&node.id, DiagnosticKind::Schema, "missing 'name' property");
            return Resolution::Failed;
        };
        match schema::BUILTIN_TYPES.get(name) {
            Some(ty) => {
                if self.func.kind == crate::ir::FunctionKind::Cpu
                    && !schema::BUILTIN_CPU_ALLOWED.contains(&name)
                {
                    self.err(
                        &node.id,
                        DiagnosticKind::Structural,
                        format!("builtin '{name}' is not available in a cpu function"),
                    );
                    return Resolution::Failed;
                }
                Resolution::Ok(ty.clone())
            }
            None => {
                self.err(&node.id, DiagnosticKind::Reference, format!("unknown builtin '{name}'"));
                Resolution::Failed
            }
        }
    }

    fn infer_var_get(&mut self, node: &Node) -> Resolution {
        let Some(var_id) = node.prop("var").and_then(|p| p.as_plain_str()) else {
            self.err(&node.id, DiagnosticKind::Schema, "missing 'var' property");
            return Resolution::Failed;
        };
        if let Some(local) = self.func.local_vars.iter().find(|v| v.id == var_id) {
            return Resolution::Ok(local.data_type.clone());
        }
        if let Some(input) = self.doc.input(var_id) {
            return Resolution::Ok(input.data_type.clone());
        }
        self.err(&node.id, DiagnosticKind::Reference, format!("unknown variable '{var_id}'"));
        Resolution::Failed
    }

    fn infer_struct_construct(&mut self, node: &Node) -> Resolution {
        let Some(type_name) = node.prop("type").and_then(|p| p.as_plain_str()) else {
            self.err(&node.id, DiagnosticKind::Schema, "missing 'type' property");
            return Resolution::Failed;
        };
        let Some(def) = self.doc.struct_def(type_name) else {
            self.err(&node.id, DiagnosticKind::Reference, format!("unknown struct '{type_name}'"));
            return Resolution::Failed;
        };
        let def = def.clone();
        let mut ok = true;
        for member in &def.members {
            match self.value_type_at(&node.id, "values", member.id.as_str()) {
                Some(ty) if ty == member.data_type => {}
                Some(ty) => {
                    self.err(
                        &node.id,
                        DiagnosticKind::Type,
                        format!(
                            "struct member '{}' expects {} but got {}",
                            member.id,
                            member.data_type.to_wire_string(),
                            ty.to_wire_string()
                        ),
                    );
                    ok = false;
                }
                None => {
                    self.err(
                        &node.id,
                        DiagnosticKind::Reference,
                        format!("missing value for struct member '{}'", member.id),
                    );
                    ok = false;
                }
            }
        }
        if ok {
            Resolution::Ok(DataType::Struct(type_name.to_string()))
        } else {
            Resolution::Failed
        }
    }

    fn value_type_at(&mut self, node_id: &str, arg: &str, key: &str) -> Option<DataType> {
        let edge = self
            .edges
            .incoming(node_id)
            .find(|e| {
                e.to_arg == arg
                    && matches!(&e.to_path, Some(crate::edges::PathSegment::Key(k)) if k == key)
            })?
            .clone();
        match self.resolve(&edge.from_node) {
            Resolution::Ok(mut ty) => {
                if let Some(mask) = &edge.from_swizzle {
                    ty = self.apply_swizzle(node_id, &ty, mask)?;
                }
                Some(ty)
            }
            Resolution::Failed => None,
        }
    }

    fn infer_struct_extract(&mut self, node: &Node) -> Resolution {
        let Some(source_ty) = self.input_type(&node.id, "source") else { return Resolution::Failed };
        let DataType::Struct(type_name) = &source_ty else {
            self.err(&node.id, DiagnosticKind::Type, "struct_extract source is not a struct");
            return Resolution::Failed;
        };
        let Some(member_name) = node.prop("member").and_then(|p| p.as_plain_str()) else {
            self.err(&node.id, DiagnosticKind::Schema, "missing 'member' property");
            return Resolution::Failed;
        };
        let Some(def) = self.doc.struct_def(type_name) else {
            self.err(&node.id, DiagnosticKind::Reference, format!("unknown struct '{type_name}'"));
            return Resolution::Failed;
        };
        match def.members.iter().find(|m| m.id == member_name) {
            Some(m) => Resolution::Ok(m.data_type.clone()),
            None => {
                self.err(
                    &node.id,
                    DiagnosticKind::Reference,
                    format!("struct '{type_name}' has no member '{member_name}'"),
                );
                Resolution::Failed
            }
        }
    }

    fn infer_array_construct(&mut self, node: &Node) -> Resolution {
        let indices: Vec<usize> = self
            .edges
            .incoming(&node.id)
            .filter(|e| e.to_arg == "values")
            .filter_map(|e| match &e.to_path {
                Some(crate::edges::PathSegment::Index(i)) => Some(*i),
                _ => None,
            })
            .collect();
        if indices.is_empty() {
            self.err(&node.id, DiagnosticKind::Schema, "array_construct has no 'values' elements");
            return Resolution::Failed;
        }
        let len = indices.iter().max().copied().unwrap_or(0) + 1;
        let mut elem_ty = None;
        for i in 0..len {
            let Some(ty) = self.value_type_at_index(&node.id, "values", i) else {
                self.err(&node.id, DiagnosticKind::Reference, format!("array_construct missing element {i}"));
                return Resolution::Failed;
            };
            match &elem_ty {
                None => elem_ty = Some(ty),
                Some(prev) if *prev != ty => {
                    self.err(
                        &node.id,
                        DiagnosticKind::Type,
                        "array_construct elements do not all share one type",
                    );
                    return Resolution::Failed;
                }
                _ => {}
            }
        }
        Resolution::Ok(DataType::Array(Box::new(elem_ty.unwrap()), len as u32))
    }

    fn value_type_at_index(&mut self, node_id: &str, arg: &str, index: usize) -> Option<DataType> {
        let edge = self
            .edges
            .incoming(node_id)
            .find(|e| {
                e.to_arg == arg
                    && matches!(&e.to_path, Some(crate::edges::PathSegment::Index(i)) if *i == index)
            })?
            .clone();
        match self.resolve(&edge.from_node) {
            Resolution::Ok(mut ty) => {
                if let Some(mask) = &edge.from_swizzle {
                    ty = self.apply_swizzle(node_id, &ty, mask)?;
                }
                Some(ty)
            }
            Resolution::Failed => None,
        }
    }

    fn infer_array_extract(&mut self, node: &Node) -> Resolution {
        let Some(array_ty) = self.input_type(&node.id, "array") else { return Resolution::Failed };
        match array_ty {
            DataType::Array(elem, _) | DataType::DynamicArray(elem) => Resolution::Ok(*elem),
            other => {
                self.err(
                    &node.id,
                    DiagnosticKind::Type,
                    format!("array_extract source is not an array ({})", other.to_wire_string()),
                );
                Resolution::Failed
            }
        }
    }

    fn infer_vec_swizzle(&mut self, node: &Node) -> Resolution {
        let Some(source_ty) = self.input_type(&node.id, "vec") else { return Resolution::Failed };
        let Some(mask) = node.prop("channels").and_then(|p| p.as_plain_str()) else {
            self.err(&node.id, DiagnosticKind::Schema, "missing 'channels' property");
            return Resolution::Failed;
        };
        match self.apply_swizzle(&node.id, &source_ty, mask) {
            Some(ty) => Resolution::Ok(ty),
            None => Resolution::Failed,
        }
    }

    fn infer_vec_get_element(&mut self, node: &Node) -> Resolution {
        let Some(source_ty) = self.input_type(&node.id, "source") else { return Resolution::Failed };
        match source_ty {
            DataType::Float3x3 => Resolution::Ok(DataType::Float3),
            DataType::Float4x4 => Resolution::Ok(DataType::Float4),
            ref ty if ty.lanes().is_some() => {
                Resolution::Ok(if ty.is_float_family() { DataType::Float } else { DataType::Int })
            }
            other => {
                self.err(
                    &node.id,
                    DiagnosticKind::Type,
                    format!("vec_get_element source has no elements ({})", other.to_wire_string()),
                );
                Resolution::Failed
            }
        }
    }

    fn infer_buffer_load(&mut self, node: &Node) -> Resolution {
        let Some(buffer_id) = node.prop("buffer").and_then(|p| p.as_plain_str()) else {
            self.err(&node.id, DiagnosticKind::Schema, "missing 'buffer' property");
            return Resolution::Failed;
        };
        match self.doc.resource(buffer_id) {
            Some(r) => match &r.kind {
                crate::ir::ResourceKind::Buffer { data_type } => Resolution::Ok(data_type.clone()),
                _ => {
                    self.err(&node.id, DiagnosticKind::Type, format!("'{buffer_id}' is not a buffer"));
                    Resolution::Failed
                }
            },
            None => {
                self.err(&node.id, DiagnosticKind::Reference, format!("unknown resource '{buffer_id}'"));
                Resolution::Failed
            }
        }
    }

    fn infer_vector_constructor(&mut self, node: &Node) -> Resolution {
        let target = DataType::parse(node.op.as_str()).unwrap();
        let target_lanes = target.lanes().unwrap();
        let incoming: Vec<_> = self.edges.incoming_data(&node.id).map(|e| e.to_arg.clone()).collect();
        if incoming.is_empty() {
            self.err(&node.id, DiagnosticKind::Schema, "vector constructor has no component inputs");
            return Resolution::Failed;
        }
        let mut total = 0u32;
        for arg in &incoming {
            let Some(ty) = self.input_type(&node.id, arg) else { return Resolution::Failed };
            let Some(lanes) = ty.lanes() else {
                self.err(&node.id, DiagnosticKind::Type, format!("component '{arg}' is not numeric"));
                return Resolution::Failed;
            };
            total += lanes;
        }
        if total != target_lanes {
            self.err(
                &node.id,
                DiagnosticKind::Type,
                format!(
                    "component groups sum to {total} lanes, but '{}' needs exactly {target_lanes}",
                    node.op
                ),
            );
            return Resolution::Failed;
        }
        Resolution::Ok(target)
    }

    fn infer_math(&mut self, node: &Node) -> Resolution {
        match node.op.as_str() {
            "math_pi" | "math_e" => return Resolution::Ok(DataType::Float),
            "math_not" | "math_and" | "math_or" | "math_xor" => return self.infer_via_signatures(node),
            _ => {}
        }
        if let (Some(_), Some(_)) = (node.prop("a"), node.prop("b")) {
            return self.infer_binary_math(node);
        }
        self.infer_via_signatures(node)
    }

    fn infer_binary_math(&mut self, node: &Node) -> Resolution {
        let Some(a_ty) = self.input_type(&node.id, "a") else { return Resolution::Failed };
        let Some(b_ty) = self.input_type(&node.id, "b") else { return Resolution::Failed };

        if violates_strict_vector_rule(&node.op, &a_ty, &b_ty) {
            self.err(
                &node.id,
                DiagnosticKind::Type,
                format!(
                    "'{}' cannot mix an int vector with a float vector ({} vs {})",
                    node.op,
                    a_ty.to_wire_string(),
                    b_ty.to_wire_string()
                ),
            );
            return Resolution::Failed;
        }

        let Some(schema) = schema::op_table().get(node.op.as_str()) else { return Resolution::Failed };
        for sig in &schema.signatures {
            if sig.variadic || sig.inputs.len() != 2 {
                continue;
            }
            let (_, want_a) = &sig.inputs[0];
            let (_, want_b) = &sig.inputs[1];
            if token_accepts(want_a, &a_ty) && token_accepts(want_b, &b_ty) {
                return Resolution::Ok(resolve_token(want_a, want_b, &sig.output, &a_ty, &b_ty));
            }
        }
        // Pass 1/2 coercion: try widening each side toward the other family.
        for sig in &schema.signatures {
            if sig.variadic || sig.inputs.len() != 2 {
                continue;
            }
            let (_, want_a) = &sig.inputs[0];
            let (_, want_b) = &sig.inputs[1];
            if let (TypeToken::Data(wa), TypeToken::Data(wb)) = (want_a, want_b) {
                if coercion_from_to(&a_ty, wa).is_some() && coercion_from_to(&b_ty, wb).is_some() {
                    return Resolution::Ok(resolve_token(want_a, want_b, &sig.output, &a_ty, &b_ty));
                }
            }
        }
        self.err(
            &node.id,
            DiagnosticKind::Type,
            format!(
                "no overload of '{}' accepts ({}, {})",
                node.op,
                a_ty.to_wire_string(),
                b_ty.to_wire_string()
            ),
        );
        Resolution::Failed
    }

    /// `buffer_store` has no output type of its own so it never runs
    /// through the pure-node resolver; it still needs its `value` arg
    /// checked against the target buffer's declared element type.
    fn check_buffer_store(&mut self, node: &Node) {
        let Some(buffer_id) = node.prop("buffer").and_then(|p| p.as_plain_str()) else { return };
        let Some(resource) = self.doc.resource(buffer_id) else { return };
        let crate::ir::ResourceKind::Buffer { data_type } = &resource.kind else { return };
        let data_type = data_type.clone();
        let Some(value_ty) = self.input_type(&node.id, "value") else { return };
        if value_ty != data_type {
            self.err(
                &node.id,
                DiagnosticKind::Type,
                format!(
                    "Buffer '{}' expects '{}', got '{}'",
                    buffer_id,
                    data_type.to_wire_string(),
                    value_ty.to_wire_string()
                ),
            );
        }
    }

    fn infer_via_signatures(&mut self, node: &Node) -> Resolution {
        let Some(schema) = schema::op_table().get(node.op.as_str()) else {
            self.err(&node.id, DiagnosticKind::Schema, format!("unknown opcode '{}'", node.op));
            return Resolution::Failed;
        };
        let schema = schema.clone();
        let arg_names: Vec<&str> = schema.args.iter().filter(|(_, is_id)| !*is_id).map(|(n, _)| *n).collect();
        let mut actual = Vec::new();
        for name in &arg_names {
            let Some(ty) = self.input_type(&node.id, name) else { continue };
            actual.push((*name, ty));
        }
        for sig in &schema.signatures {
            if sig.inputs.len() != actual.len() {
                continue;
            }
            if sig
                .inputs
                .iter()
                .zip(&actual)
                .all(|((_, tok), (_, ty))| token_accepts(tok, ty))
            {
                return Resolution::Ok(resolve_output(&sig.output, &actual));
            }
        }
        // A missing connection already reported its own diagnostic inside
        // `input_type`; only report a generic overload mismatch when every
        // declared arg actually resolved to some type.
        if actual.len() == arg_names.len() {
            self.err(
                &node.id,
                DiagnosticKind::Type,
                format!("no overload of '{}' matches the given argument types", node.op),
            );
        }
        Resolution::Failed
    }
}

fn token_accepts(tok: &TypeToken, ty: &DataType) -> bool {
    if tok.matches(ty) {
        return true;
    }
    if let TypeToken::Data(want) = tok {
        return coercion_from_to(ty, want).is_some();
    }
    false
}

fn resolve_token(
    tok_a: &TypeToken,
    tok_b: &TypeToken,
    output: &TypeToken,
    a: &DataType,
    b: &DataType,
) -> DataType {
    match output {
        TypeToken::Data(d) => d.clone(),
        TypeToken::Any => {
            if tok_a == &TypeToken::Any {
                b.clone()
            } else {
                a.clone()
            }
        }
        _ => a.clone(),
    }
}

fn resolve_output(output: &TypeToken, actual: &[(&str, DataType)]) -> DataType {
    match output {
        TypeToken::Data(d) => d.clone(),
        TypeToken::Any => actual.first().map(|(_, t)| t.clone()).unwrap_or(DataType::Float),
        TypeToken::AnyStruct | TypeToken::AnyArray => actual.first().map(|(_, t)| t.clone()).unwrap_or(DataType::Float),
    }
}
