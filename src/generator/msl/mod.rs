//! MSL (Metal Shading Language) backend: per-function signature synthesis,
//! globals-buffer preamble/epilogue, and struct declarations, built on top
//! of [`expr`]'s pure-node lowering and [`chain`]'s execution-chain walk.

pub mod abi_codegen;
pub mod chain;
pub mod expr;
pub mod helpers;
pub mod layout;
pub mod types;

use crate::edges::EdgeSet;
use crate::ir::{DataType, FunctionDef, IRDocument, ResourceKind};
use crate::schema::BUILTIN_TYPES;
use crate::validate::TypedDocument;

use self::layout::Layout;
use self::types::msl_type_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionRole {
    /// The `cmd_dispatch` entry: gets the full kernel attribute signature.
    Kernel,
    /// Anything else reachable (`call_func` targets, `cmd_draw`'s vertex
    /// and fragment functions): an ordinary callable MSL function.
    Helper,
}

pub fn emit_struct_defs(doc: &IRDocument) -> String {
    doc.structs
        .iter()
        .map(|def| {
            let members: Vec<String> = def
                .members
                .iter()
                .map(|m| format!("    {} {};", msl_type_name(&m.data_type), sanitize_ident(&m.id)))
                .collect();
            format!("struct {} {{\n{}\n}};", def.id, members.join("\n"))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn emit_function(
    doc: &IRDocument,
    func: &FunctionDef,
    edges: &EdgeSet,
    typed: &TypedDocument,
    layout: &Layout,
    role: FunctionRole,
) -> String {
    let body = chain::emit_body(doc, func, edges, typed);
    match role {
        FunctionRole::Kernel => {
            let sig = kernel_signature(doc, func, layout);
            let preamble = globals_preamble(doc, layout);
            let epilogue = kernel_epilogue(func, layout);
            format!("{sig} {{\n{preamble}\n    {body}\n{epilogue}}}\n")
        }
        FunctionRole::Helper => {
            let sig = helper_signature(func);
            format!("{sig} {{\n    {body}\n}}\n")
        }
    }
}

fn kernel_signature(doc: &IRDocument, func: &FunctionDef, layout: &Layout) -> String {
    let mut params = vec!["device float* b_globals [[buffer(0)]]".to_string()];
    for input in &doc.inputs {
        let Some(binding) = layout.binding_of(&input.id) else { continue };
        let name = sanitize_ident(&input.id);
        match input.data_type {
            // Global texture inputs are host-provided and never written by
            // the shader, unlike `doc.resources` textures which may be
            // draw/dispatch targets; `access::sample` matches that
            // read-only contract.
            DataType::Texture2D => {
                params.push(format!("texture2d<float, access::sample> {name} [[texture({binding})]]"));
                params.push(format!("sampler _sampler_{name} [[sampler({binding})]]"));
            }
            DataType::Sampler => {
                params.push(format!("sampler {name} [[sampler({binding})]]"));
            }
            _ => {}
        }
    }
    for resource in &doc.resources {
        let binding = layout.binding_of(&resource.id).unwrap_or(0);
        match &resource.kind {
            ResourceKind::Texture2d { .. } => {
                params.push(format!(
                    "texture2d<float, access::read_write> {} [[texture({binding})]]",
                    resource.id
                ));
                params.push(format!("sampler _sampler_{} [[sampler({binding})]]", resource.id));
            }
            ResourceKind::Buffer { data_type } => {
                params.push(format!("device {}* {} [[buffer({binding})]]", msl_type_name(data_type), resource.id));
            }
            ResourceKind::AtomicCounter => {
                params.push(format!("device atomic_int* {} [[buffer({binding})]]", resource.id));
            }
        }
    }
    params.push("uint3 gid [[thread_position_in_grid]]".to_string());
    format!("kernel void {}({})", sanitize_ident(&func.id), params.join(", "))
}

fn helper_signature(func: &FunctionDef) -> String {
    let ret = match func.outputs.as_slice() {
        [single] => msl_type_name(&single.data_type),
        _ => "void".to_string(),
    };
    let mut params = vec!["device float* b_globals".to_string()];
    for io in &func.inputs {
        params.push(format!("{} {}", msl_type_name(&io.data_type), sanitize_ident(&io.id)));
    }
    format!("inline {ret} {}({})", sanitize_ident(&func.id), params.join(", "))
}

/// Unpacks every mapped id in `layout.var_map` into a same-named MSL local.
/// Shared across every reachable function rather than pared down per
/// function body, trading a few unused-local warnings for a single simple
/// preamble builder.
fn globals_preamble(doc: &IRDocument, layout: &Layout) -> String {
    let mut entries: Vec<(&String, &u32)> = layout.var_map.iter().collect();
    entries.sort_by_key(|(_, offset)| **offset);
    entries
        .into_iter()
        .map(|(id, offset)| {
            let ty = resolve_var_type(doc, id);
            let (expr, _) = abi_codegen::unpack_expr(&ty, doc, *offset);
            format!("    {} {} = {};", msl_type_name(&ty), sanitize_ident(id), expr)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn kernel_epilogue(func: &FunctionDef, layout: &Layout) -> String {
    func.local_vars
        .iter()
        .filter_map(|local| layout.offset_of(&local.id).map(|offset| (local, offset)))
        .flat_map(|(local, offset)| {
            self::abi_codegen::writeback_stmts(&sanitize_ident(&local.id), &local.data_type, offset)
        })
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn resolve_var_type(doc: &IRDocument, id: &str) -> DataType {
    if let Some(input) = doc.input(id) {
        return input.data_type.clone();
    }
    if let Some(ty) = BUILTIN_TYPES.get(id) {
        return ty.clone();
    }
    for func in &doc.functions {
        if let Some(io) = func.inputs.iter().find(|io| io.id == id) {
            return io.data_type.clone();
        }
        if let Some(local) = func.local_vars.iter().find(|l| l.id == id) {
            return local.data_type.clone();
        }
    }
    DataType::Float
}

fn sanitize_ident(s: &str) -> String {
    s.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect()
}
