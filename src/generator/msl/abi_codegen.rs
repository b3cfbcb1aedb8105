//! Bridges the flat `b_globals` float buffer to typed MSL locals: one
//! constructor expression per type for the kernel preamble, and one set of
//! assignment statements per type for the epilogue write-back.

use crate::ir::{DataType, IRDocument};

use super::types::msl_type_name;

/// A constructor expression reading `ty` out of `b_globals` starting at
/// `offset`, and the offset just past it. Dynamic arrays have no fixed
/// unpack expression (their length lives in the buffer itself); callers
/// should special-case them rather than call this.
pub fn unpack_expr(ty: &DataType, doc: &IRDocument, offset: u32) -> (String, u32) {
    match ty {
        DataType::Float => (format!("b_globals[{offset}]"), offset + 1),
        DataType::Int => (format!("int(b_globals[{offset}])"), offset + 1),
        DataType::Bool => (format!("(b_globals[{offset}] != 0.0)"), offset + 1),
        DataType::Float2 | DataType::Float3 | DataType::Float4 | DataType::Int2 | DataType::Int3 | DataType::Int4 => {
            let lanes = ty.lanes().unwrap_or(1);
            let parts: Vec<String> = (0..lanes)
                .map(|i| {
                    if ty.is_int_family() {
                        format!("int(b_globals[{}])", offset + i)
                    } else {
                        format!("b_globals[{}]", offset + i)
                    }
                })
                .collect();
            (format!("{}({})", msl_type_name(ty), parts.join(", ")), offset + lanes)
        }
        DataType::Float3x3 => {
            let cols: Vec<String> = (0..3)
                .map(|c| {
                    let base = offset + c * 3;
                    format!("float3(b_globals[{}], b_globals[{}], b_globals[{}])", base, base + 1, base + 2)
                })
                .collect();
            (format!("float3x3({})", cols.join(", ")), offset + 9)
        }
        DataType::Float4x4 => {
            let cols: Vec<String> = (0..4)
                .map(|c| {
                    let base = offset + c * 4;
                    format!(
                        "float4(b_globals[{}], b_globals[{}], b_globals[{}], b_globals[{}])",
                        base,
                        base + 1,
                        base + 2,
                        base + 3
                    )
                })
                .collect();
            (format!("float4x4({})", cols.join(", ")), offset + 16)
        }
        DataType::Struct(name) => {
            let Some(def) = doc.struct_def(name) else { return ("{}".to_string(), offset) };
            let mut cursor = offset;
            let mut parts = Vec::with_capacity(def.members.len());
            for member in &def.members {
                let (expr, next) = unpack_expr(&member.data_type, doc, cursor);
                parts.push(expr);
                cursor = next;
            }
            (format!("{}{{ {} }}", name, parts.join(", ")), cursor)
        }
        DataType::Array(elem, n) => {
            let mut cursor = offset;
            let mut parts = Vec::with_capacity(*n as usize);
            for _ in 0..*n {
                let (expr, next) = unpack_expr(elem, doc, cursor);
                parts.push(expr);
                cursor = next;
            }
            (format!("{{ {} }}", parts.join(", ")), cursor)
        }
        DataType::DynamicArray(_) | DataType::String | DataType::Texture2D | DataType::Sampler => {
            ("0".to_string(), offset)
        }
    }
}

/// Write-back statements copying a local named `id` (of type `ty`) to
/// `b_globals` starting at `offset`. Array-typed locals are skipped: they
/// are not blittable via the flat float plane.
pub fn writeback_stmts(id: &str, ty: &DataType, offset: u32) -> Vec<String> {
    match ty {
        DataType::Float => vec![format!("b_globals[{offset}] = {id};")],
        DataType::Int => vec![format!("b_globals[{offset}] = float({id});")],
        DataType::Bool => vec![format!("b_globals[{offset}] = {id} ? 1.0 : 0.0;")],
        DataType::Float2 | DataType::Float3 | DataType::Float4 | DataType::Int2 | DataType::Int3 | DataType::Int4 => {
            let lanes = ty.lanes().unwrap_or(1);
            (0..lanes)
                .map(|i| {
                    if ty.is_int_family() {
                        format!("b_globals[{}] = float({id}[{i}]);", offset + i)
                    } else {
                        format!("b_globals[{}] = {id}[{i}];", offset + i)
                    }
                })
                .collect()
        }
        DataType::Float3x3 => (0..3)
            .flat_map(|c| {
                (0..3).map(move |r| format!("b_globals[{}] = {id}[{c}][{r}];", offset + c * 3 + r))
            })
            .collect(),
        DataType::Float4x4 => (0..4)
            .flat_map(|c| {
                (0..4).map(move |r| format!("b_globals[{}] = {id}[{c}][{r}];", offset + c * 4 + r))
            })
            .collect(),
        DataType::Struct(_) | DataType::Array(_, _) | DataType::DynamicArray(_) | DataType::String
        | DataType::Texture2D | DataType::Sampler => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Metadata;

    fn empty_doc() -> IRDocument {
        IRDocument {
            version: "1".into(),
            meta: Metadata::default(),
            entry_point: "main".into(),
            inputs: vec![],
            resources: vec![],
            structs: vec![],
            functions: vec![],
        }
    }

    #[test]
    fn scalar_unpack_reads_one_slot() {
        let doc = empty_doc();
        let (expr, next) = unpack_expr(&DataType::Float, &doc, 3);
        assert_eq!(expr, "b_globals[3]");
        assert_eq!(next, 4);
    }

    #[test]
    fn vector_writeback_covers_every_lane() {
        let stmts = writeback_stmts("speed", &DataType::Float3, 2);
        assert_eq!(stmts.len(), 3);
        assert!(stmts[0].contains("b_globals[2]"));
        assert!(stmts[2].contains("speed[2]"));
    }

    #[test]
    fn array_typed_local_has_no_writeback() {
        assert!(writeback_stmts("arr", &DataType::Array(Box::new(DataType::Float), 4), 0).is_empty());
    }
}
