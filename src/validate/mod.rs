//! Validation entry point: runs structural checks first, then type
//! inference per function, and returns every diagnostic found. Never
//! panics and never throws — callers decide what a fatal diagnostic means
//! for them via [`crate::error::has_fatal`].

pub mod coerce;
pub mod infer;
pub mod structural;

use std::collections::HashMap;

use crate::error::Diagnostic;
use crate::ir::{DataType, IRDocument};

/// Per-function node-id -> inferred type, handed to the generator so it
/// does not re-run inference.
pub struct TypedDocument {
    pub types: HashMap<String, HashMap<String, DataType>>,
}

impl TypedDocument {
    pub fn node_type(&self, function_id: &str, node_id: &str) -> Option<&DataType> {
        self.types.get(function_id)?.get(node_id)
    }
}

pub fn validate(doc: &IRDocument) -> (Vec<Diagnostic>, TypedDocument) {
    let structural_result = structural::check(doc);
    let mut diagnostics = structural_result.diagnostics;
    let mut types = HashMap::new();

    for func in &doc.functions {
        let Some(edges) = structural_result.edges.get(&func.id) else { continue };
        let infer_result = infer::infer_function(doc, func, edges);
        diagnostics.extend(infer_result.diagnostics);
        types.insert(func.id.clone(), infer_result.types);
    }

    (diagnostics, TypedDocument { types })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;

    #[test]
    fn well_typed_document_has_no_diagnostics() {
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
                outputs: vec![FunctionIo { id: "color".into(), data_type: DataType::Float4, builtin: None, location: Some(0) }],
                local_vars: vec![],
                nodes: vec![
                    Node {
                        id: "lit".into(),
                        op: "literal".into(),
                        metadata: None,
                        properties: [
                            ("value".to_string(), PropValue::Number(1.0)),
                            ("type".to_string(), PropValue::StrRef { base: "float".into(), swizzle: None }),
                        ]
                        .into_iter()
                        .collect(),
                    },
                ],
            }],
        };
        let (diagnostics, typed) = validate(&doc);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(typed.node_type("main", "lit"), Some(&DataType::Float));
    }

    #[test]
    fn unknown_opcode_is_a_schema_diagnostic() {
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
                nodes: vec![Node {
                    id: "n1".into(),
                    op: "not_a_real_op".into(),
                    metadata: None,
                    properties: Default::default(),
                }],
            }],
        };
        let (diagnostics, _) = validate(&doc);
        assert!(diagnostics.iter().any(|d| d.message.contains("unknown opcode")));
    }
}
