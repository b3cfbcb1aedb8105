//! Exercises the public `TestBackend`/`TestContext` contract shape against a
//! document loaded through the crate's normal JSON entry point, rather than
//! against hand-built `IRDocument` values as `conformance.rs`'s own unit
//! tests do.

use std::collections::HashMap;

use shadergraph_compiler::conformance::{MockBackend, TestBackend, TestContext};
use shadergraph_compiler::ir::{FixedExtent, IRDocument, Persistence, ResourceDef, ResourceKind, ResourceSize};
use shadergraph_compiler::ir::DataType as IrDataType;
use shadergraph_compiler::load_document;

const DOC_JSON: &str = r#"{
    "version": "1",
    "entryPoint": "main",
    "inputs": [
        {"id": "in_val", "dataType": "float"}
    ],
    "functions": [
        {
            "id": "main",
            "kind": "shader",
            "localVars": [
                {"id": "scaled", "type": "float"}
            ],
            "nodes": [
                {"id": "in_val_get", "op": "var_get", "var": "in_val"},
                {"id": "factor", "op": "literal", "value": 10.0, "type": "float"},
                {"id": "mul", "op": "math_mul", "a": "in_val_get", "b": "factor"},
                {"id": "store", "op": "var_set", "var": "scaled", "val": "mul"}
            ]
        }
    ]
}"#;

/// Runs any `TestBackend` against a loaded document. Written generically to
/// pin that the trait is usable without hardcoding `MockBackend`'s concrete
/// `Context` type at the call site.
fn run_and_read<B: TestBackend>(backend: &B, doc: &shadergraph_compiler::ir::IRDocument, var: &str) -> Option<f32> {
    let ctx = backend.execute(doc, "main", &HashMap::new()).unwrap();
    ctx.get_var(var)
}

#[test]
fn loaded_document_runs_through_the_generic_backend_contract() {
    // `in_val` is a global input, zero-seeded by `create_context` when no
    // override is supplied.
    let doc = load_document(DOC_JSON).unwrap();
    let backend = MockBackend;
    assert_eq!(run_and_read(&backend, &doc, "scaled"), Some(0.0));
}

#[test]
fn input_override_on_a_loaded_document_flows_through_execute() {
    let doc = load_document(DOC_JSON).unwrap();
    let backend = MockBackend;
    let mut inputs = HashMap::new();
    inputs.insert("in_val".to_string(), 5.0);
    let ctx = backend.execute(&doc, "main", &inputs).unwrap();
    assert_eq!(ctx.get_var("scaled"), Some(50.0));
}

#[test]
fn declared_fixed_size_buffer_resource_is_zero_initialized_and_readable() {
    use shadergraph_compiler::ir::{FunctionDef, FunctionKind, Metadata};

    let doc = IRDocument {
        version: "1".into(),
        meta: Metadata::default(),
        entry_point: "main".into(),
        inputs: vec![],
        resources: vec![ResourceDef {
            id: "out_buf".into(),
            kind: ResourceKind::Buffer { data_type: IrDataType::Float },
            size: ResourceSize::Fixed { extent: FixedExtent::Count(4) },
            persistence: Persistence::default(),
        }],
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
    let backend = MockBackend;
    let ctx = backend.execute(&doc, "main", &HashMap::new()).unwrap();
    let view = ctx.get_resource("out_buf").expect("declared resource should be present in the context");
    assert_eq!(view.data.len(), 4);
    assert!(view.data.iter().all(|&v| v == 0.0));
    assert!(ctx.get_resource("missing").is_none());
}
