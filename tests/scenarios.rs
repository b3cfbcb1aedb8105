//! Pinned end-to-end scenarios, one test per documented compiler behavior.
//! Fixtures are built as in-memory IR values rather than loose JSON files,
//! matching how the crate's own unit tests construct documents.

use std::collections::HashMap;

use shadergraph_compiler::conformance::{MockBackend, TestBackend, TestContext};
use shadergraph_compiler::error::{DiagnosticKind, Severity};
use shadergraph_compiler::ir::*;
use shadergraph_compiler::validate;

fn node(id: &str, op: &str, props: Vec<(&str, PropValue)>) -> Node {
    Node {
        id: id.to_string(),
        op: op.to_string(),
        metadata: None,
        properties: props.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    }
}

fn str_ref(id: &str) -> PropValue {
    PropValue::StrRef { base: id.to_string(), swizzle: None }
}

fn lit(id: &str, value: f64, ty: &str) -> Node {
    node(id, "literal", vec![("value", PropValue::Number(value)), ("type", str_ref(ty))])
}

fn doc(entry: &str, functions: Vec<FunctionDef>) -> IRDocument {
    doc_with_resources(entry, vec![], functions)
}

fn doc_with_resources(entry: &str, resources: Vec<ResourceDef>, functions: Vec<FunctionDef>) -> IRDocument {
    IRDocument {
        version: "1".into(),
        meta: Metadata::default(),
        entry_point: entry.into(),
        inputs: vec![],
        resources,
        structs: vec![],
        functions,
    }
}

fn doc_with_structs(entry: &str, structs: Vec<StructDef>) -> IRDocument {
    IRDocument {
        version: "1".into(),
        meta: Metadata::default(),
        entry_point: entry.into(),
        inputs: vec![],
        resources: vec![],
        structs,
        functions: vec![],
    }
}

fn shader(id: &str, nodes: Vec<Node>) -> FunctionDef {
    FunctionDef { id: id.into(), kind: FunctionKind::Shader, inputs: vec![], outputs: vec![], local_vars: vec![], nodes }
}

// --- S1: swizzle correctness -------------------------------------------

#[test]
fn s1_yx_swizzle_of_a_float2_infers_as_float2() {
    let f = shader(
        "main",
        vec![
            lit("lx", 1.0, "float"),
            lit("ly", 2.0, "float"),
            node("v", "float2", vec![("x", str_ref("lx")), ("y", str_ref("ly"))]),
            node("sw", "vec_swizzle", vec![("vec", str_ref("v")), ("channels", str_ref("yx"))]),
        ],
    );
    let (diagnostics, typed) = validate::validate(&doc("main", vec![f]));
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(typed.node_type("main", "sw"), Some(&DataType::Float2));
}

#[test]
fn s1_invalid_swizzle_channel_is_diagnosed() {
    let f = shader(
        "main",
        vec![
            lit("lx", 1.0, "float"),
            lit("ly", 2.0, "float"),
            node("v", "float2", vec![("x", str_ref("lx")), ("y", str_ref("ly"))]),
            node("sw", "vec_swizzle", vec![("vec", str_ref("v")), ("channels", str_ref("xq"))]),
        ],
    );
    let (diagnostics, _) = validate::validate(&doc("main", vec![f]));
    assert!(diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::Type && d.message.contains("Invalid swizzle component 'q'")));
}

// --- S2: recursive struct ------------------------------------------------

#[test]
fn s2_mutually_recursive_structs_are_diagnosed() {
    let a = StructDef { id: "A".into(), members: vec![StructMember { id: "b".into(), data_type: DataType::Struct("B".into()) }] };
    let b = StructDef { id: "B".into(), members: vec![StructMember { id: "a".into(), data_type: DataType::Struct("A".into()) }] };
    let (diagnostics, _) = validate::validate(&doc_with_structs("main", vec![a, b]));
    assert!(diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::Structural && d.message.contains("recursive")));
}

// --- S3: static out-of-bounds buffer access -----------------------------

#[test]
fn s3_literal_index_past_a_fixed_buffer_is_a_static_oob_error() {
    let buf = ResourceDef {
        id: "buf".into(),
        kind: ResourceKind::Buffer { data_type: DataType::Float },
        size: ResourceSize::Fixed { extent: FixedExtent::Count(2) },
        persistence: Persistence::default(),
    };
    let f = shader(
        "main",
        vec![
            lit("val", 1.0, "float"),
            node(
                "st",
                "buffer_store",
                vec![("buffer", str_ref("buf")), ("index", PropValue::Number(5.0)), ("value", str_ref("val"))],
            ),
        ],
    );
    let (diagnostics, _) = validate::validate(&doc_with_resources("main", vec![buf], vec![f]));
    assert!(diagnostics.iter().any(|d| d.kind == DiagnosticKind::Bounds && d.message.contains("Static OOB")));
}

// --- S4: buffer element type mismatch -----------------------------------

#[test]
fn s4_buffer_store_value_type_mismatch_is_diagnosed() {
    let b_int = ResourceDef {
        id: "b_int".into(),
        kind: ResourceKind::Buffer { data_type: DataType::Int },
        size: ResourceSize::Fixed { extent: FixedExtent::Count(4) },
        persistence: Persistence::default(),
    };
    let f = shader(
        "main",
        vec![
            lit("val", 1.0, "float"),
            node(
                "st",
                "buffer_store",
                vec![("buffer", str_ref("b_int")), ("index", PropValue::Number(0.0)), ("value", str_ref("val"))],
            ),
        ],
    );
    let (diagnostics, _) = validate::validate(&doc_with_resources("main", vec![b_int], vec![f]));
    assert!(diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::Type && d.message == "Buffer 'b_int' expects 'int', got 'float'"));
}

// --- S5: function calls and recursion -----------------------------------

#[test]
fn s5_call_func_threads_arguments_through_to_the_callee_return() {
    let fn_square = FunctionDef {
        id: "fn_square".into(),
        kind: FunctionKind::Shader,
        inputs: vec![FunctionIo { id: "x".into(), data_type: DataType::Float, builtin: None, location: None }],
        outputs: vec![],
        local_vars: vec![],
        nodes: vec![
            node("get_x", "var_get", vec![("var", str_ref("x"))]),
            node("mul", "math_mul", vec![("a", str_ref("get_x")), ("b", str_ref("get_x"))]),
            node("ret", "func_return", vec![("value", str_ref("mul"))]),
        ],
    };
    let fn_main = FunctionDef {
        id: "fn_main".into(),
        kind: FunctionKind::Shader,
        inputs: vec![],
        outputs: vec![],
        local_vars: vec![LocalVar { id: "result".into(), data_type: DataType::Float, initial_value: None }],
        nodes: vec![
            lit("five", 5.0, "float"),
            node(
                "call",
                "call_func",
                vec![("func", str_ref("fn_square")), ("x", str_ref("five")), ("exec_out", str_ref("set_result"))],
            ),
            node(
                "set_result",
                "var_set",
                vec![("var", str_ref("result")), ("val", str_ref("call")), ("exec_in", str_ref("call"))],
            ),
        ],
    };

    let document = doc("fn_main", vec![fn_main, fn_square]);
    let backend = MockBackend;
    let ctx = backend.execute(&document, "fn_main", &HashMap::new()).unwrap();
    assert_eq!(ctx.get_var("result"), Some(25.0));
}

#[test]
fn s5_indirect_function_recursion_is_diagnosed() {
    let fn_a = FunctionDef {
        id: "fn_a".into(),
        kind: FunctionKind::Shader,
        inputs: vec![],
        outputs: vec![],
        local_vars: vec![],
        nodes: vec![node("call_b", "call_func", vec![("func", str_ref("fn_b"))])],
    };
    let fn_b = FunctionDef {
        id: "fn_b".into(),
        kind: FunctionKind::Shader,
        inputs: vec![],
        outputs: vec![],
        local_vars: vec![],
        nodes: vec![node("call_a", "call_func", vec![("func", str_ref("fn_a"))])],
    };
    let (diagnostics, _) = validate::validate(&doc("fn_a", vec![fn_a, fn_b]));
    assert!(diagnostics.iter().any(|d| {
        d.severity == Severity::Error && d.kind == DiagnosticKind::Structural && d.message.contains("recursive")
    }));
}

// --- S6: kernel-local readback -------------------------------------------

#[test]
fn s6_a_local_set_by_the_entry_chain_reads_back_through_the_conformance_contract() {
    let f = FunctionDef {
        id: "main".into(),
        kind: FunctionKind::Shader,
        inputs: vec![],
        outputs: vec![],
        local_vars: vec![LocalVar { id: "res".into(), data_type: DataType::Float, initial_value: None }],
        nodes: vec![
            lit("pi", 3.14, "float"),
            node("set_res", "var_set", vec![("var", str_ref("res")), ("val", str_ref("pi"))]),
        ],
    };
    let backend = MockBackend;
    let ctx = backend.execute(&doc("main", vec![f]), "main", &HashMap::new()).unwrap();
    assert_eq!(ctx.get_var("res"), Some(3.14));
}

// --- S7: strict mixed-vector rejection -----------------------------------

#[test]
fn s7_math_add_rejects_mixing_an_int_vector_with_a_float_vector() {
    let f = shader(
        "main",
        vec![
            lit("ix", 1.0, "int"),
            lit("iy", 2.0, "int"),
            node("ivec", "int2", vec![("x", str_ref("ix")), ("y", str_ref("iy"))]),
            lit("fx", 1.0, "float"),
            lit("fy", 2.0, "float"),
            node("fvec", "float2", vec![("x", str_ref("fx")), ("y", str_ref("fy"))]),
            node("add", "math_add", vec![("a", str_ref("ivec")), ("b", str_ref("fvec"))]),
        ],
    );
    let (diagnostics, _) = validate::validate(&doc("main", vec![f]));
    assert!(diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::Type && d.message.contains("cannot mix an int vector with a float vector")));
}
