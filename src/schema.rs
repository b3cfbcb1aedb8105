//! The IR schema and op signature table.
//!
//! The opcode universe is closed and fully enumerated, so it lives as a
//! `'static` Rust declaration rather than a runtime-loaded config file.
//! Built once behind a `once_cell::sync::Lazy` so concurrent compiles over
//! independent documents only ever read it — no locking required since
//! nothing ever mutates it after construction.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::ir::DataType;

/// One overload-matchable token in a signature: either a concrete
/// [`DataType`], a structural protocol token (`struct`/`array`), or the
/// full wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeToken {
    Data(DataType),
    /// Any struct type (`struct_construct`/`struct_extract` targets).
    AnyStruct,
    /// Any array type, fixed or dynamic.
    AnyArray,
    /// Matches any single type.
    Any,
}

impl TypeToken {
    pub fn matches(&self, ty: &DataType) -> bool {
        match self {
            TypeToken::Data(d) => d == ty,
            TypeToken::AnyStruct => matches!(ty, DataType::Struct(_)),
            TypeToken::AnyArray => matches!(ty, DataType::Array(..) | DataType::DynamicArray(_)),
            TypeToken::Any => true,
        }
    }
}

/// `{ inputs: map<arg, type>, output: type }` — one specialization of a
/// polymorphic opcode.
#[derive(Debug, Clone)]
pub struct OverloadSignature {
    pub inputs: Vec<(&'static str, TypeToken)>,
    pub output: TypeToken,
    /// `true` when this signature is matched via the `*` wildcard arg name
    /// (variadic constructors); arity checking is relaxed for it.
    pub variadic: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OpSchema {
    pub name: &'static str,
    /// Declared argument names, and whether each one is an identifier
    /// (resource/name reference) rather than a value.
    pub args: Vec<(&'static str, bool)>,
    pub primary_resource: Option<&'static str>,
    pub cpu_only: bool,
    pub signatures: Vec<OverloadSignature>,
}

impl OpSchema {
    pub fn is_identifier_arg(&self, name: &str) -> bool {
        self.args.iter().any(|(n, is_id)| *n == name && *is_id)
    }

    pub fn has_arg(&self, name: &str) -> bool {
        self.args.iter().any(|(n, _)| *n == name)
    }

    pub fn has_variadic_signature(&self) -> bool {
        self.signatures.iter().any(|s| s.variadic)
    }
}

/// Opcodes evaluated lazily, with no side effects.
pub fn is_pure_op(op: &str) -> bool {
    if op == "literal"
        || op == "var_get"
        || op == "buffer_load"
        || op == "texture_sample"
        || op == "resource_get_size"
        || op == "resource_get_format"
        || op == "struct_construct"
        || op == "struct_extract"
        || op == "array_construct"
        || op == "array_extract"
        || op == "array_length"
        || op == "builtin_get"
        || op == "loop_index"
        || op == "const_get"
        || op == "math_pi"
        || op == "math_e"
        || op == "color_mix"
    {
        return true;
    }
    op.starts_with("math_")
        || op.starts_with("vec_")
        || op.starts_with("mat_")
        || op.starts_with("quat_")
        || op.starts_with("static_cast_")
        || is_vector_constructor(op)
}

pub fn is_vector_constructor(op: &str) -> bool {
    matches!(op, "float2" | "float3" | "float4" | "int2" | "int3" | "int4")
}

/// Opcodes that carry `exec_in`/`exec_out` and drive control flow.
pub fn is_executable_op(op: &str) -> bool {
    op.starts_with("cmd_")
        || op == "flow_branch"
        || op == "flow_loop"
        || op == "var_set"
        || op == "array_set"
        || op == "buffer_store"
        || op == "texture_store"
        || op == "call_func"
        || op == "func_return"
        || op.starts_with("atomic_")
}

pub const EXEC_PORTS: [&str; 6] =
    ["exec_in", "exec_out", "exec_true", "exec_false", "exec_body", "exec_completed"];

pub fn is_exec_port(name: &str) -> bool {
    EXEC_PORTS.contains(&name)
}

/// Builtin names `builtin_get` may produce, and their type.
pub static BUILTIN_TYPES: Lazy<HashMap<&'static str, DataType>> = Lazy::new(|| {
    use DataType::*;
    HashMap::from([
        ("global_invocation_id", Int3Alias()),
        ("normalized_global_invocation_id", Float3),
        ("output_size", Int3Alias()),
        ("vertex_index", Int),
        ("frag_coord", Float4),
        ("front_facing", Bool),
        ("num_workgroups", Int3Alias()),
        ("time", Float),
        ("delta_time", Float),
        ("bpm", Float),
        ("beat_number", Float),
        ("beat_delta", Float),
    ])
});

// Some builtins produce an `int3` that the generator lowers to the target's
// native `int3`/`uint3`; reuse `DataType::Int3` for it rather than adding a
// separate representation. Tiny helper kept for readability at the call
// site above.
#[allow(non_snake_case)]
fn Int3Alias() -> DataType {
    DataType::Int3
}

/// Subset of `BUILTIN_TYPES` usable from a `cpu` function; all of them are
/// float-typed.
pub static BUILTIN_CPU_ALLOWED: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["time", "delta_time", "bpm", "beat_number", "beat_delta"]);

/// Binary ops subject to the strict mixed-vector rejection override.
pub const STRICT_BINARY_OPS: [&str; 15] = [
    "math_add", "math_sub", "math_mul", "math_div", "math_mod", "math_pow", "math_min",
    "math_max", "math_atan2", "math_gt", "math_lt", "math_ge", "math_le", "math_eq", "math_neq",
];

fn numeric_types() -> [DataType; 8] {
    use DataType::*;
    [Float, Int, Float2, Int2, Float3, Int3, Float4, Int4]
}

fn float_family() -> [DataType; 4] {
    use DataType::*;
    [Float, Float2, Float3, Float4]
}

/// One signature per same-family pair (`float op float -> float`, `float2
/// op float2 -> float2`, ... and the int equivalents) plus the scalar
/// broadcast pairs (`floatN op float -> floatN`). Cross-family (`intN` with
/// `floatN`) pairs are intentionally NOT generated here: type inference's
/// coercion pass widens `int<->float` scalar/vector as needed first, and
/// the strict override then special-cases `STRICT_BINARY_OPS` afterward.
///
/// Comparisons (`gt`/`lt`/`ge`/`le`/`eq`/`neq`) use this same table: their
/// 0/1 result is produced in the *same* shape as the operands (a scalar
/// compare yields a scalar, a vector compare yields a per-lane vector), so
/// there is no separate boolean-output variant to generate here.
fn same_family_binary_signatures() -> Vec<OverloadSignature> {
    let mut sigs = Vec::new();
    for ty in numeric_types() {
        sigs.push(OverloadSignature {
            inputs: vec![("a", TypeToken::Data(ty.clone())), ("b", TypeToken::Data(ty.clone()))],
            output: TypeToken::Data(ty),
            variadic: false,
        });
    }
    // Scalar-broadcast pairs: `floatN op float`, `float op floatN` and the
    // int equivalents.
    for ty in numeric_types() {
        if ty.lanes() == Some(1) {
            continue;
        }
        let scalar = if ty.is_float_family() { DataType::Float } else { DataType::Int };
        sigs.push(OverloadSignature {
            inputs: vec![("a", TypeToken::Data(ty.clone())), ("b", TypeToken::Data(scalar.clone()))],
            output: TypeToken::Data(ty.clone()),
            variadic: false,
        });
        sigs.push(OverloadSignature {
            inputs: vec![("a", TypeToken::Data(scalar)), ("b", TypeToken::Data(ty.clone()))],
            output: TypeToken::Data(ty),
            variadic: false,
        });
    }
    sigs
}

fn binary_op(name: &'static str) -> OpSchema {
    OpSchema {
        name,
        args: vec![("a", false), ("b", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: same_family_binary_signatures(),
    }
}

fn unary_same_type_op(name: &'static str) -> OpSchema {
    let sigs = numeric_types()
        .into_iter()
        .map(|ty| OverloadSignature {
            inputs: vec![("value", TypeToken::Data(ty.clone()))],
            output: TypeToken::Data(ty),
            variadic: false,
        })
        .collect();
    OpSchema {
        name,
        args: vec![("value", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: sigs,
    }
}

fn unary_float_family_op(name: &'static str) -> OpSchema {
    let sigs = float_family()
        .into_iter()
        .map(|ty| OverloadSignature {
            inputs: vec![("value", TypeToken::Data(ty.clone()))],
            output: TypeToken::Data(ty),
            variadic: false,
        })
        .collect();
    OpSchema {
        name,
        args: vec![("value", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: sigs,
    }
}

fn nullary_float_op(name: &'static str) -> OpSchema {
    OpSchema {
        name,
        args: vec![],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Data(DataType::Float), variadic: false }],
    }
}

fn vector_constructor_schema(name: &'static str, dim: u32) -> OpSchema {
    let elem = if name.starts_with("int") { DataType::Int } else { DataType::Float };
    let ty = DataType::parse(name).expect("vector constructor name is a valid DataType");
    // Every group key is accepted as a value-arg; scalar args may legally
    // broadcast, vector args must match the group's own dimension. Whether
    // the component-group keys actually partition the target dimension
    // exactly once is a structural check, done in `validate::infer`, not
    // duplicated here as a combinatorial explosion of signatures.
    let _ = dim;
    let _ = elem;
    OpSchema {
        name,
        args: vec![],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Data(ty), variadic: true }],
    }
}

/// The full op table, built once. Maps opcode name to its schema.
pub struct OpTable(HashMap<&'static str, OpSchema>);

impl OpTable {
    pub fn get(&self, op: &str) -> Option<&OpSchema> {
        self.0.get(op)
    }
}

pub fn op_table() -> &'static OpTable {
    static TABLE: Lazy<OpTable> = Lazy::new(build_op_table);
    &TABLE
}

fn build_op_table() -> OpTable {
    let mut m: HashMap<&'static str, OpSchema> = HashMap::new();
    let mut insert = |s: OpSchema| {
        m.insert(s.name, s);
    };

    // --- math: strict-checked binary ops ---
    // Comparisons are same-family binary ops too: they produce 0/1 values in
    // the *same* shape as their operands (scalar or per-lane vector), lowered
    // to `cmp_*_impl` helpers, not a scalar `bool` - a vector comparison like
    // `float3 > float3` has no single boolean result.
    for name in [
        "math_add", "math_sub", "math_mul", "math_div", "math_mod", "math_pow", "math_min",
        "math_max", "math_atan2", "math_gt", "math_lt", "math_ge", "math_le", "math_eq", "math_neq",
    ] {
        insert(binary_op(name));
    }

    // --- math: logic ---
    insert(OpSchema {
        name: "math_and",
        args: vec![("a", false), ("b", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature {
            inputs: vec![("a", TypeToken::Data(DataType::Bool)), ("b", TypeToken::Data(DataType::Bool))],
            output: TypeToken::Data(DataType::Bool),
            variadic: false,
        }],
    });
    insert(OpSchema { name: "math_or", ..m.get("math_and").cloned().unwrap_or_default() });
    // `math_or`/`math_xor` share `math_and`'s single bool/bool signature shape.
    if let Some(and_schema) = m.get("math_and").cloned() {
        insert(OpSchema { name: "math_or", ..and_schema.clone() });
        insert(OpSchema { name: "math_xor", ..and_schema });
    }
    insert(OpSchema {
        name: "math_not",
        args: vec![("value", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature {
            inputs: vec![("value", TypeToken::Data(DataType::Bool))],
            output: TypeToken::Data(DataType::Bool),
            variadic: false,
        }],
    });

    // --- math: unary ---
    for name in ["math_neg", "math_abs"] {
        insert(unary_same_type_op(name));
    }
    for name in [
        "math_sqrt", "math_floor", "math_ceil", "math_round", "math_sin", "math_cos", "math_tan",
        "math_asin", "math_acos", "math_atan", "math_exp", "math_log", "math_sign", "math_fract",
    ] {
        insert(unary_float_family_op(name));
    }
    insert(nullary_float_op("math_pi"));
    insert(nullary_float_op("math_e"));

    // --- casts ---
    for (name, out) in [
        ("static_cast_float", DataType::Float),
        ("static_cast_int", DataType::Int),
        ("static_cast_float2", DataType::Float2),
        ("static_cast_float3", DataType::Float3),
        ("static_cast_float4", DataType::Float4),
        ("static_cast_int2", DataType::Int2),
        ("static_cast_int3", DataType::Int3),
        ("static_cast_int4", DataType::Int4),
    ] {
        insert(OpSchema {
            name,
            args: vec![("value", false)],
            primary_resource: None,
            cpu_only: false,
            signatures: vec![OverloadSignature {
                inputs: vec![("value", TypeToken::Any)],
                output: TypeToken::Data(out),
                variadic: false,
            }],
        });
    }

    // --- vector/matrix/quaternion construction and ops ---
    for (name, dim) in [("float2", 2), ("float3", 3), ("float4", 4), ("int2", 2), ("int3", 3), ("int4", 4)] {
        insert(vector_constructor_schema(name, dim));
    }
    insert(OpSchema {
        name: "vec_swizzle",
        args: vec![("vec", false), ("channels", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![
            OverloadSignature { inputs: vec![("vec", TypeToken::Any)], output: TypeToken::Any, variadic: false },
        ],
    });
    insert(OpSchema {
        name: "vec_get_element",
        args: vec![("source", false), ("index", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![("source", TypeToken::Any), ("index", TypeToken::Data(DataType::Int))], output: TypeToken::Any, variadic: false }],
    });
    for name in ["vec_dot", "vec_cross", "vec_distance", "vec_reflect"] {
        insert(OpSchema {
            name,
            args: vec![("a", false), ("b", false)],
            primary_resource: None,
            cpu_only: false,
            signatures: float_family()
                .into_iter()
                .map(|ty| OverloadSignature {
                    inputs: vec![("a", TypeToken::Data(ty.clone())), ("b", TypeToken::Data(ty.clone()))],
                    output: if name == "vec_dot" || name == "vec_distance" {
                        TypeToken::Data(DataType::Float)
                    } else {
                        TypeToken::Data(ty)
                    },
                    variadic: false,
                })
                .collect(),
        });
    }
    insert(OpSchema {
        name: "vec_normalize",
        args: vec![("value", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: [DataType::Float2, DataType::Float3, DataType::Float4]
            .into_iter()
            .map(|ty| OverloadSignature { inputs: vec![("value", TypeToken::Data(ty.clone()))], output: TypeToken::Data(ty), variadic: false })
            .collect(),
    });
    insert(OpSchema {
        name: "vec_length",
        args: vec![("value", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: [DataType::Float2, DataType::Float3, DataType::Float4]
            .into_iter()
            .map(|ty| OverloadSignature { inputs: vec![("value", TypeToken::Data(ty))], output: TypeToken::Data(DataType::Float), variadic: false })
            .collect(),
    });

    insert(OpSchema {
        name: "mat_identity",
        args: vec![("size", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![
            OverloadSignature { inputs: vec![], output: TypeToken::Data(DataType::Float3x3), variadic: false },
            OverloadSignature { inputs: vec![], output: TypeToken::Data(DataType::Float4x4), variadic: false },
        ],
    });
    for name in ["mat_transpose", "mat_inverse"] {
        insert(OpSchema {
            name,
            args: vec![("value", false)],
            primary_resource: None,
            cpu_only: false,
            signatures: vec![
                OverloadSignature { inputs: vec![("value", TypeToken::Data(DataType::Float3x3))], output: TypeToken::Data(DataType::Float3x3), variadic: false },
                OverloadSignature { inputs: vec![("value", TypeToken::Data(DataType::Float4x4))], output: TypeToken::Data(DataType::Float4x4), variadic: false },
            ],
        });
    }
    insert(OpSchema {
        name: "mat_mul",
        args: vec![("a", false), ("b", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![
            OverloadSignature { inputs: vec![("a", TypeToken::Data(DataType::Float3x3)), ("b", TypeToken::Data(DataType::Float3x3))], output: TypeToken::Data(DataType::Float3x3), variadic: false },
            OverloadSignature { inputs: vec![("a", TypeToken::Data(DataType::Float4x4)), ("b", TypeToken::Data(DataType::Float4x4))], output: TypeToken::Data(DataType::Float4x4), variadic: false },
            OverloadSignature { inputs: vec![("a", TypeToken::Data(DataType::Float3x3)), ("b", TypeToken::Data(DataType::Float3))], output: TypeToken::Data(DataType::Float3), variadic: false },
            OverloadSignature { inputs: vec![("a", TypeToken::Data(DataType::Float4x4)), ("b", TypeToken::Data(DataType::Float4))], output: TypeToken::Data(DataType::Float4), variadic: false },
        ],
    });

    insert(OpSchema {
        name: "quat_mul",
        args: vec![("a", false), ("b", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![("a", TypeToken::Data(DataType::Float4)), ("b", TypeToken::Data(DataType::Float4))], output: TypeToken::Data(DataType::Float4), variadic: false }],
    });
    insert(OpSchema {
        name: "quat_rotate",
        args: vec![("quat", false), ("vec", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![("quat", TypeToken::Data(DataType::Float4)), ("vec", TypeToken::Data(DataType::Float3))], output: TypeToken::Data(DataType::Float3), variadic: false }],
    });
    insert(OpSchema {
        name: "quat_slerp",
        args: vec![("a", false), ("b", false), ("t", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature {
            inputs: vec![("a", TypeToken::Data(DataType::Float4)), ("b", TypeToken::Data(DataType::Float4)), ("t", TypeToken::Data(DataType::Float))],
            output: TypeToken::Data(DataType::Float4),
            variadic: false,
        }],
    });
    insert(OpSchema {
        name: "quat_identity",
        args: vec![],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Data(DataType::Float4), variadic: false }],
    });
    insert(OpSchema {
        name: "quat_from_axis_angle",
        args: vec![("axis", false), ("angle", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![("axis", TypeToken::Data(DataType::Float3)), ("angle", TypeToken::Data(DataType::Float))], output: TypeToken::Data(DataType::Float4), variadic: false }],
    });
    insert(OpSchema {
        name: "quat_to_mat4",
        args: vec![("value", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![("value", TypeToken::Data(DataType::Float4))], output: TypeToken::Data(DataType::Float4x4), variadic: false }],
    });

    insert(OpSchema {
        name: "color_mix",
        args: vec![("a", false), ("b", false), ("t", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature {
            inputs: vec![("a", TypeToken::Data(DataType::Float4)), ("b", TypeToken::Data(DataType::Float4)), ("t", TypeToken::Data(DataType::Float))],
            output: TypeToken::Data(DataType::Float4),
            variadic: false,
        }],
    });

    // --- variables ---
    insert(OpSchema {
        name: "var_get",
        args: vec![("var", true)],
        primary_resource: Some("var"),
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "var_set",
        args: vec![("var", true), ("val", false), ("exec_in", false), ("exec_out", false)],
        primary_resource: Some("var"),
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![("val", TypeToken::Any)], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "const_get",
        args: vec![("name", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "builtin_get",
        args: vec![("name", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "loop_index",
        args: vec![("loop", true)],
        primary_resource: Some("loop"),
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Data(DataType::Int), variadic: false }],
    });
    insert(OpSchema {
        name: "literal",
        args: vec![("value", false), ("type", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "comment",
        args: vec![("text", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Any, variadic: false }],
    });

    // --- structs ---
    insert(OpSchema {
        name: "struct_construct",
        args: vec![("type", false), ("values", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::AnyStruct, variadic: false }],
    });
    insert(OpSchema {
        name: "struct_extract",
        args: vec![("source", false), ("member", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![("source", TypeToken::AnyStruct)], output: TypeToken::Any, variadic: false }],
    });

    // --- arrays ---
    insert(OpSchema {
        name: "array_construct",
        args: vec![("values", false), ("fill", false), ("length", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::AnyArray, variadic: false }],
    });
    insert(OpSchema {
        name: "array_set",
        args: vec![("array", true), ("index", false), ("value", false), ("exec_in", false), ("exec_out", false)],
        primary_resource: Some("array"),
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![("index", TypeToken::Data(DataType::Int)), ("value", TypeToken::Any)], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "array_extract",
        args: vec![("array", false), ("index", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![("array", TypeToken::AnyArray), ("index", TypeToken::Data(DataType::Int))], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "array_length",
        args: vec![("array", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![("array", TypeToken::AnyArray)], output: TypeToken::Data(DataType::Int), variadic: false }],
    });

    // --- flow ---
    insert(OpSchema {
        name: "flow_branch",
        args: vec![("cond", false), ("exec_in", false), ("exec_true", false), ("exec_false", false)],
        primary_resource: None,
        cpu_only: false,
        // `cond` accepts a real `bool` (e.g. `front_facing`) or the 0/1
        // float a `cmp_*` comparison produces; the generator treats a
        // numeric cond as a `!= 0.0` truthiness test.
        signatures: vec![
            OverloadSignature { inputs: vec![("cond", TypeToken::Data(DataType::Bool))], output: TypeToken::Any, variadic: false },
            OverloadSignature { inputs: vec![("cond", TypeToken::Data(DataType::Float))], output: TypeToken::Any, variadic: false },
        ],
    });
    insert(OpSchema {
        name: "flow_loop",
        args: vec![
            ("start", false), ("end", false), ("count", false),
            ("exec_in", false), ("exec_body", false), ("exec_completed", false),
        ],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "call_func",
        args: vec![("func", true), ("exec_in", false), ("exec_out", false)],
        primary_resource: Some("func"),
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "func_return",
        args: vec![("value", false), ("exec_in", false)],
        primary_resource: None,
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Any, variadic: false }],
    });

    // --- resources ---
    insert(OpSchema {
        name: "buffer_load",
        args: vec![("buffer", true), ("index", false)],
        primary_resource: Some("buffer"),
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![("index", TypeToken::Data(DataType::Int))], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "buffer_store",
        args: vec![("buffer", true), ("index", false), ("value", false), ("exec_in", false), ("exec_out", false)],
        primary_resource: Some("buffer"),
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![("index", TypeToken::Data(DataType::Int)), ("value", TypeToken::Any)], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "texture_sample",
        args: vec![("texture", true), ("uv", false)],
        primary_resource: Some("texture"),
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![("uv", TypeToken::Data(DataType::Float2))], output: TypeToken::Data(DataType::Float4), variadic: false }],
    });
    insert(OpSchema {
        name: "texture_load",
        args: vec![("texture", true), ("coord", false)],
        primary_resource: Some("texture"),
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![("coord", TypeToken::Data(DataType::Int2))], output: TypeToken::Data(DataType::Float4), variadic: false }],
    });
    insert(OpSchema {
        name: "texture_store",
        args: vec![("texture", true), ("coord", false), ("value", false), ("exec_in", false), ("exec_out", false)],
        primary_resource: Some("texture"),
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![("coord", TypeToken::Data(DataType::Int2)), ("value", TypeToken::Data(DataType::Float4))], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "resource_get_size",
        args: vec![("resource", true)],
        primary_resource: Some("resource"),
        cpu_only: false,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Data(DataType::Float2), variadic: false }],
    });
    insert(OpSchema {
        name: "resource_get_format",
        args: vec![("resource", true)],
        primary_resource: Some("resource"),
        cpu_only: true,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Data(DataType::Int), variadic: false }],
    });

    // --- atomics ---
    for name in ["atomic_load"] {
        insert(OpSchema {
            name,
            args: vec![("target", true)],
            primary_resource: Some("target"),
            cpu_only: false,
            signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Data(DataType::Int), variadic: false }],
        });
    }
    for name in ["atomic_store", "atomic_add", "atomic_sub", "atomic_min", "atomic_max", "atomic_exchange"] {
        insert(OpSchema {
            name,
            args: vec![("target", true), ("value", false), ("exec_in", false), ("exec_out", false)],
            primary_resource: Some("target"),
            cpu_only: false,
            signatures: vec![OverloadSignature { inputs: vec![("value", TypeToken::Data(DataType::Int))], output: TypeToken::Data(DataType::Int), variadic: false }],
        });
    }

    // --- commands (cpu-only) ---
    insert(OpSchema {
        name: "cmd_dispatch",
        args: vec![("func", true), ("exec_in", false), ("exec_out", false)],
        primary_resource: Some("func"),
        cpu_only: true,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "cmd_resize_resource",
        args: vec![("resource", true), ("width", false), ("height", false), ("exec_in", false), ("exec_out", false)],
        primary_resource: Some("resource"),
        cpu_only: true,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "cmd_draw",
        args: vec![("pipeline", false), ("target", true), ("vertex_func", true), ("fragment_func", true), ("exec_in", false), ("exec_out", false)],
        primary_resource: Some("target"),
        cpu_only: true,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "cmd_sync_to_cpu",
        args: vec![("resource", true), ("exec_in", false), ("exec_out", false)],
        primary_resource: Some("resource"),
        cpu_only: true,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "cmd_wait_cpu_sync",
        args: vec![("resource", true), ("exec_in", false), ("exec_out", false)],
        primary_resource: Some("resource"),
        cpu_only: true,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "cmd_copy_buffer",
        args: vec![("src", true), ("dst", true), ("exec_in", false), ("exec_out", false)],
        primary_resource: Some("dst"),
        cpu_only: true,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Any, variadic: false }],
    });
    insert(OpSchema {
        name: "cmd_copy_texture",
        args: vec![("src", true), ("dst", true), ("exec_in", false), ("exec_out", false)],
        primary_resource: Some("dst"),
        cpu_only: true,
        signatures: vec![OverloadSignature { inputs: vec![], output: TypeToken::Any, variadic: false }],
    });

    OpTable(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_op_has_same_family_and_broadcast_signatures() {
        let add = op_table().get("math_add").unwrap();
        assert!(add.signatures.iter().any(|s| s.output == TypeToken::Data(DataType::Float)));
        assert!(add
            .signatures
            .iter()
            .any(|s| s.inputs[0].1 == TypeToken::Data(DataType::Float2)
                && s.inputs[1].1 == TypeToken::Data(DataType::Float)));
    }

    #[test]
    fn comparison_ops_output_the_operand_shape_not_a_scalar_bool() {
        let gt = op_table().get("math_gt").unwrap();
        assert!(gt
            .signatures
            .iter()
            .any(|s| s.inputs[0].1 == TypeToken::Data(DataType::Float3)
                && s.inputs[1].1 == TypeToken::Data(DataType::Float3)
                && s.output == TypeToken::Data(DataType::Float3)));
        assert!(gt
            .signatures
            .iter()
            .any(|s| s.inputs[0].1 == TypeToken::Data(DataType::Float)
                && s.inputs[1].1 == TypeToken::Data(DataType::Float)
                && s.output == TypeToken::Data(DataType::Float)));
    }

    #[test]
    fn cpu_only_ops_are_flagged() {
        assert!(op_table().get("cmd_dispatch").unwrap().cpu_only);
        assert!(!op_table().get("math_add").unwrap().cpu_only);
    }

    #[test]
    fn identifier_args_are_flagged() {
        let buffer_load = op_table().get("buffer_load").unwrap();
        assert!(buffer_load.is_identifier_arg("buffer"));
        assert!(!buffer_load.is_identifier_arg("index"));
    }
}
