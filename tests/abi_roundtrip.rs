//! Property: `unpack(pack(v, T), T) == v` for every blittable shape the
//! flat globals buffer carries — a struct, a nested struct-of-vector, and a
//! fixed-size array.

use proptest::prelude::*;

use shadergraph_compiler::abi::{pack, unpack, AbiValue, Mat3Abi, Vec3Abi, Vec4Abi};
use shadergraph_compiler::ir::{DataType, IRDocument, Metadata, StructDef, StructMember};

fn finite() -> impl Strategy<Value = f32> {
    -1000.0f32..1000.0f32
}

fn doc_with_structs() -> IRDocument {
    IRDocument {
        version: "1".into(),
        meta: Metadata::default(),
        entry_point: "main".into(),
        inputs: vec![],
        resources: vec![],
        structs: vec![
            StructDef {
                id: "Particle".into(),
                members: vec![
                    StructMember { id: "pos".into(), data_type: DataType::Float3 },
                    StructMember { id: "life".into(), data_type: DataType::Float },
                ],
            },
            StructDef {
                id: "Transform".into(),
                members: vec![
                    StructMember { id: "translate".into(), data_type: DataType::Float3 },
                    StructMember { id: "particle".into(), data_type: DataType::Struct("Particle".into()) },
                ],
            },
        ],
        functions: vec![],
    }
}

fn roundtrip(value: &AbiValue, ty: &DataType, doc: &IRDocument) -> AbiValue {
    let mut buf = Vec::new();
    pack(value, ty, doc, &mut buf).unwrap();
    let (out, consumed) = unpack(&buf, 0, ty, doc).unwrap();
    assert_eq!(consumed, buf.len());
    out
}

proptest! {
    #[test]
    fn struct_of_vector_and_scalar_roundtrips(pos in proptest::array::uniform3(finite()), life in finite()) {
        let doc = doc_with_structs();
        let value = AbiValue::Struct(vec![AbiValue::Vec3(Vec3Abi(pos)), AbiValue::Scalar(life)]);
        let ty = DataType::Struct("Particle".into());
        prop_assert_eq!(roundtrip(&value, &ty, &doc), value);
    }

    #[test]
    fn nested_struct_of_struct_roundtrips(
        translate in proptest::array::uniform3(finite()),
        pos in proptest::array::uniform3(finite()),
        life in finite(),
    ) {
        let doc = doc_with_structs();
        let value = AbiValue::Struct(vec![
            AbiValue::Vec3(Vec3Abi(translate)),
            AbiValue::Struct(vec![AbiValue::Vec3(Vec3Abi(pos)), AbiValue::Scalar(life)]),
        ]);
        let ty = DataType::Struct("Transform".into());
        prop_assert_eq!(roundtrip(&value, &ty, &doc), value);
    }

    #[test]
    fn fixed_array_of_vec4_roundtrips(
        a in proptest::array::uniform4(finite()),
        b in proptest::array::uniform4(finite()),
        c in proptest::array::uniform4(finite()),
    ) {
        let doc = doc_with_structs();
        let value = AbiValue::Array(vec![
            AbiValue::Vec4(Vec4Abi(a)),
            AbiValue::Vec4(Vec4Abi(b)),
            AbiValue::Vec4(Vec4Abi(c)),
        ]);
        let ty = DataType::Array(Box::new(DataType::Float4), 3);
        prop_assert_eq!(roundtrip(&value, &ty, &doc), value);
    }

    #[test]
    fn mat3_inside_a_struct_roundtrips(m in proptest::array::uniform9(finite()), life in finite()) {
        // Exercises a non-vector fixed-size blittable field (a 3x3 matrix)
        // sitting alongside a scalar in the same struct.
        let doc = IRDocument {
            version: "1".into(),
            meta: Metadata::default(),
            entry_point: "main".into(),
            inputs: vec![],
            resources: vec![],
            structs: vec![StructDef {
                id: "Basis".into(),
                members: vec![
                    StructMember { id: "m".into(), data_type: DataType::Float3x3 },
                    StructMember { id: "life".into(), data_type: DataType::Float },
                ],
            }],
            functions: vec![],
        };
        let value = AbiValue::Struct(vec![AbiValue::Mat3(Mat3Abi(m)), AbiValue::Scalar(life)]);
        let ty = DataType::Struct("Basis".into());
        prop_assert_eq!(roundtrip(&value, &ty, &doc), value);
    }
}
