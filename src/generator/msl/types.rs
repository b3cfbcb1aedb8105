//! Maps a [`DataType`] onto its Metal Shading Language spelling.

use crate::ir::DataType;

pub fn msl_type_name(ty: &DataType) -> String {
    match ty {
        DataType::Float => "float".into(),
        DataType::Int => "int".into(),
        DataType::Bool => "bool".into(),
        DataType::Float2 => "float2".into(),
        DataType::Float3 => "float3".into(),
        DataType::Float4 => "float4".into(),
        DataType::Int2 => "int2".into(),
        DataType::Int3 => "int3".into(),
        DataType::Int4 => "int4".into(),
        DataType::Float3x3 => "float3x3".into(),
        DataType::Float4x4 => "float4x4".into(),
        DataType::String => "constant char*".into(),
        DataType::Texture2D => "texture2d<float>".into(),
        DataType::Sampler => "sampler".into(),
        DataType::Struct(name) => name.clone(),
        DataType::Array(elem, n) => format!("array<{}, {n}>", msl_type_name(elem)),
        DataType::DynamicArray(elem) => format!("device {}*", msl_type_name(elem)),
    }
}
