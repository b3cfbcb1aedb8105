//! Host ABI marshaller: flat-float-buffer sizing and pack/unpack for every
//! blittable [`DataType`], mirrored on the host side by small `#[repr(C)]`
//! POD wrappers so a generated globals buffer can be read back with
//! `bytemuck::cast_slice` instead of manual byte math.

use bytemuck::{Pod, Zeroable};

use crate::ir::{DataType, IRDocument};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vec2Abi(pub [f32; 2]);

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vec3Abi(pub [f32; 3]);

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vec4Abi(pub [f32; 4]);

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Mat3Abi(pub [f32; 9]);

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Mat4Abi(pub [f32; 16]);

/// A value shaped to mirror one [`DataType`], used on the host side of the
/// flat globals buffer (pack before dispatch, unpack after readback).
#[derive(Debug, Clone, PartialEq)]
pub enum AbiValue {
    Scalar(f32),
    Vec2(Vec2Abi),
    Vec3(Vec3Abi),
    Vec4(Vec4Abi),
    Mat3(Mat3Abi),
    Mat4(Mat4Abi),
    Struct(Vec<AbiValue>),
    Array(Vec<AbiValue>),
    /// `[len, elem_0, elem_1, ...]`, the `T[]` wire encoding.
    DynamicArray(Vec<AbiValue>),
}

/// The float count a value of `ty` occupies in the flat globals buffer.
/// `None` for a dynamic array: its footprint depends on the runtime length
/// prefix, not the type alone.
pub fn flat_size(ty: &DataType, doc: &IRDocument) -> Option<u32> {
    Some(match ty {
        DataType::Float | DataType::Int | DataType::Bool => 1,
        DataType::Float2 | DataType::Int2 => 2,
        DataType::Float3 | DataType::Int3 => 3,
        DataType::Float4 | DataType::Int4 => 4,
        DataType::Float3x3 => 9,
        DataType::Float4x4 => 16,
        DataType::Struct(name) => {
            let def = doc.struct_def(name)?;
            let mut total = 0;
            for member in &def.members {
                total += flat_size(&member.data_type, doc)?;
            }
            total
        }
        DataType::Array(elem, n) => flat_size(elem, doc)? * n,
        DataType::String | DataType::Texture2D | DataType::Sampler | DataType::DynamicArray(_) => return None,
    })
}

/// Packs `value` into `out` (appended), following `ty`'s flat layout.
pub fn pack(value: &AbiValue, ty: &DataType, doc: &IRDocument, out: &mut Vec<f32>) -> Result<(), String> {
    match (value, ty) {
        (AbiValue::Scalar(v), DataType::Float) => out.push(*v),
        (AbiValue::Scalar(v), DataType::Int) => out.push(v.trunc()),
        (AbiValue::Scalar(v), DataType::Bool) => out.push(if *v != 0.0 { 1.0 } else { 0.0 }),
        (AbiValue::Vec2(v), DataType::Float2 | DataType::Int2) => out.extend_from_slice(&v.0),
        (AbiValue::Vec3(v), DataType::Float3 | DataType::Int3) => out.extend_from_slice(&v.0),
        (AbiValue::Vec4(v), DataType::Float4 | DataType::Int4) => out.extend_from_slice(&v.0),
        (AbiValue::Mat3(v), DataType::Float3x3) => out.extend_from_slice(&v.0),
        (AbiValue::Mat4(v), DataType::Float4x4) => out.extend_from_slice(&v.0),
        (AbiValue::Struct(members), DataType::Struct(name)) => {
            let def = doc.struct_def(name).ok_or_else(|| format!("unknown struct '{name}'"))?;
            if members.len() != def.members.len() {
                return Err(format!("struct '{name}' expects {} members, got {}", def.members.len(), members.len()));
            }
            for (value, member) in members.iter().zip(&def.members) {
                pack(value, &member.data_type, doc, out)?;
            }
        }
        (AbiValue::Array(items), DataType::Array(elem, n)) => {
            if items.len() as u32 != *n {
                return Err(format!("array expects {n} elements, got {}", items.len()));
            }
            for item in items {
                pack(item, elem, doc, out)?;
            }
        }
        (AbiValue::DynamicArray(items), DataType::DynamicArray(elem)) => {
            out.push(items.len() as f32);
            for item in items {
                pack(item, elem, doc, out)?;
            }
        }
        _ => return Err(format!("value shape does not match type {}", ty.to_wire_string())),
    }
    Ok(())
}

/// Reads one `ty`-shaped value starting at `buf[offset]`, returning the
/// value and the offset just past it.
pub fn unpack(buf: &[f32], offset: usize, ty: &DataType, doc: &IRDocument) -> Result<(AbiValue, usize), String> {
    let at = |n: usize| -> Result<&[f32], String> {
        buf.get(offset..offset + n).ok_or_else(|| "globals buffer read past end".to_string())
    };
    Ok(match ty {
        DataType::Float | DataType::Int | DataType::Bool => (AbiValue::Scalar(at(1)?[0]), offset + 1),
        DataType::Float2 | DataType::Int2 => {
            let s = at(2)?;
            (AbiValue::Vec2(Vec2Abi([s[0], s[1]])), offset + 2)
        }
        DataType::Float3 | DataType::Int3 => {
            let s = at(3)?;
            (AbiValue::Vec3(Vec3Abi([s[0], s[1], s[2]])), offset + 3)
        }
        DataType::Float4 | DataType::Int4 => {
            let s = at(4)?;
            (AbiValue::Vec4(Vec4Abi([s[0], s[1], s[2], s[3]])), offset + 4)
        }
        DataType::Float3x3 => {
            let s = at(9)?;
            let mut arr = [0.0; 9];
            arr.copy_from_slice(s);
            (AbiValue::Mat3(Mat3Abi(arr)), offset + 9)
        }
        DataType::Float4x4 => {
            let s = at(16)?;
            let mut arr = [0.0; 16];
            arr.copy_from_slice(s);
            (AbiValue::Mat4(Mat4Abi(arr)), offset + 16)
        }
        DataType::Struct(name) => {
            let def = doc.struct_def(name).ok_or_else(|| format!("unknown struct '{name}'"))?;
            let mut members = Vec::with_capacity(def.members.len());
            let mut cursor = offset;
            for member in &def.members {
                let (v, next) = unpack(buf, cursor, &member.data_type, doc)?;
                members.push(v);
                cursor = next;
            }
            (AbiValue::Struct(members), cursor)
        }
        DataType::Array(elem, n) => {
            let mut items = Vec::with_capacity(*n as usize);
            let mut cursor = offset;
            for _ in 0..*n {
                let (v, next) = unpack(buf, cursor, elem, doc)?;
                items.push(v);
                cursor = next;
            }
            (AbiValue::Array(items), cursor)
        }
        DataType::DynamicArray(elem) => {
            let len = at(1)?[0] as usize;
            let mut items = Vec::with_capacity(len);
            let mut cursor = offset + 1;
            for _ in 0..len {
                let (v, next) = unpack(buf, cursor, elem, doc)?;
                items.push(v);
                cursor = next;
            }
            (AbiValue::DynamicArray(items), cursor)
        }
        DataType::String | DataType::Texture2D | DataType::Sampler => {
            return Err(format!("type '{}' has no flat-buffer representation", ty.to_wire_string()))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Metadata, StructDef, StructMember};

    fn doc_with_struct() -> IRDocument {
        IRDocument {
            version: "1".into(),
            meta: Metadata::default(),
            entry_point: "main".into(),
            inputs: vec![],
            resources: vec![],
            structs: vec![StructDef {
                id: "Particle".into(),
                members: vec![
                    StructMember { id: "pos".into(), data_type: DataType::Float3 },
                    StructMember { id: "life".into(), data_type: DataType::Float },
                ],
            }],
            functions: vec![],
        }
    }

    #[test]
    fn flat_size_sums_struct_members() {
        let doc = doc_with_struct();
        assert_eq!(flat_size(&DataType::Struct("Particle".into()), &doc), Some(4));
    }

    #[test]
    fn fixed_array_flat_size_multiplies_element_size() {
        let doc = doc_with_struct();
        assert_eq!(flat_size(&DataType::Array(Box::new(DataType::Float4), 3), &doc), Some(12));
    }

    #[test]
    fn struct_round_trips_through_pack_unpack() {
        let doc = doc_with_struct();
        let value = AbiValue::Struct(vec![
            AbiValue::Vec3(Vec3Abi([1.0, 2.0, 3.0])),
            AbiValue::Scalar(0.5),
        ]);
        let ty = DataType::Struct("Particle".into());
        let mut buf = Vec::new();
        pack(&value, &ty, &doc, &mut buf).unwrap();
        let (round_tripped, consumed) = unpack(&buf, 0, &ty, &doc).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(round_tripped, value);
    }

    #[test]
    fn dynamic_array_round_trips_with_length_prefix() {
        let doc = doc_with_struct();
        let value = AbiValue::DynamicArray(vec![AbiValue::Scalar(1.0), AbiValue::Scalar(2.0), AbiValue::Scalar(3.0)]);
        let ty = DataType::DynamicArray(Box::new(DataType::Float));
        let mut buf = Vec::new();
        pack(&value, &ty, &doc, &mut buf).unwrap();
        assert_eq!(buf[0], 3.0);
        let (round_tripped, _) = unpack(&buf, 0, &ty, &doc).unwrap();
        assert_eq!(round_tripped, value);
    }
}
