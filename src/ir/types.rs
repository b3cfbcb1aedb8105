//! Canonical in-memory IR types.
//!
//! These mirror the on-wire JSON document field-for-field, but replace the
//! loose/duck-typed wire shapes (dotted swizzle strings, `args.*`/`values.*`
//! bags) with typed fields. `crate::ir::json` performs that normalization
//! once at load; nothing downstream re-parses JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A scalar/vector/matrix/opaque/composite value type in the IR.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Float,
    Int,
    Bool,
    Float2,
    Float3,
    Float4,
    Int2,
    Int3,
    Int4,
    Float3x3,
    Float4x4,
    String,
    Texture2D,
    Sampler,
    Struct(String),
    Array(Box<DataType>, u32),
    /// `T[]`, legal only at input position.
    DynamicArray(Box<DataType>),
}

impl DataType {
    pub fn is_numeric_vector(&self) -> bool {
        matches!(
            self,
            DataType::Float
                | DataType::Int
                | DataType::Float2
                | DataType::Float3
                | DataType::Float4
                | DataType::Int2
                | DataType::Int3
                | DataType::Int4
        )
    }

    pub fn is_float_family(&self) -> bool {
        matches!(
            self,
            DataType::Float | DataType::Float2 | DataType::Float3 | DataType::Float4
        )
    }

    pub fn is_int_family(&self) -> bool {
        matches!(
            self,
            DataType::Int | DataType::Int2 | DataType::Int3 | DataType::Int4
        )
    }

    /// Lane count for a numeric vector/scalar type (1 for scalars).
    pub fn lanes(&self) -> Option<u32> {
        match self {
            DataType::Float | DataType::Int => Some(1),
            DataType::Float2 | DataType::Int2 => Some(2),
            DataType::Float3 | DataType::Int3 => Some(3),
            DataType::Float4 | DataType::Int4 => Some(4),
            _ => None,
        }
    }

    /// The int-family counterpart of a float-family type with the same lane count, or vice versa.
    pub fn numeric_counterpart(&self) -> Option<DataType> {
        Some(match self {
            DataType::Float => DataType::Int,
            DataType::Int => DataType::Float,
            DataType::Float2 => DataType::Int2,
            DataType::Int2 => DataType::Float2,
            DataType::Float3 => DataType::Int3,
            DataType::Int3 => DataType::Float3,
            DataType::Float4 => DataType::Int4,
            DataType::Int4 => DataType::Float4,
            _ => return None,
        })
    }

    pub fn parse(s: &str) -> Result<DataType, String> {
        if let Some(inner) = s.strip_suffix("[]") {
            return Ok(DataType::DynamicArray(Box::new(DataType::parse(inner)?)));
        }
        if let Some(rest) = s.strip_prefix("array<") {
            let rest = rest
                .strip_suffix('>')
                .ok_or_else(|| format!("malformed array type '{s}'"))?;
            let (elem, n) = rest
                .rsplit_once(',')
                .ok_or_else(|| format!("malformed array type '{s}'"))?;
            let n: u32 = n
                .trim()
                .parse()
                .map_err(|_| format!("malformed array length in '{s}'"))?;
            return Ok(DataType::Array(Box::new(DataType::parse(elem.trim())?), n));
        }
        Ok(match s {
            "float" => DataType::Float,
            "int" => DataType::Int,
            "bool" => DataType::Bool,
            "float2" => DataType::Float2,
            "float3" => DataType::Float3,
            "float4" => DataType::Float4,
            "int2" => DataType::Int2,
            "int3" => DataType::Int3,
            "int4" => DataType::Int4,
            "float3x3" => DataType::Float3x3,
            "float4x4" => DataType::Float4x4,
            "string" => DataType::String,
            "texture2d" => DataType::Texture2D,
            "sampler" => DataType::Sampler,
            other => DataType::Struct(other.to_string()),
        })
    }

    pub fn to_wire_string(&self) -> String {
        match self {
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
            DataType::String => "string".into(),
            DataType::Texture2D => "texture2d".into(),
            DataType::Sampler => "sampler".into(),
            DataType::Struct(id) => id.clone(),
            DataType::Array(elem, n) => format!("array<{}, {n}>", elem.to_wire_string()),
            DataType::DynamicArray(elem) => format!("{}[]", elem.to_wire_string()),
        }
    }
}

impl Serialize for DataType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_wire_string())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DataType::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Bidirectional texture format enum; the integer mapping is the runtime ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureFormat {
    Unknown,
    Rgba8,
    Rgba16f,
    Rgba32f,
    R8,
    R16f,
    R32f,
}

impl TextureFormat {
    pub fn to_u32(self) -> u32 {
        match self {
            TextureFormat::Unknown => 0,
            TextureFormat::Rgba8 => 1,
            TextureFormat::Rgba16f => 2,
            TextureFormat::Rgba32f => 3,
            TextureFormat::R8 => 4,
            TextureFormat::R16f => 5,
            TextureFormat::R32f => 6,
        }
    }

    pub fn from_u32(v: u32) -> Option<TextureFormat> {
        Some(match v {
            0 => TextureFormat::Unknown,
            1 => TextureFormat::Rgba8,
            2 => TextureFormat::Rgba16f,
            3 => TextureFormat::Rgba32f,
            4 => TextureFormat::R8,
            5 => TextureFormat::R16f,
            6 => TextureFormat::R32f,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapMode {
    Clamp,
    Repeat,
    Mirror,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerSpec {
    pub filter: FilterMode,
    pub wrap: WrapMode,
}

/// One of the four resource size modes: fixed, swapchain-relative,
/// ratio-of-another-resource, or explicitly dynamic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResourceSize {
    Fixed {
        /// Element count for a buffer, or `[width, height]` for a texture.
        #[serde(flatten)]
        extent: FixedExtent,
    },
    Viewport {
        #[serde(default)]
        scale: Option<f32>,
    },
    Reference {
        #[serde(rename = "ref")]
        reference: String,
    },
    CpuDriven,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FixedExtent {
    Count(u32),
    Extent2D([u32; 2]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClearValue {
    Float(f32),
    Int(i32),
    Color([f32; 4]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persistence {
    #[serde(default)]
    pub retain_across_frames: bool,
    #[serde(default)]
    pub clear_on_resize: bool,
    #[serde(default)]
    pub clear_every_frame: bool,
    #[serde(default)]
    pub clear_value: Option<ClearValue>,
    #[serde(default, rename = "cpuAccess")]
    pub cpu_access: bool,
}

impl Default for Persistence {
    fn default() -> Self {
        Persistence {
            retain_across_frames: false,
            clear_on_resize: false,
            clear_every_frame: false,
            clear_value: None,
            cpu_access: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceKind {
    Texture2d {
        format: TextureFormat,
    },
    Buffer {
        #[serde(rename = "dataType")]
        data_type: DataType,
    },
    AtomicCounter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDef {
    pub id: String,
    #[serde(flatten)]
    pub kind: ResourceKind,
    pub size: ResourceSize,
    #[serde(default)]
    pub persistence: Persistence,
}

impl ResourceDef {
    pub fn is_atomic_counter(&self) -> bool {
        matches!(self.kind, ResourceKind::AtomicCounter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiHint {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalInput {
    pub id: String,
    #[serde(rename = "dataType")]
    pub data_type: DataType,
    #[serde(default)]
    pub ui: Option<UiHint>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub sampler: Option<SamplerSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructMember {
    pub id: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub id: String,
    pub members: Vec<StructMember>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    Cpu,
    Shader,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionIo {
    pub id: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub builtin: Option<String>,
    #[serde(default)]
    pub location: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalVar {
    pub id: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default, rename = "initialValue")]
    pub initial_value: Option<serde_json::Value>,
}

/// A single syntactic property value after JSON-adapter normalization.
///
/// Any bare string is represented as [`PropValue::StrRef`] with an optional
/// swizzle suffix split off *syntactically*, applying the inline-swizzle
/// rule before any id lookup happens. Whether the base string actually
/// resolves to a node/var/input id — as opposed to being a plain string
/// literal — is decided later, by edge reconstruction, which is the only
/// place that has the whole-function id namespace in view.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Number(f64),
    Bool(bool),
    /// A bare string literal, or a syntactic `base.swizzle` reference.
    StrRef { base: String, swizzle: Option<String> },
    Array(Vec<PropValue>),
    Object(BTreeMap<String, PropValue>),
    Null,
}

impl PropValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_plain_str(&self) -> Option<&str> {
        match self {
            PropValue::StrRef { base, swizzle: None } => Some(base.as_str()),
            _ => None,
        }
    }

    pub fn as_str_ref(&self) -> Option<(&str, Option<&str>)> {
        match self {
            PropValue::StrRef { base, swizzle } => Some((base.as_str(), swizzle.as_deref())),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PropValue]> {
        match self {
            PropValue::Array(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, PropValue>> {
        match self {
            PropValue::Object(m) => Some(m),
            _ => None,
        }
    }
}

/// A node in a function's graph. Edges are not stored — they are
/// reconstructed from `properties` by [`crate::edges`].
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub op: String,
    pub metadata: Option<serde_json::Value>,
    pub properties: BTreeMap<String, PropValue>,
}

impl Node {
    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.properties.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub id: String,
    pub kind: FunctionKind,
    #[serde(default)]
    pub inputs: Vec<FunctionIo>,
    #[serde(default)]
    pub outputs: Vec<FunctionIo>,
    #[serde(default, rename = "localVars")]
    pub local_vars: Vec<LocalVar>,
    #[serde(default, skip_serializing)]
    #[serde(deserialize_with = "crate::ir::json::deserialize_nodes")]
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRDocument {
    pub version: String,
    #[serde(default)]
    pub meta: Metadata,
    #[serde(rename = "entryPoint")]
    pub entry_point: String,
    #[serde(default)]
    pub inputs: Vec<GlobalInput>,
    #[serde(default)]
    pub resources: Vec<ResourceDef>,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    pub functions: Vec<FunctionDef>,
}

impl IRDocument {
    pub fn function(&self, id: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.id == id)
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceDef> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn struct_def(&self, id: &str) -> Option<&StructDef> {
        self.structs.iter().find(|s| s.id == id)
    }

    pub fn input(&self, id: &str) -> Option<&GlobalInput> {
        self.inputs.iter().find(|i| i.id == id)
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata { name: None, created: None, modified: None }
    }
}
