//! Globals-buffer and resource-binding layout (one flat `float` buffer at
//! binding 0, plus a sequential binding index per resource) assigned once
//! per compile so a generated kernel and its host-side pack/unpack agree on
//! offsets without either side re-deriving them.

use std::collections::{BTreeSet, HashMap};

use crate::abi::flat_size;
use crate::ir::{DataType, FunctionDef, IRDocument};
use crate::schema::BUILTIN_CPU_ALLOWED;

#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// id -> float offset into the globals buffer (`b_globals`).
    pub var_map: HashMap<String, u32>,
    /// Total byte size (`max(flatCount * 4, 16)`), the `globalBufferSize` of
    /// the generator output manifest.
    pub global_buffer_size: u32,
    /// id -> sequential MSL binding index; binding 0 is reserved for
    /// `b_globals` whenever `var_map` is non-empty.
    pub resource_bindings: HashMap<String, u32>,
}

impl Layout {
    pub fn offset_of(&self, id: &str) -> Option<u32> {
        self.var_map.get(id).copied()
    }

    pub fn binding_of(&self, id: &str) -> Option<u32> {
        self.resource_bindings.get(id).copied()
    }
}

/// Builds the layout for one entry's reachable function set. `builtins_used`
/// is the set of CPU-allowed builtin names (`time`, `bpm`, ...) any reachable
/// function actually reads, gathered by the caller while walking bodies.
pub fn build_layout(doc: &IRDocument, reachable: &[&FunctionDef], builtins_used: &BTreeSet<String>) -> Layout {
    let mut var_map = HashMap::new();
    let mut offset: u32 = 0;

    for input in &doc.inputs {
        if matches!(input.data_type, DataType::Texture2D | DataType::Sampler) {
            continue;
        }
        if var_map.contains_key(&input.id) {
            continue;
        }
        var_map.insert(input.id.clone(), offset);
        offset += flat_size(&input.data_type, doc).unwrap_or(1);
    }

    for func in reachable {
        for io in &func.inputs {
            if var_map.contains_key(&io.id) {
                continue;
            }
            var_map.insert(io.id.clone(), offset);
            offset += flat_size(&io.data_type, doc).unwrap_or(1);
        }
    }

    for name in BUILTIN_CPU_ALLOWED.iter() {
        if builtins_used.contains(*name) && !var_map.contains_key(*name) {
            var_map.insert((*name).to_string(), offset);
            offset += 1;
        }
    }

    for func in reachable {
        for local in &func.local_vars {
            if var_map.contains_key(&local.id) {
                continue;
            }
            var_map.insert(local.id.clone(), offset);
            offset += flat_size(&local.data_type, doc).unwrap_or(1);
        }
        for node in &func.nodes {
            if node.op != "var_set" {
                continue;
            }
            let Some(target) = node.prop("var").and_then(|p| p.as_plain_str()) else { continue };
            if var_map.contains_key(target) {
                continue;
            }
            var_map.insert(target.to_string(), offset);
            offset += 1;
        }
    }

    let global_buffer_size = (offset * 4).max(16);

    let mut resource_bindings = HashMap::new();
    let mut next_binding: u32 = if var_map.is_empty() { 0 } else { 1 };
    // Texture/sampler-typed global inputs are bound ahead of `doc.resources`
    // ("other resources"), matching the reserved slot order: globals, then
    // outputs, then texture inputs, then other resources.
    for input in &doc.inputs {
        if matches!(input.data_type, DataType::Texture2D | DataType::Sampler) {
            resource_bindings.insert(input.id.clone(), next_binding);
            next_binding += 1;
        }
    }
    for resource in &doc.resources {
        resource_bindings.insert(resource.id.clone(), next_binding);
        next_binding += 1;
    }

    Layout { var_map, global_buffer_size, resource_bindings }
}
