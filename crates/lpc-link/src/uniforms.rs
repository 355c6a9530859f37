//! Uniform array sizing and uniform storage.

use alloc::{collections::BTreeMap, format, string::String, vec::Vec};

use log::{debug, trace};
use lpc_glir::{ShaderIr, Type, Var, VariableMode};

use crate::{
    shader::LinkedShader,
    stage::{PerStage, ShaderStage},
    uniform_blocks::UniformBlock,
};

/// One active uniform of the program.
///
/// Basic arrays are one entry with `array_elements` set; structures are
/// flattened into one entry per leaf member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformStorage {
    /// Program resource name, e.g. `lights[1].color`
    pub name: String,
    /// Leaf type (an array for basic arrays)
    pub ty: Type,
    /// Array length, 0 for non-arrays
    pub array_elements: u32,
    /// Program uniform block, -1 for the default block
    pub block_index: i32,
    /// Default block: component offset. Block member: byte offset.
    pub offset: u32,
    /// Stages referencing the uniform
    pub active: PerStage<bool>,
    /// First sampler unit per stage, for samplers
    pub sampler_index: PerStage<Option<u32>>,
    /// Explicit binding, or -1
    pub binding: i32,
    /// Atomic counter buffer, or -1
    pub atomic_buffer_index: i32,
}

impl UniformStorage {
    fn new(name: String, ty: Type, block_index: i32, offset: u32, binding: i32) -> Self {
        Self {
            array_elements: ty.array_length().unwrap_or(0),
            name,
            ty,
            block_index,
            offset,
            active: PerStage::default(),
            sampler_index: PerStage::default(),
            binding,
            atomic_buffer_index: -1,
        }
    }
}

fn is_resizable_uniform(ir: &ShaderIr, var: Var) -> bool {
    let variable = &ir.vars[var];
    variable.mode == VariableMode::Uniform
        && variable.ty.is_array()
        && variable.interface_type.is_none()
        && !variable.ty.contains_atomic()
}

/// Size uniform arrays to the highest element any stage accesses.
pub fn update_array_sizes(shaders: &mut PerStage<Option<LinkedShader>>) {
    let mut max_access: BTreeMap<String, u32> = BTreeMap::new();
    for (_, shader) in shaders.iter() {
        let Some(shader) = shader else { continue };
        let ir = &shader.ir;
        for var in ir.global_vars().filter(|v| is_resizable_uniform(ir, *v)) {
            let variable = &ir.vars[var];
            let entry = max_access.entry(variable.name.clone()).or_insert(0);
            *entry = (*entry).max(variable.max_array_access);
        }
    }

    for (_, shader) in shaders.iter_mut() {
        let Some(shader) = shader else { continue };
        let ir = &mut shader.ir;
        let globals: Vec<Var> = ir.global_vars().collect();
        for var in globals {
            if !is_resizable_uniform(ir, var) {
                continue;
            }
            let variable = &mut ir.vars[var];
            let Some(&max) = max_access.get(&variable.name) else {
                continue;
            };
            if variable.ty.array_length() == Some(max + 1) {
                continue;
            }
            if let Some(ty) = variable.ty.with_length(max + 1) {
                debug!("uniform '{}' resized to {}", variable.name, max + 1);
                variable.ty = ty;
            }
        }
        ir.refresh_deref_types();
    }
}

/// Flatten a uniform into its leaf members.
fn leaves(name: &str, ty: &Type, out: &mut Vec<(String, Type)>) {
    match ty {
        Type::Struct(s) => {
            for field in &s.fields {
                leaves(&format!("{}.{}", name, field.name), &field.ty, out);
            }
        }
        Type::Array { element, length } if matches!(**element, Type::Struct(_)) => {
            for i in 0..*length {
                leaves(&format!("{}[{}]", name, i), element, out);
            }
        }
        _ => out.push((String::from(name), ty.clone())),
    }
}

/// Build the uniform storage of the program and the per-stage uniform
/// counters.
///
/// Default-block uniforms come first, in declaration order across the
/// stages, followed by the members of every program uniform block.
pub fn link_assign_uniform_locations(
    shaders: &mut PerStage<Option<LinkedShader>>,
    blocks: &[UniformBlock],
    block_stage_index: &PerStage<Vec<i32>>,
) -> Vec<UniformStorage> {
    let mut storage: Vec<UniformStorage> = Vec::new();
    let mut by_name: BTreeMap<String, usize> = BTreeMap::new();
    let mut next_offset = 0;

    for (stage, shader) in shaders.iter_mut() {
        let Some(shader) = shader else { continue };
        let mut num_samplers = 0;
        let mut num_components = 0;
        let ir = &shader.ir;
        for var in ir.globals_with_mode(VariableMode::Uniform) {
            let variable = &ir.vars[var];
            if variable.interface_type.is_some() {
                continue;
            }
            let binding = if variable.explicit_binding {
                variable.binding
            } else {
                -1
            };
            let mut flat = Vec::new();
            leaves(&variable.name, &variable.ty, &mut flat);
            for (name, ty) in flat {
                let index = *by_name.entry(name.clone()).or_insert_with(|| {
                    let entry =
                        UniformStorage::new(name.clone(), ty.clone(), -1, next_offset, binding);
                    next_offset += ty.component_slots();
                    storage.push(entry);
                    storage.len() - 1
                });
                let entry = &mut storage[index];
                entry.active[stage] = true;
                if ty.contains_sampler() {
                    entry.sampler_index[stage] = Some(num_samplers);
                    num_samplers += ty.sampler_count();
                }
                num_components += ty.component_slots();
                trace!("{} uniform '{}' is storage entry {}", stage, name, index);
            }
        }

        let block_components: u32 = shader.uniform_blocks.iter().map(|b| b.data_size / 4).sum();
        shader.num_samplers = num_samplers;
        shader.num_uniform_components = num_components;
        shader.num_combined_uniform_components = num_components + block_components;
    }

    for (b, block) in blocks.iter().enumerate() {
        for member in &block.members {
            let mut entry = UniformStorage::new(
                member.name.clone(),
                member.ty.clone(),
                b as i32,
                member.offset,
                block.binding,
            );
            for stage in ShaderStage::ALL {
                entry.active[stage] = block_stage_index[stage].get(b).is_some_and(|i| *i >= 0);
            }
            storage.push(entry);
        }
    }
    debug!("{} active uniform(s)", storage.len());
    storage
}
