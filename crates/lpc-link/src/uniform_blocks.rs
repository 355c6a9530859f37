//! Uniform block tables.
//!
//! A stage's block table lists every uniform block declared by its units,
//! once per name. The program table merges the stage tables and records,
//! per stage, where each program block sits in the stage table.

use alloc::{format, string::String, vec, vec::Vec};

use log::trace;
use lpc_glir::{
    std140_offsets, InterfacePacking, InterfaceType, ShaderIr, Type, Variable, VariableMode,
};

use crate::{
    error::{LinkError, LinkResult},
    shader::{LinkedShader, Shader},
    stage::PerStage,
};

/// A member of a uniform block with its std140 byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlockMember {
    /// Program resource name (`Block.field` for named blocks)
    pub name: String,
    pub ty: Type,
    pub offset: u32,
}

/// One uniform block of a stage or of the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlock {
    /// Block name, with an element suffix for arrays of instances
    pub name: String,
    pub members: Vec<UniformBlockMember>,
    pub packing: InterfacePacking,
    /// Buffer size in bytes
    pub data_size: u32,
    /// Explicit binding, or -1
    pub binding: i32,
}

impl UniformBlock {
    fn from_interface(name: String, ifc: &InterfaceType, instance: bool, binding: i32) -> Self {
        let (offsets, data_size) = std140_offsets(&ifc.fields);
        let members = ifc
            .fields
            .iter()
            .zip(offsets)
            .map(|(field, offset)| UniformBlockMember {
                name: if instance {
                    format!("{}.{}", ifc.name, field.name)
                } else {
                    field.name.clone()
                },
                ty: field.ty.clone(),
                offset,
            })
            .collect();
        Self {
            name,
            members,
            packing: ifc.packing,
            data_size,
            binding,
        }
    }

    /// Two declarations describe the same block.
    pub fn matches(&self, other: &UniformBlock) -> bool {
        self.name == other.name
            && self.packing == other.packing
            && self.binding == other.binding
            && self.members.len() == other.members.len()
            && self
                .members
                .iter()
                .zip(&other.members)
                .all(|(a, b)| a.name == b.name && a.ty == b.ty)
    }
}

/// Add `block` to `blocks` unless a block of that name is already there.
///
/// Returns the index of the block in `blocks`, or `None` when a block of
/// the same name with a different definition exists.
pub fn link_cross_validate_uniform_block(
    blocks: &mut Vec<UniformBlock>,
    block: &UniformBlock,
) -> Option<usize> {
    match blocks.iter().position(|b| b.name == block.name) {
        Some(index) if blocks[index].matches(block) => Some(index),
        Some(_) => None,
        None => {
            blocks.push(block.clone());
            Some(blocks.len() - 1)
        }
    }
}

fn blocks_of_variable(variable: &Variable, ifc: &InterfaceType) -> Vec<UniformBlock> {
    let binding = if variable.explicit_binding {
        variable.binding
    } else {
        -1
    };
    match &variable.ty {
        Type::Array { element, length } if element.is_interface() => (0..*length)
            .map(|i| {
                let name = format!("{}[{}]", ifc.name, i);
                let binding = if binding >= 0 { binding + i as i32 } else { -1 };
                UniformBlock::from_interface(name, ifc, true, binding)
            })
            .collect(),
        Type::Interface(_) => vec![UniformBlock::from_interface(
            ifc.name.clone(),
            ifc,
            true,
            binding,
        )],
        _ => vec![UniformBlock::from_interface(
            ifc.name.clone(),
            ifc,
            false,
            binding,
        )],
    }
}

/// Build the uniform block table of one stage from its units.
pub fn link_uniform_blocks(units: &[&Shader]) -> LinkResult<Vec<UniformBlock>> {
    let mut blocks = Vec::new();
    for unit in units {
        let ir = &unit.ir;
        for var in ir.globals_with_mode(VariableMode::Uniform) {
            let variable = &ir.vars[var];
            let Some(ifc) = &variable.interface_type else {
                continue;
            };
            for block in blocks_of_variable(variable, ifc) {
                if link_cross_validate_uniform_block(&mut blocks, &block).is_none() {
                    return Err(LinkError::UniformBlockMismatch { name: block.name });
                }
            }
        }
    }
    Ok(blocks)
}

/// Recompute the layout of the blocks in `blocks` from the declarations in
/// `ir`, whose unsized array members have since been sized.
pub fn refresh_uniform_block_layouts(blocks: &mut [UniformBlock], ir: &ShaderIr) {
    for var in ir.globals_with_mode(VariableMode::Uniform) {
        let variable = &ir.vars[var];
        let Some(ifc) = &variable.interface_type else {
            continue;
        };
        for sized in blocks_of_variable(variable, ifc) {
            if let Some(block) = blocks.iter_mut().find(|b| b.name == sized.name) {
                if block.data_size != sized.data_size {
                    trace!("block '{}' resized to {} bytes", sized.name, sized.data_size);
                }
                *block = sized;
            }
        }
    }
}

/// Merge the stage block tables into the program table.
///
/// Returns the program blocks and, per stage, the stage block index of
/// every program block (-1 when the stage lacks it).
pub fn interstage_cross_validate_uniform_blocks(
    stages: &PerStage<Option<LinkedShader>>,
) -> LinkResult<(Vec<UniformBlock>, PerStage<Vec<i32>>)> {
    let max_blocks: usize = stages
        .iter()
        .filter_map(|(_, s)| s.as_ref())
        .map(|s| s.uniform_blocks.len())
        .sum();
    let mut blocks = Vec::new();
    let mut stage_index: PerStage<Vec<i32>> = PerStage::from_fn(|_| vec![-1; max_blocks]);

    for (stage, shader) in stages.iter() {
        let Some(shader) = shader else { continue };
        for (j, block) in shader.uniform_blocks.iter().enumerate() {
            let Some(index) = link_cross_validate_uniform_block(&mut blocks, block) else {
                return Err(LinkError::UniformBlockMismatch {
                    name: block.name.clone(),
                });
            };
            trace!("{} block '{}' is program block {}", stage, block.name, index);
            stage_index[stage][index] = j as i32;
        }
    }

    for indices in stage_index.iter_mut().map(|(_, v)| v) {
        indices.truncate(blocks.len());
    }
    Ok((blocks, stage_index))
}
