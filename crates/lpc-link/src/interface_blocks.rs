//! Interface block definitions shared between shaders.

use alloc::{collections::BTreeMap, string::String};

use hashbrown::HashMap;
use lpc_glir::{InterfaceType, ShaderIr, Type, VariableMode};

use crate::{
    error::{LinkError, LinkResult},
    shader::{LinkedShader, Shader},
};

fn member_types_match(a: &Type, b: &Type) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (
            Type::Array {
                element: ea,
                length: la,
            },
            Type::Array {
                element: eb,
                length: lb,
            },
        ) => ea == eb && (*la == 0 || *lb == 0),
        _ => false,
    }
}

/// Two block definitions agree; an unsized array member matches a sized
/// array of the same element type.
pub fn interface_types_match(a: &InterfaceType, b: &InterfaceType) -> bool {
    a.name == b.name
        && a.packing == b.packing
        && a.fields.len() == b.fields.len()
        && a.fields
            .iter()
            .zip(&b.fields)
            .all(|(fa, fb)| fa.name == fb.name && member_types_match(&fa.ty, &fb.ty))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum BlockKind {
    Uniform,
    Varying,
}

fn block_kind(mode: VariableMode) -> Option<BlockKind> {
    match mode {
        VariableMode::Uniform => Some(BlockKind::Uniform),
        VariableMode::ShaderIn | VariableMode::ShaderOut => Some(BlockKind::Varying),
        _ => None,
    }
}

fn collect_definitions<'a>(
    ir: &'a ShaderIr,
    definitions: &mut HashMap<(String, VariableMode), &'a InterfaceType>,
) -> LinkResult<()> {
    for var in ir.global_vars() {
        let variable = &ir.vars[var];
        let Some(ifc) = &variable.interface_type else {
            continue;
        };
        let key = (ifc.name.clone(), variable.mode);
        match definitions.get(&key) {
            Some(existing) if !interface_types_match(existing, ifc) => {
                return Err(LinkError::InterfaceBlockMismatch {
                    name: ifc.name.clone(),
                });
            }
            Some(_) => {}
            None => {
                definitions.insert(key, ifc);
            }
        }
    }
    Ok(())
}

/// All units of a stage declaring a block must declare it identically.
pub fn validate_intrastage_interface_blocks(units: &[&Shader]) -> LinkResult<()> {
    let mut definitions = HashMap::new();
    for unit in units {
        collect_definitions(&unit.ir, &mut definitions)?;
    }
    Ok(())
}

/// A block written by `producer` and read by `consumer`, or a uniform block
/// used by both, must have the same definition in both stages.
pub fn validate_interstage_interface_blocks(
    producer: &LinkedShader,
    consumer: &LinkedShader,
) -> LinkResult<()> {
    let mut consumer_defs: BTreeMap<(String, BlockKind), &InterfaceType> = BTreeMap::new();
    for var in consumer.ir.global_vars() {
        let variable = &consumer.ir.vars[var];
        if variable.mode == VariableMode::ShaderOut {
            continue;
        }
        if let (Some(ifc), Some(kind)) = (&variable.interface_type, block_kind(variable.mode)) {
            consumer_defs.entry((ifc.name.clone(), kind)).or_insert(ifc);
        }
    }

    for var in producer.ir.global_vars() {
        let variable = &producer.ir.vars[var];
        if variable.mode == VariableMode::ShaderIn {
            continue;
        }
        let (Some(ifc), Some(kind)) = (&variable.interface_type, block_kind(variable.mode)) else {
            continue;
        };
        if let Some(other) = consumer_defs.get(&(ifc.name.clone(), kind)) {
            if !interface_types_match(ifc, other) {
                return Err(LinkError::InterfaceBlockMismatch {
                    name: ifc.name.clone(),
                });
            }
        }
    }
    Ok(())
}
