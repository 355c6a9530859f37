//! Location slots of vertex attributes, fragment outputs and varyings.

use alloc::{collections::BTreeMap, string::String, vec::Vec};

use log::trace;
use lpc_glir::{find_dereference, ShaderIr, Var, VariableMode};

use crate::{
    error::{LinkError, LinkResult},
    stage::ShaderStage,
};

/// Location of generic vertex attribute 0.
pub const VERT_ATTRIB_GENERIC0: i32 = 16;
/// Location of fragment color output 0.
pub const FRAG_RESULT_DATA0: i32 = 4;
/// Location of the first user varying slot.
pub const VARYING_SLOT_VAR0: i32 = 32;

/// Fixed varying slot of a built-in varying.
pub fn builtin_varying_slot(name: &str) -> Option<i32> {
    let slot = match name {
        "gl_Position" => 0,
        "gl_FrontColor" | "gl_Color" => 1,
        "gl_FrontSecondaryColor" | "gl_SecondaryColor" => 2,
        "gl_FogFragCoord" => 3,
        "gl_TexCoord" => 4,
        "gl_PointSize" => 12,
        "gl_BackColor" => 13,
        "gl_BackSecondaryColor" => 14,
        "gl_ClipVertex" => 15,
        "gl_ClipDistance" => 16,
        "gl_PrimitiveID" => 18,
        "gl_Layer" => 19,
        "gl_FragCoord" => 20,
        "gl_FrontFacing" => 21,
        "gl_PointCoord" => 23,
        _ => return None,
    };
    Some(slot)
}

fn low_mask(count: u32) -> u32 {
    if count >= 32 {
        u32::MAX
    } else {
        (1 << count) - 1
    }
}

/// Find `count` consecutive clear bits in `used`.
///
/// Returns the lowest starting bit, or `None` when there is no such run
/// (or `count` is 0 or more than 32).
pub fn find_available_slots(used: u32, count: u32) -> Option<u32> {
    if count == 0 || count > 32 {
        return None;
    }
    let mut needed = low_mask(count);
    for start in 0..=(32 - count) {
        if needed & !used == needed {
            return Some(start);
        }
        needed <<= 1;
    }
    None
}

/// Forget the locations assigned by a previous link.
///
/// Inputs and outputs without an explicit location lose their location
/// and are marked unmatched; explicit ones (and built-ins) are matched.
pub fn link_invalidate_variable_locations(ir: &mut ShaderIr) {
    let globals: Vec<Var> = ir.global_vars().collect();
    for var in globals {
        let variable = &mut ir.vars[var];
        if !matches!(variable.mode, VariableMode::ShaderIn | VariableMode::ShaderOut) {
            continue;
        }
        let explicit = variable.explicit_location || variable.is_builtin();
        if !explicit {
            variable.location = -1;
        }
        variable.is_unmatched_generic_inout = !explicit;
    }
}

/// Name bindings applied to variables without an explicit location.
#[derive(Debug, Clone, Copy)]
pub struct LocationBindings<'a> {
    /// Generic index per name
    pub locations: &'a BTreeMap<String, u32>,
    /// Dual-source blend index per name (fragment outputs)
    pub indices: Option<&'a BTreeMap<String, u32>>,
}

/// Assign locations to vertex shader inputs or fragment shader outputs.
///
/// Explicit locations are validated and reserved first, then application
/// bindings. Remaining variables are placed largest first into the lowest
/// free run of `max_index` generic slots.
pub fn assign_attribute_or_color_locations(
    ir: &mut ShaderIr,
    stage: ShaderStage,
    max_index: u32,
    bindings: LocationBindings<'_>,
) -> LinkResult<()> {
    let (base, mode, target) = match stage {
        ShaderStage::Vertex => (VERT_ATTRIB_GENERIC0, VariableMode::ShaderIn, "vertex shader input"),
        _ => (FRAG_RESULT_DATA0, VariableMode::ShaderOut, "fragment shader output"),
    };
    let mut used = !low_mask(max_index);
    let mut to_assign: Vec<(u32, Var)> = Vec::new();

    for var in ir.globals_with_mode(mode) {
        let variable = &mut ir.vars[var];
        if variable.is_builtin() {
            continue;
        }

        if variable.explicit_location {
            let location = variable.location;
            if location < base || location >= max_index as i32 + base {
                return Err(LinkError::InvalidExplicitLocation {
                    location: if location < 0 { location } else { location - base },
                    name: variable.name.clone(),
                });
            }
        } else if let Some(&bound) = bindings.locations.get(&variable.name) {
            if bound >= max_index {
                return Err(LinkError::InvalidExplicitLocation {
                    location: i32::try_from(bound).unwrap_or(i32::MAX),
                    name: variable.name.clone(),
                });
            }
            variable.location = base + bound as i32;
            variable.is_unmatched_generic_inout = false;
            if let Some(&index) = bindings.indices.and_then(|i| i.get(&variable.name)) {
                variable.index = index;
            }
        }

        let slots = variable.ty.count_attribute_slots();
        if variable.location != -1 {
            if variable.location >= base && variable.index < 1 {
                let attr = (variable.location - base) as u32;
                let use_mask = low_mask(slots);
                let shifted = use_mask.checked_shl(attr).unwrap_or(0);
                if (!shifted & used) != used {
                    return Err(LinkError::ExplicitLocationOverlap {
                        target,
                        name: variable.name.clone(),
                        used: used as i32,
                        use_mask: use_mask as i32,
                        attr: attr as i32,
                    });
                }
                used |= shifted;
            }
            continue;
        }
        to_assign.push((slots, var));
    }

    // Stable: equal sizes keep declaration order.
    to_assign.sort_by(|a, b| b.0.cmp(&a.0));

    if stage == ShaderStage::Vertex && find_dereference(ir, "gl_Vertex") {
        used |= 1;
    }

    for (slots, var) in to_assign {
        let variable = &mut ir.vars[var];
        let Some(location) = find_available_slots(used, slots) else {
            return Err(LinkError::InsufficientLocations {
                target,
                name: variable.name.clone(),
            });
        };
        trace!("{} '{}' at location {}", target, variable.name, location);
        variable.location = base + location as i32;
        variable.is_unmatched_generic_inout = false;
        used |= low_mask(slots) << location;
    }
    Ok(())
}
