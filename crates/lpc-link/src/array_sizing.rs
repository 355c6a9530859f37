//! Implicit array sizes.
//!
//! After intrastage linking every array still declared without a size is
//! sized from the highest constant index used to access it, including
//! unsized members of interface blocks. Members of an unnamed block are
//! separate variables; once they are sized the block type is rebuilt from
//! their types and shared by all of them again.

use alloc::vec::Vec;

use hashbrown::HashMap;
use log::debug;
use lpc_glir::{InterfaceType, ShaderIr, Type, Var};

fn size_interface(ifc: &InterfaceType, max_access: &[u32]) -> InterfaceType {
    let mut sized = ifc.clone();
    for (i, field) in sized.fields.iter_mut().enumerate() {
        if field.ty.is_unsized_array() {
            let length = max_access.get(i).copied().unwrap_or(0) + 1;
            if let Some(ty) = field.ty.with_length(length) {
                field.ty = ty;
            }
        }
    }
    sized
}

/// Size all unsized arrays of `ir` and refresh dereference types.
pub fn size_implicit_arrays(ir: &mut ShaderIr) {
    let globals: Vec<Var> = ir.global_vars().collect();
    let mut unnamed: HashMap<InterfaceType, Vec<Var>> = HashMap::new();

    for var in &globals {
        let variable = &mut ir.vars[*var];
        if variable.ty.is_unsized_array() && !variable.is_interface_instance() {
            let length = variable.max_array_access + 1;
            if let Some(ty) = variable.ty.with_length(length) {
                debug!("array '{}' implicitly sized to {}", variable.name, length);
                variable.ty = ty;
            }
        }

        let Some(ifc) = variable.interface_type.clone() else {
            continue;
        };
        if variable.is_interface_instance() {
            if !ifc.contains_unsized_arrays() {
                continue;
            }
            let sized = size_interface(&ifc, &variable.max_ifc_array_access);
            variable.ty = match &variable.ty {
                Type::Array { length, .. } => Type::array(Type::Interface(sized.clone()), *length),
                _ => Type::Interface(sized.clone()),
            };
            variable.change_interface_type(sized);
        } else {
            unnamed.entry(ifc).or_default().push(*var);
        }
    }

    for (ifc, members) in unnamed {
        let mut sized = ifc.clone();
        for var in &members {
            let variable = &ir.vars[*var];
            if let Some(field) = sized.fields.iter_mut().find(|f| f.name == variable.name) {
                field.ty = variable.ty.clone();
            }
        }
        if sized == ifc {
            continue;
        }
        for var in members {
            ir.vars[var].change_interface_type(sized.clone());
        }
    }

    ir.refresh_deref_types();
}
