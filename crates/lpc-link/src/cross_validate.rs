//! Consistency of global declarations shared between shaders.
//!
//! Every unit of a stage (or, for uniforms, every linked stage) may declare
//! the same global. The declarations must agree; where one of them carries
//! more information (an array size, an explicit location, an initializer)
//! the merged declaration takes it. The inputs are never modified: the
//! merged declarations are collected into [`MergedGlobals`] and copied onto
//! the linked IR afterwards.

use alloc::{collections::BTreeMap, string::String, vec::Vec};

use log::trace;
use lpc_glir::{DepthLayout, ShaderIr, Type, Var, Variable, VariableMode};

use crate::error::{LinkError, LinkResult};

/// The merged declaration of every shared global, by name.
#[derive(Debug, Clone, Default)]
pub struct MergedGlobals {
    globals: BTreeMap<String, Variable>,
}

impl MergedGlobals {
    /// The merged declaration of `name`.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.globals.get(name)
    }

    pub fn len(&self) -> usize {
        self.globals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
    }

    /// Copy the merged attributes onto the same-named globals of `ir` that
    /// have the same mode.
    pub fn apply_to(&self, ir: &mut ShaderIr) {
        let globals: Vec<Var> = ir.global_vars().collect();
        for var in globals {
            let variable = &mut ir.vars[var];
            if variable.mode == VariableMode::Temporary {
                continue;
            }
            let Some(merged) = self.globals.get(&variable.name) else {
                continue;
            };
            if merged.mode != variable.mode {
                continue;
            }
            variable.ty = merged.ty.clone();
            variable.location = merged.location;
            variable.explicit_location = merged.explicit_location;
            variable.binding = merged.binding;
            variable.explicit_binding = merged.explicit_binding;
            variable.constant_initializer = merged.constant_initializer.clone();
            variable.has_initializer = merged.has_initializer;
            variable.max_array_access = merged.max_array_access;
        }
        ir.refresh_deref_types();
    }
}

/// Unify two declared types; an unsized array adopts the size of a sized
/// array of the same element type.
fn unify_types(existing: &Type, new: &Type) -> Option<Type> {
    if existing == new {
        return Some(existing.clone());
    }
    match (existing, new) {
        (
            Type::Array {
                element: a,
                length: la,
            },
            Type::Array {
                element: b,
                length: lb,
            },
        ) if a == b && (*la == 0 || *lb == 0) => Some(if *la == 0 { new.clone() } else { existing.clone() }),
        _ => None,
    }
}

fn merge_into(existing: &mut Variable, var: &Variable) -> LinkResult<()> {
    let mode = var.mode_string();

    let Some(ty) = unify_types(&existing.ty, &var.ty) else {
        return Err(LinkError::TypeMismatch {
            mode,
            name: var.name.clone(),
            new_type: var.ty.name(),
            existing_type: existing.ty.name(),
        });
    };
    existing.ty = ty;
    existing.max_array_access = existing.max_array_access.max(var.max_array_access);

    if var.explicit_location {
        if existing.explicit_location && existing.location != var.location {
            return Err(LinkError::LocationMismatch {
                mode,
                name: var.name.clone(),
            });
        }
        existing.location = var.location;
        existing.explicit_location = true;
    }

    if var.explicit_binding {
        if existing.explicit_binding && existing.binding != var.binding {
            return Err(LinkError::BindingMismatch {
                mode,
                name: var.name.clone(),
            });
        }
        existing.binding = var.binding;
        existing.explicit_binding = true;
    }

    if var.ty.contains_atomic() && existing.atomic_offset != var.atomic_offset {
        return Err(LinkError::AtomicOffsetMismatch {
            mode,
            name: var.name.clone(),
        });
    }

    if var.name == "gl_FragDepth" {
        let differs = var.depth_layout != existing.depth_layout;
        if var.depth_layout != DepthLayout::None && differs {
            return Err(LinkError::FragDepthQualifierMismatch);
        }
        if var.used && differs {
            return Err(LinkError::FragDepthLayoutMissing);
        }
    }

    if var.has_initializer
        && existing.has_initializer
        && (var.constant_initializer.is_none() || existing.constant_initializer.is_none())
    {
        return Err(LinkError::MultipleNonConstantInitializers {
            name: var.name.clone(),
        });
    }
    if let Some(value) = &var.constant_initializer {
        if let Some(current) = &existing.constant_initializer {
            if current != value {
                return Err(LinkError::InitializerMismatch {
                    mode,
                    name: var.name.clone(),
                });
            }
        }
    }
    if existing.constant_initializer.is_none() && var.constant_initializer.is_some() {
        existing.constant_initializer = var.constant_initializer.clone();
    }
    existing.has_initializer |= var.has_initializer;

    if existing.invariant != var.invariant {
        return Err(LinkError::InvariantMismatch {
            mode,
            name: var.name.clone(),
        });
    }
    if existing.centroid != var.centroid {
        return Err(LinkError::CentroidMismatch {
            mode,
            name: var.name.clone(),
        });
    }
    Ok(())
}

/// Check that all declarations of each global agree and merge them.
///
/// Compiler temporaries are never shared. With `uniforms_only` only
/// uniforms are considered (interstage validation).
pub fn cross_validate_globals<'a>(
    shaders: impl IntoIterator<Item = &'a ShaderIr>,
    uniforms_only: bool,
) -> LinkResult<MergedGlobals> {
    let mut merged = MergedGlobals::default();
    for ir in shaders {
        for var in ir.global_vars() {
            let variable = &ir.vars[var];
            if variable.mode == VariableMode::Temporary {
                continue;
            }
            if uniforms_only && variable.mode != VariableMode::Uniform {
                continue;
            }
            match merged.globals.get_mut(&variable.name) {
                Some(existing) => merge_into(existing, variable)?,
                None => {
                    trace!("global '{}' first declared", variable.name);
                    merged
                        .globals
                        .insert(variable.name.clone(), variable.clone());
                }
            }
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec};

    use lpc_glir::{Constant, SamplerDim};

    use super::*;

    fn shader(vars: Vec<Variable>) -> ShaderIr {
        let mut ir = ShaderIr::new();
        for v in vars {
            ir.add_global(v);
        }
        ir
    }

    fn validate(units: &[ShaderIr]) -> LinkResult<MergedGlobals> {
        cross_validate_globals(units.iter(), false)
    }

    #[test]
    fn test_type_mismatch() {
        let units = [
            shader(vec![Variable::new("u", Type::vec(4), VariableMode::Uniform)]),
            shader(vec![Variable::new("u", Type::FLOAT, VariableMode::Uniform)]),
        ];
        let err = validate(&units).unwrap_err();
        assert_eq!(
            err.to_string(),
            "uniform `u' declared as type `float' and type `vec4'"
        );
    }

    #[test]
    fn test_unsized_array_takes_size() {
        let mut a = Variable::new("a", Type::unsized_array(Type::FLOAT), VariableMode::Auto);
        a.max_array_access = 1;
        let mut b = Variable::new("a", Type::array(Type::FLOAT, 4), VariableMode::Auto);
        b.max_array_access = 3;
        let units = [shader(vec![a]), shader(vec![b])];
        let merged = validate(&units).expect("merge");
        let a = merged.get("a").expect("a");
        assert_eq!(a.ty, Type::array(Type::FLOAT, 4));
        assert_eq!(a.max_array_access, 3);
    }

    #[test]
    fn test_explicit_location_merge() {
        let units = [
            shader(vec![Variable::new("c", Type::vec(4), VariableMode::ShaderOut)]),
            shader(vec![
                Variable::new("c", Type::vec(4), VariableMode::ShaderOut).with_location(2)
            ]),
            shader(vec![
                Variable::new("c", Type::vec(4), VariableMode::ShaderOut).with_location(2)
            ]),
        ];
        let merged = validate(&units).expect("merge");
        assert_eq!(merged.get("c").map(|v| v.location), Some(2));

        let units = [
            shader(vec![
                Variable::new("c", Type::vec(4), VariableMode::ShaderOut).with_location(1)
            ]),
            shader(vec![
                Variable::new("c", Type::vec(4), VariableMode::ShaderOut).with_location(2)
            ]),
        ];
        assert_eq!(
            validate(&units).unwrap_err().to_string(),
            "explicit locations for shader output `c' have differing values"
        );
    }

    #[test]
    fn test_initializers() {
        let units = [
            shader(vec![
                Variable::new("k", Type::FLOAT, VariableMode::Auto)
                    .with_initializer(Constant::float(1.0))
            ]),
            shader(vec![Variable::new("k", Type::FLOAT, VariableMode::Auto)]),
        ];
        let merged = validate(&units).expect("merge");
        assert!(merged.get("k").is_some_and(|v| v.has_initializer));

        let units = [
            shader(vec![
                Variable::new("k", Type::FLOAT, VariableMode::Auto)
                    .with_initializer(Constant::float(1.0))
            ]),
            shader(vec![
                Variable::new("k", Type::FLOAT, VariableMode::Auto)
                    .with_initializer(Constant::float(2.0))
            ]),
        ];
        assert_eq!(
            validate(&units).unwrap_err().to_string(),
            "initializers for global variable `k' have differing values"
        );

        let units = [
            shader(vec![
                Variable::new("g", Type::FLOAT, VariableMode::Auto).with_non_constant_initializer()
            ]),
            shader(vec![
                Variable::new("g", Type::FLOAT, VariableMode::Auto).with_non_constant_initializer()
            ]),
        ];
        assert_eq!(
            validate(&units).unwrap_err().to_string(),
            "shared global variable `g' has multiple non-constant initializers."
        );
    }

    #[test]
    fn test_constant_and_non_constant_initializer() {
        let constant =
            Variable::new("g", Type::FLOAT, VariableMode::Auto).with_initializer(Constant::float(1.0));
        let computed =
            Variable::new("g", Type::FLOAT, VariableMode::Auto).with_non_constant_initializer();
        for units in [
            [shader(vec![constant.clone()]), shader(vec![computed.clone()])],
            [shader(vec![computed]), shader(vec![constant])],
        ] {
            assert_eq!(
                validate(&units).unwrap_err(),
                LinkError::MultipleNonConstantInitializers {
                    name: "g".to_string()
                }
            );
        }
    }

    #[test]
    fn test_explicit_bindings() {
        let sampler = || Variable::new("tex", Type::Sampler(SamplerDim::D2), VariableMode::Uniform);
        let units = [
            shader(vec![sampler()]),
            shader(vec![sampler().with_binding(3)]),
        ];
        let merged = validate(&units).expect("merge");
        let tex = merged.get("tex").expect("tex");
        assert!(tex.explicit_binding);
        assert_eq!(tex.binding, 3);

        let units = [
            shader(vec![sampler().with_binding(3)]),
            shader(vec![sampler().with_binding(4)]),
        ];
        assert_eq!(
            validate(&units).unwrap_err().to_string(),
            "explicit bindings for uniform `tex' have differing values"
        );
    }

    #[test]
    fn test_atomic_offsets() {
        let counter = |offset| {
            Variable::new("hits", Type::AtomicUint, VariableMode::Uniform)
                .with_binding(0)
                .with_atomic_offset(offset)
        };
        let units = [shader(vec![counter(4)]), shader(vec![counter(4)])];
        assert!(validate(&units).is_ok());

        let units = [shader(vec![counter(0)]), shader(vec![counter(4)])];
        assert_eq!(
            validate(&units).unwrap_err().to_string(),
            "offset specifications for uniform `hits' have differing values"
        );
    }

    #[test]
    fn test_invariant_and_centroid() {
        let out = || Variable::new("v", Type::vec(4), VariableMode::ShaderOut);
        let units = [shader(vec![out().invariant()]), shader(vec![out()])];
        assert_eq!(
            validate(&units).unwrap_err().to_string(),
            "declarations for shader output `v' have mismatching invariant qualifiers"
        );

        let units = [shader(vec![out()]), shader(vec![out().centroid()])];
        assert_eq!(
            validate(&units).unwrap_err().to_string(),
            "declarations for shader output `v' have mismatching centroid qualifiers"
        );
    }

    #[test]
    fn test_frag_depth_layouts() {
        let declared = Variable::new("gl_FragDepth", Type::FLOAT, VariableMode::ShaderOut)
            .with_depth_layout(DepthLayout::Greater);
        let plain_used =
            Variable::new("gl_FragDepth", Type::FLOAT, VariableMode::ShaderOut).mark_used();
        let units = [shader(vec![declared.clone()]), shader(vec![plain_used])];
        assert_eq!(
            validate(&units).unwrap_err(),
            LinkError::FragDepthLayoutMissing
        );

        let other = Variable::new("gl_FragDepth", Type::FLOAT, VariableMode::ShaderOut)
            .with_depth_layout(DepthLayout::Less);
        let units = [shader(vec![declared]), shader(vec![other])];
        assert_eq!(
            validate(&units).unwrap_err(),
            LinkError::FragDepthQualifierMismatch
        );
    }

    #[test]
    fn test_uniforms_only_and_temporaries() {
        let units = [
            shader(vec![
                Variable::new("t", Type::FLOAT, VariableMode::Temporary),
                Variable::new("o", Type::FLOAT, VariableMode::ShaderOut),
            ]),
            shader(vec![
                Variable::new("t", Type::INT, VariableMode::Temporary),
                Variable::new("o", Type::INT, VariableMode::ShaderOut),
            ]),
        ];
        let merged = cross_validate_globals(units.iter(), true).expect("merge");
        assert!(merged.is_empty());
        assert!(validate(&units).is_err());
    }

    #[test]
    fn test_apply_to() {
        let units = [
            shader(vec![Variable::new(
                "a",
                Type::unsized_array(Type::FLOAT),
                VariableMode::Auto,
            )]),
            shader(vec![Variable::new("a", Type::array(Type::FLOAT, 2), VariableMode::Auto)]),
        ];
        let merged = validate(&units).expect("merge");
        let mut ir = units[0].clone();
        merged.apply_to(&mut ir);
        let a = ir.global_var("a").expect("a");
        assert_eq!(ir.vars[a].ty, Type::array(Type::FLOAT, 2));
        assert_eq!(units[0].vars[a].ty, Type::unsized_array(Type::FLOAT));
    }

    #[test]
    fn test_apply_to_skips_other_modes() {
        let fragment = shader(vec![Variable::new("c", Type::FLOAT, VariableMode::Uniform)]);
        let merged = cross_validate_globals([&fragment], true).expect("merge");

        let mut vertex = shader(vec![
            Variable::new("c", Type::vec(4), VariableMode::ShaderOut).with_location(40)
        ]);
        merged.apply_to(&mut vertex);
        let c = vertex.global_var("c").expect("c");
        assert_eq!(vertex.vars[c].ty, Type::vec(4));
        assert_eq!(vertex.vars[c].location, 40);
        assert!(vertex.vars[c].explicit_location);
    }
}
