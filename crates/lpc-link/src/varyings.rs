//! Matching outputs of one stage to inputs of the next.
//!
//! Producer outputs and consumer inputs pair up by name: a plain variable
//! by its own name, a member of an unnamed block as `Block.member`, and a
//! block instance as `Block`. Matched pairs share a slot starting at
//! [`VARYING_SLOT_VAR0`]; built-in varyings keep their fixed slots.

use alloc::{format, string::String, vec::Vec};

use log::trace;
use lpc_glir::{Interpolation, ShaderIr, Type, Var, Variable, VariableMode};

use crate::{
    config::Limits,
    error::{LinkError, LinkResult},
    locations::{builtin_varying_slot, VARYING_SLOT_VAR0},
    program::BufferMode,
    shader::LinkedShader,
    stage::ShaderStage,
    transform_feedback::TfeedbackDecl,
};

fn interpolation_string(interpolation: Interpolation) -> &'static str {
    match interpolation {
        Interpolation::Smooth => "smooth",
        Interpolation::Flat => "flat",
        Interpolation::NoPerspective => "noperspective",
    }
}

fn has_or_lacks(value: bool) -> &'static str {
    if value {
        "has"
    } else {
        "lacks"
    }
}

/// The name an input or output is matched by.
pub fn varying_key(variable: &Variable) -> String {
    match &variable.interface_type {
        Some(ifc) if variable.is_interface_instance() => ifc.name.clone(),
        Some(ifc) => format!("{}.{}", ifc.name, variable.name),
        None => variable.name.clone(),
    }
}

/// The type a geometry shader sees per vertex.
fn per_vertex_type(consumer: ShaderStage, ty: &Type) -> &Type {
    match (consumer, ty) {
        (ShaderStage::Geometry, Type::Array { element, .. }) => element,
        _ => ty,
    }
}

/// Check that each consumer input agrees with the producer output of the
/// same name in type and qualifiers.
pub fn cross_validate_outputs_to_inputs(
    producer: &LinkedShader,
    consumer: &LinkedShader,
) -> LinkResult<()> {
    let outputs: Vec<Var> = producer.ir.globals_with_mode(VariableMode::ShaderOut);
    for input in consumer.ir.globals_with_mode(VariableMode::ShaderIn) {
        let input = &consumer.ir.vars[input];
        if input.interface_type.is_some() {
            continue;
        }
        let Some(output) = outputs
            .iter()
            .map(|v| &producer.ir.vars[*v])
            .find(|v| v.interface_type.is_none() && v.name == input.name)
        else {
            continue;
        };

        let input_type = per_vertex_type(consumer.stage, &input.ty);
        // Built-in arrays such as gl_TexCoord may be sized differently per
        // stage; array sizing reconciles them later.
        if *input_type != output.ty && !(output.ty.is_array() && output.is_builtin()) {
            return Err(LinkError::VaryingTypeMismatch {
                producer: producer.stage,
                name: output.name.clone(),
                output_type: output.ty.name(),
                consumer: consumer.stage,
                input_type: input.ty.name(),
            });
        }

        if input.centroid != output.centroid {
            return Err(LinkError::VaryingQualifierMismatch {
                producer: producer.stage,
                name: output.name.clone(),
                qualifier: "centroid",
                output_has: has_or_lacks(output.centroid),
                consumer: consumer.stage,
                input_has: has_or_lacks(input.centroid),
            });
        }
        if input.invariant != output.invariant {
            return Err(LinkError::VaryingQualifierMismatch {
                producer: producer.stage,
                name: output.name.clone(),
                qualifier: "invariant",
                output_has: has_or_lacks(output.invariant),
                consumer: consumer.stage,
                input_has: has_or_lacks(input.invariant),
            });
        }
        if input.interpolation != output.interpolation {
            return Err(LinkError::VaryingInterpolationMismatch {
                producer: producer.stage,
                name: output.name.clone(),
                output: interpolation_string(output.interpolation),
                consumer: consumer.stage,
                input: interpolation_string(input.interpolation),
            });
        }
    }
    Ok(())
}

fn assign_builtin_slots(ir: &mut ShaderIr, mode: VariableMode) {
    for var in ir.globals_with_mode(mode) {
        let variable = &mut ir.vars[var];
        if variable.is_builtin() && variable.location < 0 {
            if let Some(slot) = builtin_varying_slot(&variable.name) {
                variable.location = slot;
            }
        }
    }
}

fn tfeedback_wants(decls: &[TfeedbackDecl], name: &str) -> bool {
    decls.iter().any(|d| d.var_name == name)
}

/// Assign varying slots to the outputs of `producer` and the inputs of
/// `consumer`, and bind transform feedback declarations to outputs.
///
/// Matched variables, and outputs captured by transform feedback, are
/// marked matched; everything else is left for demotion. An input with no
/// output is an error before GLSL 1.30 and otherwise stops being an input.
pub fn assign_varying_locations(
    version: u32,
    limits: &Limits,
    producer: &mut LinkedShader,
    mut consumer: Option<&mut LinkedShader>,
    tfeedback: &mut [TfeedbackDecl],
    buffer_mode: BufferMode,
) -> LinkResult<()> {
    assign_builtin_slots(&mut producer.ir, VariableMode::ShaderOut);
    if let Some(consumer) = consumer.as_deref_mut() {
        assign_builtin_slots(&mut consumer.ir, VariableMode::ShaderIn);
    }

    let mut next_slot = VARYING_SLOT_VAR0;
    for output in producer.ir.globals_with_mode(VariableMode::ShaderOut) {
        if producer.ir.vars[output].is_builtin() {
            continue;
        }
        let key = varying_key(&producer.ir.vars[output]);
        let input = consumer.as_deref().and_then(|c| {
            c.ir.globals_with_mode(VariableMode::ShaderIn)
                .into_iter()
                .find(|v| {
                    let input = &c.ir.vars[*v];
                    !input.is_builtin()
                        && input.is_unmatched_generic_inout
                        && varying_key(input) == key
                })
        });

        let captured = tfeedback_wants(tfeedback, &producer.ir.vars[output].name);
        if input.is_none() && !captured {
            continue;
        }

        let variable = &mut producer.ir.vars[output];
        let slot = next_slot;
        next_slot += variable.ty.count_attribute_slots() as i32;
        variable.location = slot;
        variable.is_unmatched_generic_inout = false;
        trace!("varying '{}' at slot {}", key, slot);

        if let (Some(input), Some(consumer)) = (input, consumer.as_deref_mut()) {
            let input = &mut consumer.ir.vars[input];
            input.location = slot;
            input.is_unmatched_generic_inout = false;
        }
    }

    for decl in tfeedback.iter_mut() {
        let Some(var) = producer.ir.global_var(&decl.var_name) else {
            return Err(LinkError::TransformFeedbackUndeclared {
                name: decl.orig_name.clone(),
            });
        };
        let variable = &producer.ir.vars[var];
        if variable.mode != VariableMode::ShaderOut {
            return Err(LinkError::TransformFeedbackUndeclared {
                name: decl.orig_name.clone(),
            });
        }
        decl.assign_location(variable, buffer_mode, limits)?;
    }

    if let Some(consumer) = consumer {
        for input in consumer.ir.globals_with_mode(VariableMode::ShaderIn) {
            let variable = &mut consumer.ir.vars[input];
            if variable.is_builtin() || !variable.is_unmatched_generic_inout {
                continue;
            }
            if version <= 120 {
                return Err(LinkError::VaryingNotWritten {
                    consumer: consumer.stage,
                    name: variable.name.clone(),
                    producer: producer.stage,
                });
            }
            variable.mode = VariableMode::Auto;
        }
    }
    Ok(())
}

/// Unmatched inputs or outputs become ordinary globals.
pub fn demote_shader_inputs_and_outputs(ir: &mut ShaderIr, mode: VariableMode) {
    for var in ir.globals_with_mode(mode) {
        let variable = &mut ir.vars[var];
        if variable.is_unmatched_generic_inout {
            trace!("demoting '{}'", variable.name);
            variable.mode = VariableMode::Auto;
        }
    }
}

fn varying_vectors(ir: &ShaderIr, mode: VariableMode) -> u32 {
    ir.globals_with_mode(mode)
        .into_iter()
        .map(|v| &ir.vars[v])
        .filter(|v| !v.is_builtin())
        .map(|v| v.ty.count_attribute_slots())
        .sum()
}

/// The producer's user outputs must fit its output vector limit.
pub fn check_against_output_limit(limits: &Limits, producer: &LinkedShader) -> LinkResult<()> {
    let count = varying_vectors(&producer.ir, VariableMode::ShaderOut);
    let max = limits.stages[producer.stage].max_output_vectors();
    if count > max {
        return Err(LinkError::TooManyOutputVectors {
            stage: producer.stage,
            count,
            max,
        });
    }
    Ok(())
}

/// The consumer's user inputs must fit its input vector limit.
pub fn check_against_input_limit(limits: &Limits, consumer: &LinkedShader) -> LinkResult<()> {
    let count = varying_vectors(&consumer.ir, VariableMode::ShaderIn);
    let max = limits.stages[consumer.stage].max_input_vectors();
    if count > max {
        return Err(LinkError::TooManyInputVectors {
            stage: consumer.stage,
            count,
            max,
        });
    }
    Ok(())
}
