//! Per-stage checks on linked executables.

use log::debug;
use lpc_glir::{find_assignment, find_end_primitive};

use crate::{
    error::{LinkError, LinkResult},
    shader::LinkedShader,
    stage::ShaderStage,
};

/// How a vertex or geometry shader uses user clipping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipUsage {
    /// `gl_ClipDistance` is written
    pub uses_clip_distance: bool,
    /// Declared size of `gl_ClipDistance`
    pub clip_distance_array_size: u32,
}

/// Determine clip distance usage; writing both `gl_ClipVertex` and
/// `gl_ClipDistance` is an error from desktop GLSL 1.30 on.
pub fn analyze_clip_usage(
    version: u32,
    is_es: bool,
    shader: &LinkedShader,
) -> LinkResult<ClipUsage> {
    let mut usage = ClipUsage::default();
    if is_es || version < 130 {
        return Ok(usage);
    }
    let ir = &shader.ir;
    let clip_vertex = find_assignment(ir, "gl_ClipVertex");
    let clip_distance = find_assignment(ir, "gl_ClipDistance");
    if clip_vertex && clip_distance {
        return Err(LinkError::ClipVertexAndClipDistance {
            stage: shader.stage,
        });
    }
    usage.uses_clip_distance = clip_distance;
    if clip_distance {
        usage.clip_distance_array_size = shader
            .symbols
            .get_variable("gl_ClipDistance")
            .and_then(|var| ir.vars[var].ty.array_length())
            .unwrap_or(0);
    }
    Ok(usage)
}

/// A vertex shader must write `gl_Position` before GLSL 1.40 (ES 3.00).
pub fn validate_vertex_shader_executable(
    version: u32,
    is_es: bool,
    shader: &LinkedShader,
) -> LinkResult<ClipUsage> {
    let required = if is_es { version < 300 } else { version < 140 };
    if required && !find_assignment(&shader.ir, "gl_Position") {
        return Err(LinkError::MissingPositionWrite);
    }
    analyze_clip_usage(version, is_es, shader)
}

/// A fragment shader may write `gl_FragColor` or `gl_FragData`, not both.
pub fn validate_fragment_shader_executable(shader: &LinkedShader) -> LinkResult<()> {
    let ir = &shader.ir;
    if find_assignment(ir, "gl_FragColor") && find_assignment(ir, "gl_FragData") {
        return Err(LinkError::FragColorAndFragData);
    }
    Ok(())
}

/// Derived geometry stage usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryUsage {
    pub vertices_in: u32,
    pub clip: ClipUsage,
    pub uses_end_primitive: bool,
}

pub fn validate_geometry_shader_executable(
    version: u32,
    is_es: bool,
    shader: &LinkedShader,
) -> LinkResult<GeometryUsage> {
    debug_assert_eq!(shader.stage, ShaderStage::Geometry);
    let vertices_in = shader.geometry.vertices_in();
    let clip = analyze_clip_usage(version, is_es, shader)?;
    let uses_end_primitive = find_end_primitive(&shader.ir);
    debug!(
        "geometry shader: {} input vertices, EndPrimitive {}",
        vertices_in, uses_end_primitive
    );
    Ok(GeometryUsage {
        vertices_in,
        clip,
        uses_end_primitive,
    })
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use lpc_glir::{ShaderBuilder, ShaderIr, Type, Variable, VariableMode};

    use super::*;

    fn writes(names: &[(&str, Type)]) -> ShaderIr {
        let mut b = ShaderBuilder::new();
        let mut body = vec::Vec::new();
        for (name, ty) in names {
            let var = b.global(Variable::new(*name, ty.clone(), VariableMode::ShaderOut));
            let zero = b.float(0.0);
            let target = b.var_ref(var);
            let target = if ty.is_array() {
                b.index_const(target, 0)
            } else {
                target
            };
            body.push(b.assign(target, zero));
        }
        b.define_function("main", Type::Void, vec![], body);
        b.finish()
    }

    fn linked(stage: ShaderStage, ir: ShaderIr) -> LinkedShader {
        LinkedShader::new(stage, ir)
    }

    #[test]
    fn test_position_required_before_140() {
        let vs = linked(ShaderStage::Vertex, writes(&[]));
        assert_eq!(
            validate_vertex_shader_executable(110, false, &vs),
            Err(LinkError::MissingPositionWrite)
        );
        assert!(validate_vertex_shader_executable(140, false, &vs).is_ok());
        assert!(validate_vertex_shader_executable(100, true, &vs).is_err());
        assert!(validate_vertex_shader_executable(300, true, &vs).is_ok());
    }

    #[test]
    fn test_clip_usage() {
        let vs = linked(
            ShaderStage::Vertex,
            writes(&[
                ("gl_Position", Type::vec(4)),
                ("gl_ClipDistance", Type::array(Type::FLOAT, 6)),
            ]),
        );
        let usage = validate_vertex_shader_executable(130, false, &vs).expect("valid");
        assert!(usage.uses_clip_distance);
        assert_eq!(usage.clip_distance_array_size, 6);

        let both = linked(
            ShaderStage::Vertex,
            writes(&[
                ("gl_ClipVertex", Type::vec(4)),
                ("gl_ClipDistance", Type::array(Type::FLOAT, 2)),
            ]),
        );
        assert_eq!(
            validate_vertex_shader_executable(150, false, &both),
            Err(LinkError::ClipVertexAndClipDistance {
                stage: ShaderStage::Vertex
            })
        );
        assert!(analyze_clip_usage(120, false, &both).is_ok());
    }

    #[test]
    fn test_frag_color_and_data() {
        let fs = linked(
            ShaderStage::Fragment,
            writes(&[
                ("gl_FragColor", Type::vec(4)),
                ("gl_FragData", Type::array(Type::vec(4), 8)),
            ]),
        );
        assert_eq!(
            validate_fragment_shader_executable(&fs),
            Err(LinkError::FragColorAndFragData)
        );
    }
}
