//! Geometry stage layout qualifiers and input array sizing.

use alloc::vec::Vec;

use log::debug;
use lpc_glir::{ShaderIr, Var, VariableMode};

use crate::{
    diagnostics::Diagnostics,
    error::{LinkError, LinkResult},
    shader::Shader,
};

/// Primitive topology of a geometry shader input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Points,
    Lines,
    LinesAdjacency,
    LineStrip,
    Triangles,
    TrianglesAdjacency,
    TriangleStrip,
}

impl PrimitiveType {
    /// Vertices making up one primitive.
    pub fn vertices(self) -> u32 {
        match self {
            PrimitiveType::Points => 1,
            PrimitiveType::Lines | PrimitiveType::LineStrip => 2,
            PrimitiveType::Triangles | PrimitiveType::TriangleStrip => 3,
            PrimitiveType::LinesAdjacency => 4,
            PrimitiveType::TrianglesAdjacency => 6,
        }
    }
}

/// `layout(...) in;` / `layout(..., max_vertices = N) out;` of a geometry
/// shader. Unset qualifiers are `None` / 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryLayout {
    pub input_type: Option<PrimitiveType>,
    pub output_type: Option<PrimitiveType>,
    pub vertices_out: u32,
}

impl GeometryLayout {
    /// Layout with the given input and output topology and vertex count.
    pub fn new(input_type: PrimitiveType, output_type: PrimitiveType, vertices_out: u32) -> Self {
        Self {
            input_type: Some(input_type),
            output_type: Some(output_type),
            vertices_out,
        }
    }

    /// Vertices per input primitive, 0 when no input type is known.
    pub fn vertices_in(&self) -> u32 {
        self.input_type.map_or(0, PrimitiveType::vertices)
    }
}

/// Fold the layout qualifiers of every geometry unit into one layout.
///
/// Units may leave a qualifier unset, but those that set one must agree,
/// and the program as a whole must declare all three. Before GLSL 1.50
/// there are no such qualifiers and an empty layout is returned.
pub fn link_gs_inout_layout_qualifiers(
    version: u32,
    units: &[&Shader],
) -> LinkResult<GeometryLayout> {
    let mut linked = GeometryLayout::default();
    if version < 150 {
        return Ok(linked);
    }

    for unit in units {
        let layout = &unit.geometry;
        if let Some(input) = layout.input_type {
            if linked.input_type.is_some_and(|t| t != input) {
                return Err(LinkError::GeometryConflictingInputType);
            }
            linked.input_type = Some(input);
        }
        if let Some(output) = layout.output_type {
            if linked.output_type.is_some_and(|t| t != output) {
                return Err(LinkError::GeometryConflictingOutputType);
            }
            linked.output_type = Some(output);
        }
        if layout.vertices_out != 0 {
            if linked.vertices_out != 0 && linked.vertices_out != layout.vertices_out {
                return Err(LinkError::GeometryConflictingVertexCount {
                    first: linked.vertices_out,
                    second: layout.vertices_out,
                });
            }
            linked.vertices_out = layout.vertices_out;
        }
    }

    if linked.input_type.is_none() {
        return Err(LinkError::GeometryMissingInputType);
    }
    if linked.output_type.is_none() {
        return Err(LinkError::GeometryMissingOutputType);
    }
    if linked.vertices_out == 0 {
        return Err(LinkError::GeometryMissingMaxVertices);
    }
    Ok(linked)
}

/// Size every input array of a linked geometry shader to `vertices`.
///
/// The new lengths are computed for all inputs first and applied
/// afterwards, then dereference types are refreshed. Inputs declared with
/// another size, or accessed past `vertices`, are reported and left alone.
/// Returns whether all inputs were sized.
pub fn resize_geometry_inputs(ir: &mut ShaderIr, vertices: u32, diag: &mut Diagnostics) -> bool {
    if vertices == 0 {
        return true;
    }
    let mut ok = true;
    let mut resized: Vec<Var> = Vec::new();

    for var in ir.globals_with_mode(VariableMode::ShaderIn) {
        let variable = &ir.vars[var];
        let Some(size) = variable.ty.array_length() else {
            continue;
        };
        if size != 0 && size != vertices {
            diag.error(LinkError::GeometryInputArraySize {
                name: variable.name.clone(),
                declared: size,
                vertices,
            });
            ok = false;
            continue;
        }
        if variable.max_array_access >= vertices {
            diag.error(LinkError::GeometryInputAccess {
                index: variable.max_array_access,
                name: variable.name.clone(),
                vertices,
            });
            ok = false;
            continue;
        }
        resized.push(var);
    }

    for var in resized {
        let variable = &mut ir.vars[var];
        if let Some(ty) = variable.ty.with_length(vertices) {
            debug!("geometry input '{}' sized to {}", variable.name, vertices);
            variable.ty = ty;
            variable.max_array_access = vertices - 1;
        }
    }
    ir.refresh_deref_types();
    ok
}
