//! Compiled units and linked shaders.

use alloc::{sync::Arc, vec::Vec};

use lpc_glir::ShaderIr;

use crate::{
    geometry::GeometryLayout, stage::ShaderStage, symbols::SymbolTable,
    uniform_blocks::UniformBlock,
};

/// One independently compiled shader unit.
///
/// Units are read-only inputs to linking; the linker never modifies them,
/// so a unit may be shared by several programs.
#[derive(Debug, Clone)]
pub struct Shader {
    /// Pipeline stage
    pub stage: ShaderStage,
    /// `#version` of the source
    pub version: u32,
    /// GLSL ES source
    pub is_es: bool,
    /// IR produced by the front end
    pub ir: ShaderIr,
    /// Global declarations of `ir`
    pub symbols: SymbolTable,
    /// Geometry layout qualifiers declared by this unit
    pub geometry: GeometryLayout,
    /// Built-in function library units the unit calls into
    pub builtins_to_link: Vec<Arc<ShaderIr>>,
}

impl Shader {
    /// Create a desktop GLSL unit.
    pub fn new(stage: ShaderStage, version: u32, ir: ShaderIr) -> Self {
        let symbols = SymbolTable::from_ir(&ir);
        Self {
            stage,
            version,
            is_es: false,
            ir,
            symbols,
            geometry: GeometryLayout::default(),
            builtins_to_link: Vec::new(),
        }
    }

    /// Mark the unit as GLSL ES.
    pub fn es(mut self) -> Self {
        self.is_es = true;
        self
    }

    /// Set the geometry layout qualifiers.
    pub fn with_geometry_layout(mut self, layout: GeometryLayout) -> Self {
        self.geometry = layout;
        self
    }

    /// Add built-in library units searched when resolving calls.
    pub fn with_builtins(mut self, builtins: Vec<Arc<ShaderIr>>) -> Self {
        self.builtins_to_link.extend(builtins);
        self
    }
}

/// The merged executable of one stage.
#[derive(Debug, Clone)]
pub struct LinkedShader {
    /// Pipeline stage
    pub stage: ShaderStage,
    /// Merged IR
    pub ir: ShaderIr,
    /// Global declarations of `ir` as of intrastage linking
    pub symbols: SymbolTable,
    /// Uniform blocks of this stage, in stage block index order
    pub uniform_blocks: Vec<UniformBlock>,
    /// Folded geometry layout (geometry stage only)
    pub geometry: GeometryLayout,
    /// Sampler units used by the stage
    pub num_samplers: u32,
    /// Components of the default uniform block
    pub num_uniform_components: u32,
    /// Default block plus uniform block components
    pub num_combined_uniform_components: u32,
}

impl LinkedShader {
    pub(crate) fn new(stage: ShaderStage, ir: ShaderIr) -> Self {
        let symbols = SymbolTable::from_ir(&ir);
        Self {
            stage,
            ir,
            symbols,
            uniform_blocks: Vec::new(),
            geometry: GeometryLayout::default(),
            num_samplers: 0,
            num_uniform_components: 0,
            num_combined_uniform_components: 0,
        }
    }
}
