//! Program objects: link inputs and link results.

use alloc::{collections::BTreeMap, string::String, sync::Arc, vec::Vec};

use lpc_glir::DepthLayout;

use crate::{
    atomics::AtomicBuffer,
    diagnostics::Diagnostic,
    geometry::PrimitiveType,
    resource_name::split_resource_name,
    shader::{LinkedShader, Shader},
    stage::PerStage,
    transform_feedback::TransformFeedbackInfo,
    uniform_blocks::UniformBlock,
    uniforms::UniformStorage,
    validate_stage::ClipUsage,
};

/// Progress of a program through linking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Unlinked,
    Grouping,
    IntrastageLinking,
    InterstageValidating,
    ResourceAllocating,
    FinalizedOk,
    FinalizedFailed,
}

/// How transform feedback outputs are laid out in buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferMode {
    /// All outputs in buffer 0
    #[default]
    Interleaved,
    /// One buffer per output
    Separate,
}

/// Geometry stage state derived during linking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeometryInfo {
    pub vertices_in: u32,
    pub input_type: Option<PrimitiveType>,
    pub output_type: Option<PrimitiveType>,
    pub vertices_out: u32,
    pub uses_end_primitive: bool,
    pub clip: ClipUsage,
}

/// Everything produced by a link.
///
/// A link builds a fresh value and stores it in the program when done;
/// nothing of a previous link survives.
#[derive(Debug, Clone, Default)]
pub struct LinkedProgram {
    /// Program language version (the highest of all units)
    pub version: u32,
    pub is_es: bool,
    /// Linked executable per stage
    pub shaders: PerStage<Option<LinkedShader>>,
    /// Program uniform block table
    pub uniform_blocks: Vec<UniformBlock>,
    /// Stage block index of each program block, -1 when absent
    pub uniform_block_stage_index: PerStage<Vec<i32>>,
    /// Active uniforms: default block first, then block members
    pub uniform_storage: Vec<UniformStorage>,
    pub atomic_buffers: Vec<AtomicBuffer>,
    pub vertex_clip: ClipUsage,
    pub geometry: GeometryInfo,
    /// `gl_ClipDistance` size of the last pre-fragment stage
    pub last_clip_distance_array_size: u32,
    /// Layout of the written `gl_FragDepth`
    pub frag_depth_layout: DepthLayout,
    pub transform_feedback: TransformFeedbackInfo,
}

/// A resolved uniform location: storage entry and array element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocation {
    pub index: usize,
    pub element: u32,
}

/// A program object.
///
/// Holds the attached units and the pre-link API state. Linking replaces
/// [`Program::linked`], the status and the info log.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Attached units
    pub shaders: Vec<Arc<Shader>>,
    /// Generic attribute index bound to an attribute name
    pub attribute_bindings: BTreeMap<String, u32>,
    /// Color number bound to a fragment output name
    pub frag_data_bindings: BTreeMap<String, u32>,
    /// Dual-source blend index bound to a fragment output name
    pub frag_data_index_bindings: BTreeMap<String, u32>,
    /// Transform feedback varying names, in capture order
    pub transform_feedback_varyings: Vec<String>,
    pub transform_feedback_buffer_mode: BufferMode,
    /// Program used for a single pipeline stage set
    pub separate_shader: bool,

    pub state: LinkState,
    pub link_status: bool,
    pub info_log: String,
    pub diagnostics: Vec<Diagnostic>,
    pub linked: LinkedProgram,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a compiled unit.
    pub fn attach_shader(&mut self, shader: Arc<Shader>) {
        self.shaders.push(shader);
    }

    /// Bind the attribute `name` to generic attribute `index`.
    pub fn bind_attribute_location(&mut self, name: &str, index: u32) {
        self.attribute_bindings.insert(String::from(name), index);
    }

    /// Bind the fragment output `name` to color number `color`.
    pub fn bind_frag_data_location(&mut self, name: &str, color: u32) {
        self.frag_data_bindings.insert(String::from(name), color);
    }

    /// Bind the fragment output `name` to color `color` and blend `index`.
    pub fn bind_frag_data_location_indexed(&mut self, name: &str, color: u32, index: u32) {
        self.frag_data_bindings.insert(String::from(name), color);
        self.frag_data_index_bindings
            .insert(String::from(name), index);
    }

    /// Select the outputs captured by transform feedback.
    pub fn set_transform_feedback_varyings(&mut self, names: &[&str], mode: BufferMode) {
        self.transform_feedback_varyings = names.iter().map(|n| String::from(*n)).collect();
        self.transform_feedback_buffer_mode = mode;
    }

    /// Resolve a uniform name such as `u`, `a[2]` or `s.f` to a storage
    /// entry and array element.
    ///
    /// The exact name is tried first, then the name without its trailing
    /// subscript. A subscript on a non-array, or past the end of the
    /// array, does not resolve.
    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        let storage = &self.linked.uniform_storage;
        if let Some(index) = storage.iter().position(|u| u.name == name) {
            return Some(UniformLocation { index, element: 0 });
        }
        let (base, element) = split_resource_name(name);
        let element = element?;
        let index = storage.iter().position(|u| u.name == base)?;
        let entry = &storage[index];
        if entry.array_elements == 0 || element >= entry.array_elements {
            return None;
        }
        Some(UniformLocation { index, element })
    }
}
