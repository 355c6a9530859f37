//! Multi-stage GLSL program linker over GLIR.
//!
//! Takes independently compiled shader units, merges the units of each
//! pipeline stage into one executable, validates the stages against each
//! other and assigns program resources: vertex attribute and fragment
//! output locations, varying slots, uniform storage, uniform blocks,
//! atomic counter buffers and transform feedback.
//!
//! Link failures never abort the process. They are recorded in the
//! program's info log and diagnostics, and [`link_shaders`] returns the
//! link status.

#![no_std]

extern crate alloc;

mod array_sizing;
mod atomics;
mod config;
mod cross_validate;
mod diagnostics;
mod error;
mod geometry;
mod interface_blocks;
mod intrastage;
mod linker;
mod locations;
mod program;
mod recursion;
mod resource_name;
mod resources;
mod shader;
mod stage;
mod symbols;
mod transform_feedback;
mod uniform_blocks;
mod uniforms;
mod validate_stage;
mod varyings;

pub use array_sizing::size_implicit_arrays;
pub use atomics::AtomicBuffer;
pub use config::{LinkContext, LinkOptions, Limits, StageLimits};
pub use cross_validate::{cross_validate_globals, MergedGlobals};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{ErrorCategory, LinkError, LinkResult, LinkWarning};
pub use geometry::{GeometryLayout, PrimitiveType};
pub use linker::link_shaders;
pub use locations::{
    find_available_slots, FRAG_RESULT_DATA0, VARYING_SLOT_VAR0, VERT_ATTRIB_GENERIC0,
};
pub use program::{BufferMode, GeometryInfo, LinkState, LinkedProgram, Program, UniformLocation};
pub use resource_name::parse_program_resource_name;
pub use shader::{LinkedShader, Shader};
pub use stage::{PerStage, ShaderStage};
pub use symbols::SymbolTable;
pub use transform_feedback::{TransformFeedbackInfo, TransformFeedbackOutput};
pub use uniform_blocks::{UniformBlock, UniformBlockMember};
pub use uniforms::UniformStorage;
pub use validate_stage::ClipUsage;
