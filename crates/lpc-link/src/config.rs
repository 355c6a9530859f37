//! Implementation limits and link options.

use crate::stage::{PerStage, ShaderStage};

/// Limits that apply to one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLimits {
    /// Texture image units
    pub max_samplers: u32,
    /// Components in the default uniform block
    pub max_default_uniform_components: u32,
    /// Components in the default block plus all uniform blocks
    pub max_combined_uniform_components: u32,
    /// Uniform blocks referenced by the stage
    pub max_uniform_blocks: u32,
    /// Atomic counters referenced by the stage
    pub max_atomic_counters: u32,
    /// Atomic counter buffers referenced by the stage
    pub max_atomic_buffers: u32,
    /// Input components; varying input vectors are this divided by 4
    pub max_input_components: u32,
    /// Output components; varying output vectors are this divided by 4
    pub max_output_components: u32,
}

impl StageLimits {
    fn for_stage(stage: ShaderStage) -> Self {
        let (max_input_components, max_output_components) = match stage {
            ShaderStage::Vertex => (64, 64),
            ShaderStage::Geometry => (64, 128),
            ShaderStage::Fragment => (128, 0),
        };
        Self {
            max_samplers: 16,
            max_default_uniform_components: 1024,
            max_combined_uniform_components: 50176,
            max_uniform_blocks: 12,
            max_atomic_counters: 4096,
            max_atomic_buffers: 8,
            max_input_components,
            max_output_components,
        }
    }

    /// Varying input vectors.
    pub fn max_input_vectors(&self) -> u32 {
        self.max_input_components / 4
    }

    /// Varying output vectors.
    pub fn max_output_vectors(&self) -> u32 {
        self.max_output_components / 4
    }
}

/// Implementation limits, defaulting to the GL 3.2 minimums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Per-stage limits
    pub stages: PerStage<StageLimits>,
    pub max_combined_uniform_blocks: u32,
    pub max_combined_atomic_counters: u32,
    pub max_combined_atomic_buffers: u32,
    /// Generic vertex attributes
    pub max_vertex_attribs: u32,
    /// Fragment color outputs
    pub max_draw_buffers: u32,
    /// Fragment color outputs with dual-source blending
    pub max_dual_source_draw_buffers: u32,
    pub max_transform_feedback_buffers: u32,
    pub max_transform_feedback_interleaved_components: u32,
    pub max_transform_feedback_separate_components: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            stages: PerStage::from_fn(StageLimits::for_stage),
            max_combined_uniform_blocks: 36,
            max_combined_atomic_counters: 4096,
            max_combined_atomic_buffers: 24,
            max_vertex_attribs: 16,
            max_draw_buffers: 8,
            max_dual_source_draw_buffers: 1,
            max_transform_feedback_buffers: 4,
            max_transform_feedback_interleaved_components: 64,
            max_transform_feedback_separate_components: 4,
        }
    }
}

/// Link behavior switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkOptions {
    /// Downgrade uniform component limit violations to warnings
    pub skip_strict_max_uniform_limit_check: bool,
    /// Require both a vertex and a fragment stage. `None` requires them
    /// for ES programs only.
    pub require_vertex_and_fragment: Option<bool>,
}

/// Everything the linker reads besides the program itself.
#[derive(Debug, Clone, Default)]
pub struct LinkContext {
    pub limits: Limits,
    pub options: LinkOptions,
}

impl LinkContext {
    pub fn new(limits: Limits, options: LinkOptions) -> Self {
        Self { limits, options }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_vertex_attribs, 16);
        assert_eq!(limits.stages[ShaderStage::Vertex].max_output_vectors(), 16);
        assert_eq!(limits.stages[ShaderStage::Geometry].max_output_vectors(), 32);
        assert_eq!(limits.stages[ShaderStage::Fragment].max_input_vectors(), 32);
    }
}
