//! Per-stage and combined resource limits.

use crate::{
    config::{LinkOptions, Limits},
    diagnostics::Diagnostics,
    error::{LinkError, LinkWarning},
    shader::LinkedShader,
    stage::{PerStage, ShaderStage},
};

/// Check samplers, uniform components and uniform blocks against `limits`.
///
/// Uniform component overruns are warnings when
/// `skip_strict_max_uniform_limit_check` is set.
pub fn check_resources(
    limits: &Limits,
    options: &LinkOptions,
    shaders: &PerStage<Option<LinkedShader>>,
    block_stage_index: &PerStage<alloc::vec::Vec<i32>>,
    diag: &mut Diagnostics,
) {
    for (stage, shader) in shaders.iter() {
        let Some(shader) = shader else { continue };
        let stage_limits = &limits.stages[stage];

        if shader.num_samplers > stage_limits.max_samplers {
            diag.error(LinkError::TooManySamplers { stage });
        }
        if shader.num_uniform_components > stage_limits.max_default_uniform_components {
            if options.skip_strict_max_uniform_limit_check {
                diag.warning(LinkWarning::DefaultUniformComponents { stage });
            } else {
                diag.error(LinkError::TooManyDefaultUniformComponents { stage });
            }
        }
        if shader.num_combined_uniform_components > stage_limits.max_combined_uniform_components
        {
            if options.skip_strict_max_uniform_limit_check {
                diag.warning(LinkWarning::UniformComponents { stage });
            } else {
                diag.error(LinkError::TooManyUniformComponents { stage });
            }
        }
    }

    let mut blocks: PerStage<u32> = PerStage::default();
    let mut total = 0;
    for (stage, indices) in block_stage_index.iter() {
        let referenced = indices.iter().filter(|i| **i >= 0).count() as u32;
        blocks[stage] += referenced;
        total += referenced;
    }

    if total > limits.max_combined_uniform_blocks {
        diag.error(LinkError::TooManyCombinedUniformBlocks {
            count: total,
            max: limits.max_combined_uniform_blocks,
        });
        return;
    }
    for stage in ShaderStage::ALL {
        let max = limits.stages[stage].max_uniform_blocks;
        if blocks[stage] > max {
            diag.error(LinkError::TooManyUniformBlocks {
                stage,
                count: blocks[stage],
                max,
            });
            break;
        }
    }
}
