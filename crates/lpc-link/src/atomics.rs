//! Atomic counter buffers.
//!
//! Atomic counters are grouped into buffers by binding point. Within a
//! buffer each counter occupies `4 * size` bytes starting at its offset,
//! and distinct counters may not overlap.

use alloc::{collections::BTreeMap, string::String, vec::Vec};

use log::debug;
use lpc_glir::VariableMode;

use crate::{
    config::Limits,
    diagnostics::Diagnostics,
    error::LinkError,
    shader::LinkedShader,
    stage::{PerStage, ShaderStage},
    uniforms::UniformStorage,
};

const ATOMIC_COUNTER_SIZE: u32 = 4;

/// An atomic counter buffer binding of the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicBuffer {
    pub binding: i32,
    /// Bytes needed to hold every counter of the buffer
    pub minimum_size: u32,
    /// Storage entries of the counters in this buffer
    pub uniforms: Vec<usize>,
    /// Counters of this buffer referenced by each stage
    pub stage_references: PerStage<u32>,
}

#[derive(Debug, Clone)]
struct ActiveCounter {
    name: String,
    offset: u32,
    size: u32,
    stages: PerStage<bool>,
}

impl ActiveCounter {
    fn end(&self) -> u32 {
        self.offset + self.size * ATOMIC_COUNTER_SIZE
    }
}

/// Counters of all stages, deduplicated by name, grouped by binding and
/// sorted by offset.
fn find_active_atomic_counters(
    shaders: &PerStage<Option<LinkedShader>>,
) -> BTreeMap<i32, Vec<ActiveCounter>> {
    let mut buffers: BTreeMap<i32, Vec<ActiveCounter>> = BTreeMap::new();
    for (stage, shader) in shaders.iter() {
        let Some(shader) = shader else { continue };
        let ir = &shader.ir;
        for var in ir.globals_with_mode(VariableMode::Uniform) {
            let variable = &ir.vars[var];
            if !variable.ty.contains_atomic() {
                continue;
            }
            let counters = buffers.entry(variable.binding).or_default();
            let index = match counters.iter().position(|c| c.name == variable.name) {
                Some(index) => index,
                None => {
                    counters.push(ActiveCounter {
                        name: variable.name.clone(),
                        offset: variable.atomic_offset,
                        size: variable.ty.atomic_size(),
                        stages: PerStage::default(),
                    });
                    counters.len() - 1
                }
            };
            counters[index].stages[stage] = true;
        }
    }
    for counters in buffers.values_mut() {
        counters.sort_by_key(|c| c.offset);
    }
    buffers
}

/// Build the program's atomic buffer table and point each counter's
/// storage entry at its buffer.
pub fn link_assign_atomic_counter_resources(
    shaders: &PerStage<Option<LinkedShader>>,
    storage: &mut [UniformStorage],
) -> Vec<AtomicBuffer> {
    let mut result = Vec::new();
    for (binding, counters) in find_active_atomic_counters(shaders) {
        let mut buffer = AtomicBuffer {
            binding,
            minimum_size: 0,
            uniforms: Vec::new(),
            stage_references: PerStage::default(),
        };
        for counter in &counters {
            buffer.minimum_size = buffer.minimum_size.max(counter.end());
            if let Some(index) = storage.iter().position(|u| u.name == counter.name) {
                storage[index].atomic_buffer_index = result.len() as i32;
                buffer.uniforms.push(index);
            }
            for stage in ShaderStage::ALL {
                if counter.stages[stage] {
                    buffer.stage_references[stage] += counter.size;
                }
            }
        }
        debug!(
            "atomic buffer at binding {}: {} counter(s), {} bytes",
            binding,
            counters.len(),
            buffer.minimum_size
        );
        result.push(buffer);
    }
    result
}

/// Check counter overlap and the atomic counter limits.
pub fn link_check_atomic_counter_resources(
    limits: &Limits,
    shaders: &PerStage<Option<LinkedShader>>,
    diag: &mut Diagnostics,
) {
    let buffers = find_active_atomic_counters(shaders);
    let mut counters_per_stage: PerStage<u32> = PerStage::default();
    let mut buffers_per_stage: PerStage<u32> = PerStage::default();
    let mut total_counters = 0;
    let mut total_buffers = 0;

    for counters in buffers.values() {
        for pair in counters.windows(2) {
            let (first, second) = (&pair[0], &pair[1]);
            if first.end() > second.offset && first.name != second.name {
                diag.error(LinkError::AtomicCounterOverlap {
                    name: second.name.clone(),
                    offset: second.offset,
                });
            }
        }

        for stage in ShaderStage::ALL {
            let referenced: u32 = counters
                .iter()
                .filter(|c| c.stages[stage])
                .map(|c| c.size)
                .sum();
            if referenced > 0 {
                counters_per_stage[stage] += referenced;
                buffers_per_stage[stage] += 1;
                total_buffers += 1;
            }
        }
        total_counters += counters.iter().map(|c| c.size).sum::<u32>();
    }

    for stage in ShaderStage::ALL {
        let stage_limits = &limits.stages[stage];
        if counters_per_stage[stage] > stage_limits.max_atomic_counters {
            diag.error(LinkError::TooManyAtomicCounters { stage });
        }
        if buffers_per_stage[stage] > stage_limits.max_atomic_buffers {
            diag.error(LinkError::TooManyAtomicBuffers { stage });
        }
    }
    if total_counters > limits.max_combined_atomic_counters {
        diag.error(LinkError::TooManyCombinedAtomicCounters);
    }
    if total_buffers > limits.max_combined_atomic_buffers {
        diag.error(LinkError::TooManyCombinedAtomicBuffers);
    }
}
