//! Program linking.
//!
//! [`link_shaders`] groups the attached units by stage, links each stage,
//! validates the stages against each other and allocates program
//! resources. The first failing step ends the link; everything recorded up
//! to then is kept in the info log.

use alloc::vec::Vec;

use log::debug;
use lpc_glir::{do_common_optimization, do_dead_code, DepthLayout, VariableMode};

use crate::{
    atomics::{link_assign_atomic_counter_resources, link_check_atomic_counter_resources},
    config::LinkContext,
    cross_validate::cross_validate_globals,
    diagnostics::Diagnostics,
    error::LinkError,
    interface_blocks::validate_interstage_interface_blocks,
    intrastage::link_intrastage_shaders,
    locations::{
        assign_attribute_or_color_locations, link_invalidate_variable_locations,
        LocationBindings,
    },
    program::{GeometryInfo, LinkState, LinkedProgram, Program},
    recursion::detect_recursion_linked,
    resources::check_resources,
    shader::{LinkedShader, Shader},
    stage::{PerStage, ShaderStage},
    symbols::SymbolTable,
    transform_feedback::{parse_tfeedback_decls, store_tfeedback_info, TfeedbackDecl},
    uniform_blocks::interstage_cross_validate_uniform_blocks,
    uniforms::{link_assign_uniform_locations, update_array_sizes},
    validate_stage::{
        validate_fragment_shader_executable, validate_geometry_shader_executable,
        validate_vertex_shader_executable,
    },
    varyings::{
        assign_varying_locations, check_against_input_limit, check_against_output_limit,
        cross_validate_outputs_to_inputs, demote_shader_inputs_and_outputs,
    },
};

/// Link `program` under `ctx`.
///
/// Replaces the program's linked state, status, info log and diagnostics.
/// Returns the link status.
pub fn link_shaders(ctx: &LinkContext, program: &mut Program) -> bool {
    let mut linker = Linker::new(ctx, program);
    let ok = linker.run().is_some() && !linker.diag.has_errors();
    let final_state = if ok {
        LinkState::FinalizedOk
    } else {
        LinkState::FinalizedFailed
    };
    linker.enter(final_state);

    let Linker {
        mut linked, diag, ..
    } = linker;
    if ok {
        for (_, shader) in linked.shaders.iter_mut() {
            if let Some(shader) = shader {
                shader.ir = shader.ir.compacted();
                shader.symbols = SymbolTable::from_ir(&shader.ir);
            }
        }
    }

    let (info_log, diagnostics) = diag.into_parts();
    program.state = final_state;
    program.link_status = ok;
    program.info_log = info_log;
    program.diagnostics = diagnostics;
    program.linked = linked;
    ok
}

/// State of one link call.
struct Linker<'a> {
    ctx: &'a LinkContext,
    program: &'a Program,
    linked: LinkedProgram,
    diag: Diagnostics,
    state: LinkState,
}

impl<'a> Linker<'a> {
    fn new(ctx: &'a LinkContext, program: &'a Program) -> Self {
        Self {
            ctx,
            program,
            linked: LinkedProgram::default(),
            diag: Diagnostics::new(),
            state: LinkState::Unlinked,
        }
    }

    fn enter(&mut self, state: LinkState) {
        debug!("link state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn run(&mut self) -> Option<()> {
        self.enter(LinkState::Grouping);
        let units = self.group()?;

        self.enter(LinkState::IntrastageLinking);
        self.link_stages(&units)?;

        self.enter(LinkState::InterstageValidating);
        self.validate_interstage()?;
        self.optimize()?;

        self.enter(LinkState::ResourceAllocating);
        self.assign_locations()?;
        self.assign_varyings()?;
        self.allocate_uniforms()?;
        self.check_required_stages()
    }

    /// Stages with a linked shader, in pipeline order.
    fn present_stages(&self) -> Vec<ShaderStage> {
        self.linked
            .shaders
            .iter()
            .filter(|(_, s)| s.is_some())
            .map(|(stage, _)| stage)
            .collect()
    }

    /// Sort the units by stage and settle the program version.
    fn group(&mut self) -> Option<PerStage<Vec<&'a Shader>>> {
        let program = self.program;
        let units = PerStage::from_fn(|stage| {
            program
                .shaders
                .iter()
                .filter(|s| s.stage == stage)
                .map(|s| &**s)
                .collect::<Vec<_>>()
        });

        let Some(first) = program.shaders.first() else {
            return Some(units);
        };
        let is_es = first.is_es;
        let mut min_version = u32::MAX;
        let mut max_version = 0;
        for shader in &program.shaders {
            min_version = min_version.min(shader.version);
            max_version = max_version.max(shader.version);
            if shader.is_es != is_es {
                self.diag.error(LinkError::VersionMismatch);
                return None;
            }
        }
        if is_es && min_version != max_version {
            self.diag.error(LinkError::VersionMismatch);
            return None;
        }
        self.linked.version = max_version;
        self.linked.is_es = is_es;
        debug!(
            "program version {}{}: {} vertex, {} geometry, {} fragment unit(s)",
            max_version,
            if is_es { " es" } else { "" },
            units[ShaderStage::Vertex].len(),
            units[ShaderStage::Geometry].len(),
            units[ShaderStage::Fragment].len()
        );

        if !units[ShaderStage::Geometry].is_empty() && units[ShaderStage::Vertex].is_empty() {
            self.diag.error(LinkError::GeometryWithoutVertex);
            return None;
        }
        Some(units)
    }

    /// Link and validate each stage on its own.
    fn link_stages(&mut self, units: &PerStage<Vec<&Shader>>) -> Option<()> {
        let version = self.linked.version;
        let is_es = self.linked.is_es;
        for stage in [
            ShaderStage::Vertex,
            ShaderStage::Fragment,
            ShaderStage::Geometry,
        ] {
            if units[stage].is_empty() {
                continue;
            }
            let shader = link_intrastage_shaders(stage, &units[stage], version, &mut self.diag)?;
            match stage {
                ShaderStage::Vertex => {
                    let clip = self
                        .diag
                        .record(validate_vertex_shader_executable(version, is_es, &shader))?;
                    self.linked.vertex_clip = clip;
                    self.linked.last_clip_distance_array_size = clip.clip_distance_array_size;
                }
                ShaderStage::Fragment => {
                    self.diag
                        .record(validate_fragment_shader_executable(&shader))?;
                }
                ShaderStage::Geometry => {
                    let usage = self
                        .diag
                        .record(validate_geometry_shader_executable(version, is_es, &shader))?;
                    self.linked.geometry = GeometryInfo {
                        vertices_in: usage.vertices_in,
                        input_type: shader.geometry.input_type,
                        output_type: shader.geometry.output_type,
                        vertices_out: shader.geometry.vertices_out,
                        uses_end_primitive: usage.uses_end_primitive,
                        clip: usage.clip,
                    };
                    self.linked.last_clip_distance_array_size =
                        usage.clip.clip_distance_array_size;
                }
            }
            self.linked.shaders[stage] = Some(shader);
        }
        Some(())
    }

    /// Uniforms, interface blocks and varyings of adjacent stages.
    fn validate_interstage(&mut self) -> Option<()> {
        let merged = self.diag.record(cross_validate_globals(
            self.linked
                .shaders
                .iter()
                .filter_map(|(_, s)| s.as_ref())
                .map(|s| &s.ir),
            true,
        ))?;
        for (_, shader) in self.linked.shaders.iter_mut() {
            if let Some(shader) = shader {
                merged.apply_to(&mut shader.ir);
            }
        }

        let present = self.present_stages();
        for pair in present.windows(2) {
            let (Some(producer), Some(consumer)) = (
                self.linked.shaders[pair[0]].as_ref(),
                self.linked.shaders[pair[1]].as_ref(),
            ) else {
                continue;
            };
            self.diag
                .record(validate_interstage_interface_blocks(producer, consumer))?;
            self.diag
                .record(cross_validate_outputs_to_inputs(producer, consumer))?;
        }

        let (blocks, stage_index) = self
            .diag
            .record(interstage_cross_validate_uniform_blocks(&self.linked.shaders))?;
        debug!("{} program uniform block(s)", blocks.len());
        self.linked.uniform_blocks = blocks;
        self.linked.uniform_block_stage_index = stage_index;
        Some(())
    }

    fn optimize(&mut self) -> Option<()> {
        for (stage, shader) in self.linked.shaders.iter_mut() {
            let Some(shader) = shader else { continue };
            if !detect_recursion_linked(&shader.ir, &mut self.diag) {
                return None;
            }
            let mut passes = 0;
            while do_common_optimization(&mut shader.ir, false) {
                passes += 1;
            }
            debug!("{} shader optimized in {} pass(es)", stage, passes);
        }
        Some(())
    }

    /// Vertex attribute and fragment color locations.
    fn assign_locations(&mut self) -> Option<()> {
        for (_, shader) in self.linked.shaders.iter_mut() {
            if let Some(shader) = shader {
                link_invalidate_variable_locations(&mut shader.ir);
            }
        }

        let limits = &self.ctx.limits;
        let program = self.program;
        if let Some(vs) = self.linked.shaders[ShaderStage::Vertex].as_mut() {
            self.diag.record(assign_attribute_or_color_locations(
                &mut vs.ir,
                ShaderStage::Vertex,
                limits.max_vertex_attribs,
                LocationBindings {
                    locations: &program.attribute_bindings,
                    indices: None,
                },
            ))?;
        }
        if let Some(fs) = self.linked.shaders[ShaderStage::Fragment].as_mut() {
            self.diag.record(assign_attribute_or_color_locations(
                &mut fs.ir,
                ShaderStage::Fragment,
                limits
                    .max_draw_buffers
                    .max(limits.max_dual_source_draw_buffers),
                LocationBindings {
                    locations: &program.frag_data_bindings,
                    indices: Some(&program.frag_data_index_bindings),
                },
            ))?;
        }
        Some(())
    }

    /// Match varyings back to front so outputs unused downstream are
    /// removed before their producers are examined.
    fn assign_varyings(&mut self) -> Option<()> {
        let present = self.present_stages();
        let (Some(&first), Some(&last)) = (present.first(), present.last()) else {
            return Some(());
        };
        let (ctx, program) = (self.ctx, self.program);
        let limits = &ctx.limits;
        let names = &program.transform_feedback_varyings;
        let mode = program.transform_feedback_buffer_mode;
        let version = self.linked.version;

        let mut decls: Vec<TfeedbackDecl> = Vec::new();
        if !names.is_empty() {
            if first == ShaderStage::Fragment {
                self.diag
                    .error(LinkError::TransformFeedbackWithoutVertexStage);
                return None;
            }
            decls = self.diag.record(parse_tfeedback_decls(names))?;
        }

        if last != ShaderStage::Fragment {
            if let Some(shader) = self.linked.shaders[last].as_mut() {
                if !decls.is_empty() {
                    self.diag.record(assign_varying_locations(
                        version,
                        limits,
                        shader,
                        None,
                        &mut decls,
                        mode,
                    ))?;
                }
                demote_shader_inputs_and_outputs(&mut shader.ir, VariableMode::ShaderOut);
                while do_dead_code(&mut shader.ir, false) {}
            }
        } else if first == ShaderStage::Fragment {
            if let Some(shader) = self.linked.shaders[first].as_mut() {
                demote_shader_inputs_and_outputs(&mut shader.ir, VariableMode::ShaderIn);
                while do_dead_code(&mut shader.ir, false) {}
            }
        }

        let mut none: Vec<TfeedbackDecl> = Vec::new();
        let mut next = last;
        for &stage in present.iter().rev().skip(1) {
            let Some((producer, consumer)) = self.linked.shaders.pair_mut(stage, next) else {
                continue;
            };
            let (Some(producer), Some(consumer)) = (producer.as_mut(), consumer.as_mut()) else {
                continue;
            };
            let tfeedback = if next == ShaderStage::Fragment {
                &mut decls[..]
            } else {
                &mut none[..]
            };
            self.diag.record(assign_varying_locations(
                version,
                limits,
                producer,
                Some(&mut *consumer),
                tfeedback,
                mode,
            ))?;

            demote_shader_inputs_and_outputs(&mut producer.ir, VariableMode::ShaderOut);
            demote_shader_inputs_and_outputs(&mut consumer.ir, VariableMode::ShaderIn);
            while do_dead_code(&mut producer.ir, false) {}
            while do_dead_code(&mut consumer.ir, false) {}

            self.diag
                .record(check_against_output_limit(limits, producer))?;
            self.diag
                .record(check_against_input_limit(limits, consumer))?;
            next = stage;
        }

        self.linked.transform_feedback =
            self.diag.record(store_tfeedback_info(&decls, mode, limits))?;
        Some(())
    }

    /// Uniform storage, atomic buffers and the resource limits.
    fn allocate_uniforms(&mut self) -> Option<()> {
        let linked = &mut self.linked;
        update_array_sizes(&mut linked.shaders);
        linked.uniform_storage = link_assign_uniform_locations(
            &mut linked.shaders,
            &linked.uniform_blocks,
            &linked.uniform_block_stage_index,
        );
        linked.atomic_buffers =
            link_assign_atomic_counter_resources(&linked.shaders, &mut linked.uniform_storage);
        linked.frag_depth_layout = fragdepth_layout(linked.shaders[ShaderStage::Fragment].as_ref());

        let ctx = self.ctx;
        check_resources(
            &ctx.limits,
            &ctx.options,
            &linked.shaders,
            &linked.uniform_block_stage_index,
            &mut self.diag,
        );
        link_check_atomic_counter_resources(&ctx.limits, &linked.shaders, &mut self.diag);
        if self.diag.has_errors() {
            return None;
        }
        Some(())
    }

    fn check_required_stages(&mut self) -> Option<()> {
        let required = self
            .ctx
            .options
            .require_vertex_and_fragment
            .unwrap_or(self.linked.is_es);
        if !required || self.program.separate_shader {
            return Some(());
        }
        if self.linked.shaders[ShaderStage::Vertex].is_none() {
            self.diag.error(LinkError::MissingVertexShader);
            return None;
        }
        if self.linked.shaders[ShaderStage::Fragment].is_none() {
            self.diag.error(LinkError::MissingFragmentShader);
            return None;
        }
        Some(())
    }
}

/// Depth layout of the `gl_FragDepth` output that survived linking.
fn fragdepth_layout(fragment: Option<&LinkedShader>) -> DepthLayout {
    let Some(fragment) = fragment else {
        return DepthLayout::default();
    };
    let ir = &fragment.ir;
    ir.globals_with_mode(VariableMode::ShaderOut)
        .into_iter()
        .map(|var| &ir.vars[var])
        .find(|variable| variable.name == "gl_FragDepth")
        .map(|variable| variable.depth_layout)
        .unwrap_or_default()
}
