//! Tests for uniforms, attribute and color locations, and resource limits.

mod link_test;

use std::sync::Arc;

use link_test::{input, output, store_splat, uniform, unit, LinkTest};
use lpc_glir::{
    BinaryOp, InterfacePacking, InterfaceType, SamplerDim, ShaderBuilder, StructField, Type,
    Variable, VariableMode,
};
use lpc_link::{
    LinkContext, Shader, ShaderStage, UniformLocation, FRAG_RESULT_DATA0, VERT_ATTRIB_GENERIC0,
};

/// `uniform float u[]; out float x; x = u[3];`
fn reads_unsized_uniform() -> Shader {
    let mut b = ShaderBuilder::new();
    let u = uniform(&mut b, "u", Type::unsized_array(Type::FLOAT));
    let x = output(&mut b, "x", Type::FLOAT);
    let array = b.var_ref(u);
    let element = b.index_const(array, 3);
    let store = b.assign_var(x, element);
    unit(b, ShaderStage::Vertex, 140, vec![store])
}

#[test]
fn test_unsized_uniform_takes_declared_size() {
    let mut b = ShaderBuilder::new();
    uniform(&mut b, "u", Type::array(Type::FLOAT, 4));
    let sized = Shader::new(ShaderStage::Vertex, 140, b.finish());

    let mut test = LinkTest::new();
    test.attach(reads_unsized_uniform()).attach(sized);
    test.program
        .set_transform_feedback_varyings(&["x"], Default::default());
    test.assert_links();

    assert_eq!(
        test.var(ShaderStage::Vertex, "u").ty,
        Type::array(Type::FLOAT, 4)
    );
    let storage = &test.program.linked.uniform_storage;
    assert_eq!(storage.len(), 1);
    assert_eq!(storage[0].name, "u");
    assert_eq!(storage[0].array_elements, 4);

    assert_eq!(
        test.program.uniform_location("u[2]"),
        Some(UniformLocation {
            index: 0,
            element: 2
        })
    );
    assert_eq!(
        test.program.uniform_location("u"),
        Some(UniformLocation {
            index: 0,
            element: 0
        })
    );
    assert_eq!(test.program.uniform_location("u[4]"), None);
    assert_eq!(test.program.uniform_location("v"), None);
}

#[test]
fn test_uniform_type_mismatch_across_stages() {
    let mut vb = ShaderBuilder::new();
    uniform(&mut vb, "k", Type::FLOAT);
    let vs = unit(vb, ShaderStage::Vertex, 140, vec![]);
    let mut fb = ShaderBuilder::new();
    uniform(&mut fb, "k", Type::INT);
    let fs = unit(fb, ShaderStage::Fragment, 140, vec![]);

    let mut test = LinkTest::new();
    test.attach(vs).attach(fs);
    test.assert_fails_with("uniform `k' declared as type `int' and type `float'");
}

#[test]
fn test_attribute_locations() {
    // in vec4 position (location 0); in vec3 normal (bound to 2); in mat4 weights;
    // gl_Position = position + normal.xyzz + weights[0];
    let mut b = ShaderBuilder::new();
    let position = b.global(
        Variable::new("position", Type::vec(4), VariableMode::ShaderIn)
            .with_location(VERT_ATTRIB_GENERIC0),
    );
    let normal = input(&mut b, "normal", Type::vec(3));
    let weights = input(&mut b, "weights", Type::mat(4));
    let pos = output(&mut b, "gl_Position", Type::vec(4));
    let p = b.var_ref(position);
    let n = b.var_ref(normal);
    let n = b.swizzle(n, &[0, 1, 2, 2]);
    let w = b.var_ref(weights);
    let w = b.index_const(w, 0);
    let sum = b.binary(BinaryOp::Add, Type::vec(4), p, n);
    let sum = b.binary(BinaryOp::Add, Type::vec(4), sum, w);
    let store = b.assign_var(pos, sum);

    let mut test = LinkTest::new();
    test.attach(unit(b, ShaderStage::Vertex, 140, vec![store]));
    test.program.bind_attribute_location("normal", 2);
    test.assert_links();

    assert_eq!(
        test.var(ShaderStage::Vertex, "position").location,
        VERT_ATTRIB_GENERIC0
    );
    assert_eq!(
        test.var(ShaderStage::Vertex, "normal").location,
        VERT_ATTRIB_GENERIC0 + 2
    );
    assert_eq!(
        test.var(ShaderStage::Vertex, "weights").location,
        VERT_ATTRIB_GENERIC0 + 3
    );
}

#[test]
fn test_invalid_explicit_attribute_location() {
    let mut b = ShaderBuilder::new();
    let position = b.global(
        Variable::new("position", Type::vec(4), VariableMode::ShaderIn)
            .with_location(VERT_ATTRIB_GENERIC0 + 16),
    );
    let pos = output(&mut b, "gl_Position", Type::vec(4));
    let store = link_test::copy(&mut b, pos, position);

    let mut test = LinkTest::new();
    test.attach(unit(b, ShaderStage::Vertex, 140, vec![store]));
    test.assert_fails_with("invalid explicit location 16 specified for `position'");
}

#[test]
fn test_attribute_binding_out_of_range() {
    let mut b = ShaderBuilder::new();
    let position = input(&mut b, "position", Type::vec(4));
    let pos = output(&mut b, "gl_Position", Type::vec(4));
    let store = link_test::copy(&mut b, pos, position);

    let mut test = LinkTest::new();
    test.attach(unit(b, ShaderStage::Vertex, 140, vec![store]));
    test.program.bind_attribute_location("position", 40);
    test.assert_fails_with("invalid explicit location 40 specified for `position'");
}

#[test]
fn test_frag_data_bindings() {
    let mut b = ShaderBuilder::new();
    let first = output(&mut b, "first", Type::vec(4));
    let second = output(&mut b, "second", Type::vec(4));
    let a = store_splat(&mut b, first, 1.0, 4);
    let c = store_splat(&mut b, second, 0.0, 4);

    let mut test = LinkTest::new();
    test.attach(unit(b, ShaderStage::Fragment, 140, vec![a, c]));
    test.program.bind_frag_data_location("second", 0);
    test.assert_links();

    assert_eq!(
        test.var(ShaderStage::Fragment, "second").location,
        FRAG_RESULT_DATA0
    );
    assert_eq!(
        test.var(ShaderStage::Fragment, "first").location,
        FRAG_RESULT_DATA0 + 1
    );
}

#[test]
fn test_dual_source_blend_index() {
    let mut b = ShaderBuilder::new();
    let first = output(&mut b, "first", Type::vec(4));
    let second = output(&mut b, "second", Type::vec(4));
    let a = store_splat(&mut b, first, 1.0, 4);
    let c = store_splat(&mut b, second, 0.0, 4);

    let mut test = LinkTest::new();
    test.attach(unit(b, ShaderStage::Fragment, 140, vec![a, c]));
    test.program.bind_frag_data_location("first", 0);
    test.program.bind_frag_data_location_indexed("second", 0, 1);
    test.assert_links();

    let first = test.var(ShaderStage::Fragment, "first");
    let second = test.var(ShaderStage::Fragment, "second");
    assert_eq!(first.location, FRAG_RESULT_DATA0);
    assert_eq!(second.location, FRAG_RESULT_DATA0);
    assert_eq!(first.index, 0);
    assert_eq!(second.index, 1);
}

/// `uniform sampler2D tex; out vec4 color; color = texture(tex, vec2(0.5));`
fn sampling_fragment() -> Shader {
    let mut b = ShaderBuilder::new();
    let tex = uniform(&mut b, "tex", Type::Sampler(SamplerDim::D2));
    let color = output(&mut b, "color", Type::vec(4));
    let sampler = b.var_ref(tex);
    let coord = link_test::splat(&mut b, 0.5, 2);
    let texel = b.texture(sampler, coord);
    let store = b.assign_var(color, texel);
    unit(b, ShaderStage::Fragment, 140, vec![store])
}

#[test]
fn test_samplers() {
    let mut test = LinkTest::new();
    test.attach(sampling_fragment());
    test.assert_links();

    let fs = test.stage(ShaderStage::Fragment);
    assert_eq!(fs.num_samplers, 1);
    let storage = &test.program.linked.uniform_storage;
    assert_eq!(storage[0].name, "tex");
    assert_eq!(storage[0].sampler_index[ShaderStage::Fragment], Some(0));
    assert!(storage[0].active[ShaderStage::Fragment]);
    assert!(!storage[0].active[ShaderStage::Vertex]);

    let mut ctx = LinkContext::default();
    ctx.limits.stages[ShaderStage::Fragment].max_samplers = 0;
    let mut test = LinkTest::with_context(ctx);
    test.attach(sampling_fragment());
    test.assert_fails_with("Too many fragment shader texture samplers");
}

#[test]
fn test_uniform_component_warning() {
    let mut ctx = LinkContext::default();
    ctx.limits.stages[ShaderStage::Fragment].max_default_uniform_components = 0;
    ctx.options.skip_strict_max_uniform_limit_check = true;

    let mut b = ShaderBuilder::new();
    let tint = uniform(&mut b, "tint", Type::vec(4));
    let color = output(&mut b, "color", Type::vec(4));
    let store = link_test::copy(&mut b, color, tint);
    let mut test = LinkTest::with_context(ctx);
    test.attach(unit(b, ShaderStage::Fragment, 140, vec![store]));
    test.assert_links();
    assert!(test
        .program
        .info_log
        .starts_with("warning: Too many fragment shader default uniform block components"));
}

/// A stage counting through `atomicCounterIncrement(counter)`.
fn counting(stage: ShaderStage, name: &str, binding: i32, offset: u32) -> Shader {
    let mut lib = ShaderBuilder::new();
    let param = lib.param(Variable::new("c", Type::AtomicUint, VariableMode::FunctionIn));
    lib.define_builtin("atomicCounterIncrement", Type::UINT, vec![param], vec![]);
    let lib = Arc::new(lib.finish());

    let mut b = ShaderBuilder::new();
    let counter = b.global(
        Variable::new(name, Type::AtomicUint, VariableMode::Uniform)
            .with_binding(binding)
            .with_atomic_offset(offset),
    );
    let mut body = Vec::new();
    if stage == ShaderStage::Vertex {
        let pos = output(&mut b, "gl_Position", Type::vec(4));
        body.push(store_splat(&mut b, pos, 0.0, 4));
    }
    let arg = b.var_ref(counter);
    body.push(b.call("atomicCounterIncrement", vec![arg], None));
    unit(b, stage, 140, body).with_builtins(vec![lib])
}

#[test]
fn test_atomic_counter_buffers() {
    let mut test = LinkTest::new();
    test.attach(counting(ShaderStage::Vertex, "a", 0, 0));
    test.attach(counting(ShaderStage::Fragment, "b", 0, 4));
    test.assert_links();

    let buffers = &test.program.linked.atomic_buffers;
    assert_eq!(buffers.len(), 1);
    assert_eq!(buffers[0].binding, 0);
    assert_eq!(buffers[0].minimum_size, 8);
    assert_eq!(buffers[0].stage_references[ShaderStage::Vertex], 1);
    assert_eq!(buffers[0].stage_references[ShaderStage::Fragment], 1);

    let storage = &test.program.linked.uniform_storage;
    assert!(storage.iter().all(|u| u.atomic_buffer_index == 0));
}

#[test]
fn test_atomic_counter_overlap() {
    let mut test = LinkTest::new();
    test.attach(counting(ShaderStage::Vertex, "a", 0, 0));
    test.attach(counting(ShaderStage::Fragment, "b", 0, 0));
    test.assert_fails_with("Atomic counter b declared at offset 0 which is already in use.");
}

fn lights_block() -> InterfaceType {
    InterfaceType::new(
        "Lights",
        vec![
            StructField::new("color", Type::vec(4)),
            StructField::new("power", Type::FLOAT),
        ],
        InterfacePacking::Std140,
    )
}

/// `uniform Lights { vec4 color; float power; };` in `stage`.
fn block_user(stage: ShaderStage, block: InterfaceType) -> Shader {
    let mut b = ShaderBuilder::new();
    for field in &block.fields {
        b.global(
            Variable::new(field.name.clone(), field.ty.clone(), VariableMode::Uniform)
                .with_interface(block.clone()),
        );
    }
    if stage == ShaderStage::Vertex {
        let pos = output(&mut b, "gl_Position", Type::vec(4));
        let store = store_splat(&mut b, pos, 0.0, 4);
        unit(b, stage, 140, vec![store])
    } else {
        unit(b, stage, 140, vec![])
    }
}

#[test]
fn test_uniform_blocks() {
    let mut test = LinkTest::new();
    test.attach(block_user(ShaderStage::Vertex, lights_block()));
    test.attach(block_user(ShaderStage::Fragment, lights_block()));
    test.assert_links();

    let linked = &test.program.linked;
    assert_eq!(linked.uniform_blocks.len(), 1);
    let block = &linked.uniform_blocks[0];
    assert_eq!(block.name, "Lights");
    let offsets: Vec<(&str, u32)> = block
        .members
        .iter()
        .map(|m| (m.name.as_str(), m.offset))
        .collect();
    assert_eq!(offsets, vec![("color", 0), ("power", 16)]);
    assert_eq!(linked.uniform_block_stage_index[ShaderStage::Vertex], vec![0]);
    assert_eq!(linked.uniform_block_stage_index[ShaderStage::Fragment], vec![0]);
    assert_eq!(linked.uniform_block_stage_index[ShaderStage::Geometry], vec![-1]);

    let members: Vec<&str> = linked
        .uniform_storage
        .iter()
        .filter(|u| u.block_index == 0)
        .map(|u| u.name.as_str())
        .collect();
    assert_eq!(members, vec!["color", "power"]);
}

#[test]
fn test_uniform_block_mismatch() {
    let mut other = lights_block();
    other.packing = InterfacePacking::Shared;

    let mut test = LinkTest::new();
    test.attach(block_user(ShaderStage::Vertex, lights_block()));
    test.attach(block_user(ShaderStage::Fragment, other));
    test.assert_fails_with("definitions of interface block `Lights' do not match");
}

#[test]
fn test_uniform_block_limit() {
    let mut ctx = LinkContext::default();
    ctx.limits.max_combined_uniform_blocks = 1;
    let mut test = LinkTest::with_context(ctx);
    test.attach(block_user(ShaderStage::Vertex, lights_block()));
    test.attach(block_user(ShaderStage::Fragment, lights_block()));
    test.assert_fails_with("Too many combined uniform blocks (2/1)");
}
