//! Tests for varying matching and transform feedback.

mod link_test;

use link_test::{copy, input, output, position_only, solid_color, store_splat, unit, LinkTest};
use lpc_glir::{Interpolation, ShaderBuilder, Type, Variable, VariableMode};
use lpc_link::{
    BufferMode, ErrorCategory, LinkContext, Shader, ShaderStage, FRAG_RESULT_DATA0,
    VARYING_SLOT_VAR0,
};

/// `out vec4 v; out vec4 unused;` both written.
fn vertex_writing(version: u32) -> Shader {
    let mut b = ShaderBuilder::new();
    let pos = output(&mut b, "gl_Position", Type::vec(4));
    let v = output(&mut b, "v", Type::vec(4));
    let unused = output(&mut b, "unused", Type::vec(4));
    let a = store_splat(&mut b, pos, 0.0, 4);
    let c = store_splat(&mut b, v, 0.5, 4);
    let d = store_splat(&mut b, unused, 0.25, 4);
    unit(b, ShaderStage::Vertex, version, vec![a, c, d])
}

/// `in <ty> v; out vec4 color; color = v;`
fn fragment_reading(version: u32, v: Variable) -> Shader {
    let mut b = ShaderBuilder::new();
    let v = b.global(v);
    let color = output(&mut b, "color", Type::vec(4));
    let value = b.var_ref(v);
    let value = b.swizzle(value, &[0, 1, 2, 3]);
    let store = b.assign_var(color, value);
    unit(b, ShaderStage::Fragment, version, vec![store])
}

fn varying(name: &str, ty: Type) -> Variable {
    Variable::new(name, ty, VariableMode::ShaderIn)
}

#[test]
fn test_matched_varyings_share_a_location() {
    let mut test = LinkTest::new();
    test.attach(vertex_writing(140));
    test.attach(fragment_reading(140, varying("v", Type::vec(4))));
    test.assert_links();

    let out = test.var(ShaderStage::Vertex, "v");
    let inp = test.var(ShaderStage::Fragment, "v");
    assert!(out.location >= VARYING_SLOT_VAR0);
    assert_eq!(out.location, inp.location);
    assert!(!out.is_unmatched_generic_inout);
    assert!(!inp.is_unmatched_generic_inout);
    assert_eq!(inp.mode, VariableMode::ShaderIn);

    // Outputs nothing reads are removed with their assignments.
    assert!(test.find_var(ShaderStage::Vertex, "unused").is_none());
    assert_eq!(
        test.var(ShaderStage::Fragment, "color").location,
        FRAG_RESULT_DATA0
    );
}

#[test]
fn test_varying_type_mismatch() {
    let mut test = LinkTest::new();
    test.attach(vertex_writing(140));
    test.attach(fragment_reading(140, varying("v", Type::vec(3))));
    test.assert_fails_with(
        "vertex shader output `v' declared as type `vec4', but fragment shader input declared as type `vec3'",
    );
    assert_eq!(
        test.program.diagnostics[0].category,
        Some(ErrorCategory::InterfaceMismatch)
    );
}

#[test]
fn test_varying_interpolation_mismatch() {
    let mut test = LinkTest::new();
    test.attach(vertex_writing(140));
    test.attach(fragment_reading(
        140,
        varying("v", Type::vec(4)).with_interpolation(Interpolation::Flat),
    ));
    test.assert_fails_with(
        "vertex shader output `v' specifies smooth interpolation qualifier, but fragment shader input specifies flat interpolation qualifier",
    );
}

#[test]
fn test_unwritten_input() {
    let mut test = LinkTest::new();
    test.attach(position_only(120));
    test.attach(fragment_reading(120, varying("missing", Type::vec(4))));
    test.assert_fails_with("fragment shader varying missing not written by vertex shader");

    let mut test = LinkTest::new();
    test.attach(position_only(130));
    test.attach(fragment_reading(130, varying("missing", Type::vec(4))));
    test.assert_links();
    assert_eq!(
        test.var(ShaderStage::Fragment, "missing").mode,
        VariableMode::Auto
    );
}

#[test]
fn test_too_many_output_vectors() {
    let mut ctx = LinkContext::default();
    ctx.limits.stages[ShaderStage::Vertex].max_output_components = 4;

    let mut vb = ShaderBuilder::new();
    let a = output(&mut vb, "a", Type::vec(4));
    let b = output(&mut vb, "b", Type::vec(4));
    let sa = store_splat(&mut vb, a, 1.0, 4);
    let sb = store_splat(&mut vb, b, 1.0, 4);
    let vs = unit(vb, ShaderStage::Vertex, 140, vec![sa, sb]);

    let mut fb = ShaderBuilder::new();
    let a_in = input(&mut fb, "a", Type::vec(4));
    let b_in = input(&mut fb, "b", Type::vec(4));
    let color = output(&mut fb, "color", Type::vec(4));
    let other = output(&mut fb, "other", Type::vec(4));
    let ca = copy(&mut fb, color, a_in);
    let cb = copy(&mut fb, other, b_in);
    let fs = unit(fb, ShaderStage::Fragment, 140, vec![ca, cb]);

    let mut test = LinkTest::with_context(ctx);
    test.attach(vs).attach(fs);
    test.assert_fails_with("vertex shader uses too many output vectors (2 > 1)");
}

/// `out vec4 pos_out; out float extra;` both written.
fn capture_source() -> Shader {
    let mut b = ShaderBuilder::new();
    let pos = output(&mut b, "pos_out", Type::vec(4));
    let extra = output(&mut b, "extra", Type::FLOAT);
    let skipped = output(&mut b, "skipped", Type::vec(2));
    let a = store_splat(&mut b, pos, 1.0, 4);
    let one = b.float(1.0);
    let c = b.assign_var(extra, one);
    let d = store_splat(&mut b, skipped, 1.0, 2);
    unit(b, ShaderStage::Vertex, 140, vec![a, c, d])
}

#[test]
fn test_transform_feedback_interleaved() {
    let mut test = LinkTest::new();
    test.attach(capture_source());
    test.program
        .set_transform_feedback_varyings(&["pos_out", "extra"], BufferMode::Interleaved);
    test.assert_links();

    let info = &test.program.linked.transform_feedback;
    assert_eq!(info.buffer_strides, vec![5]);
    assert_eq!(info.outputs.len(), 2);
    assert_eq!(info.outputs[0].name, "pos_out");
    assert_eq!(info.outputs[0].location, VARYING_SLOT_VAR0);
    assert_eq!(info.outputs[0].components, 4);
    assert_eq!(info.outputs[1].location, VARYING_SLOT_VAR0 + 1);
    assert_eq!(info.outputs[1].offset, 4);

    // Captured outputs survive without a consumer; the rest do not.
    assert!(test.find_var(ShaderStage::Vertex, "extra").is_some());
    assert!(test.find_var(ShaderStage::Vertex, "skipped").is_none());
}

#[test]
fn test_transform_feedback_separate() {
    let mut test = LinkTest::new();
    test.attach(capture_source());
    test.attach(solid_color(140));
    test.program
        .set_transform_feedback_varyings(&["extra", "pos_out"], BufferMode::Separate);
    test.assert_links();

    let info = &test.program.linked.transform_feedback;
    assert_eq!(info.buffer_strides, vec![1, 4]);
    assert_eq!(info.outputs[1].buffer, 1);
    assert_eq!(info.outputs[1].offset, 0);
}

#[test]
fn test_transform_feedback_errors() {
    let mut test = LinkTest::new();
    test.attach(capture_source());
    test.program
        .set_transform_feedback_varyings(&["nope"], BufferMode::Interleaved);
    test.assert_fails_with("Transform feedback varying nope undeclared.");

    let mut test = LinkTest::new();
    test.attach(capture_source());
    test.program
        .set_transform_feedback_varyings(&["extra", "extra"], BufferMode::Interleaved);
    test.assert_fails_with("Transform feedback varying extra specified more than once.");

    let mut test = LinkTest::new();
    test.attach(solid_color(140));
    test.program
        .set_transform_feedback_varyings(&["color"], BufferMode::Interleaved);
    test.assert_fails_with(
        "Transform feedback varyings specified, but no vertex or geometry shader is present.",
    );
}
