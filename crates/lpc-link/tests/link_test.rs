//! LinkTest helper for integration tests.
//!
//! Builds shader units with the GLIR builder, links them into a program
//! and gives access to the linked result.

#![allow(dead_code)]

use std::sync::Arc;

use lpc_glir::{Expr, Inst, ShaderBuilder, Type, Var, Variable, VariableMode};
use lpc_link::{link_shaders, LinkContext, LinkedShader, Program, Shader, ShaderStage};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A program under test.
pub struct LinkTest {
    pub ctx: LinkContext,
    pub program: Program,
}

impl LinkTest {
    pub fn new() -> Self {
        Self::with_context(LinkContext::default())
    }

    pub fn with_context(ctx: LinkContext) -> Self {
        init_logging();
        Self {
            ctx,
            program: Program::new(),
        }
    }

    pub fn attach(&mut self, shader: Shader) -> &mut Self {
        self.program.attach_shader(Arc::new(shader));
        self
    }

    pub fn link(&mut self) -> bool {
        link_shaders(&self.ctx, &mut self.program)
    }

    /// Link and panic with the info log on failure.
    pub fn assert_links(&mut self) {
        assert!(self.link(), "link failed:\n{}", self.program.info_log);
        assert!(self.program.link_status);
    }

    /// Link and expect `message` among the errors.
    pub fn assert_fails_with(&mut self, message: &str) {
        assert!(!self.link(), "link unexpectedly succeeded");
        assert!(!self.program.link_status);
        assert!(
            self.program.diagnostics.iter().any(|d| d.message == message),
            "expected error `{}`, got:\n{}",
            message,
            self.program.info_log
        );
    }

    pub fn stage(&self, stage: ShaderStage) -> &LinkedShader {
        self.program.linked.shaders[stage]
            .as_ref()
            .unwrap_or_else(|| panic!("no linked {} shader", stage))
    }

    /// A global of a linked stage, if it survived linking.
    pub fn find_var(&self, stage: ShaderStage, name: &str) -> Option<&Variable> {
        let shader = self.stage(stage);
        shader.ir.global_var(name).map(|var| &shader.ir.vars[var])
    }

    pub fn var(&self, stage: ShaderStage, name: &str) -> &Variable {
        self.find_var(stage, name)
            .unwrap_or_else(|| panic!("no global `{}` in {} shader", name, stage))
    }
}

pub fn input(b: &mut ShaderBuilder, name: &str, ty: Type) -> Var {
    b.global(Variable::new(name, ty, VariableMode::ShaderIn))
}

pub fn output(b: &mut ShaderBuilder, name: &str, ty: Type) -> Var {
    b.global(Variable::new(name, ty, VariableMode::ShaderOut))
}

pub fn uniform(b: &mut ShaderBuilder, name: &str, ty: Type) -> Var {
    b.global(Variable::new(name, ty, VariableMode::Uniform))
}

/// `vecN(value)`
pub fn splat(b: &mut ShaderBuilder, value: f32, size: u8) -> Expr {
    let scalar = b.float(value);
    b.swizzle(scalar, &vec![0; size as usize])
}

/// `dst = vecN(value)`
pub fn store_splat(b: &mut ShaderBuilder, dst: Var, value: f32, size: u8) -> Inst {
    let value = splat(b, value, size);
    b.assign_var(dst, value)
}

/// `dst = src`
pub fn copy(b: &mut ShaderBuilder, dst: Var, src: Var) -> Inst {
    let value = b.var_ref(src);
    b.assign_var(dst, value)
}

/// Define `void main()` and build the unit.
pub fn unit(mut b: ShaderBuilder, stage: ShaderStage, version: u32, body: Vec<Inst>) -> Shader {
    b.define_function("main", Type::Void, vec![], body);
    Shader::new(stage, version, b.finish())
}

/// A vertex shader writing `gl_Position` and nothing else.
pub fn position_only(version: u32) -> Shader {
    let mut b = ShaderBuilder::new();
    let pos = output(&mut b, "gl_Position", Type::vec(4));
    let store = store_splat(&mut b, pos, 0.0, 4);
    unit(b, ShaderStage::Vertex, version, vec![store])
}

/// A fragment shader writing a constant color to `color`.
pub fn solid_color(version: u32) -> Shader {
    let mut b = ShaderBuilder::new();
    let color = output(&mut b, "color", Type::vec(4));
    let store = store_splat(&mut b, color, 1.0, 4);
    unit(b, ShaderStage::Fragment, version, vec![store])
}
