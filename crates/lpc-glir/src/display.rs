//! Text form of shader IR, for logs and test failure output.

use core::fmt;

use crate::{
    entity::{Expr, Inst},
    ir::{ExprKind, InstData, Item, ShaderIr, UnaryOp},
    variable::{Variable, VariableMode},
};

const COMPONENTS: [char; 4] = ['x', 'y', 'z', 'w'];

fn storage_qualifier(variable: &Variable) -> &'static str {
    match variable.mode {
        VariableMode::Uniform => "uniform ",
        VariableMode::ShaderIn | VariableMode::SystemValue => "in ",
        VariableMode::ShaderOut => "out ",
        VariableMode::FunctionOut => "out ",
        VariableMode::FunctionInOut => "inout ",
        VariableMode::Auto if variable.read_only => "const ",
        _ => "",
    }
}

struct Printer<'a, 'b> {
    ir: &'a ShaderIr,
    f: &'a mut fmt::Formatter<'b>,
}

impl Printer<'_, '_> {
    fn declaration(&mut self, variable: &Variable) -> fmt::Result {
        if variable.explicit_location {
            write!(self.f, "layout(location = {}) ", variable.location)?;
        }
        if variable.invariant {
            write!(self.f, "invariant ")?;
        }
        if variable.centroid {
            write!(self.f, "centroid ")?;
        }
        write!(
            self.f,
            "{}{} {}",
            storage_qualifier(variable),
            variable.ty,
            variable.name
        )?;
        if let Some(init) = &variable.constant_initializer {
            write!(self.f, " = {}", init)?;
        }
        Ok(())
    }

    fn body(&mut self, body: &[Inst], depth: usize) -> fmt::Result {
        for inst in body {
            self.inst(*inst, depth)?;
        }
        Ok(())
    }

    fn indent(&mut self, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            write!(self.f, "    ")?;
        }
        Ok(())
    }

    fn inst(&mut self, inst: Inst, depth: usize) -> fmt::Result {
        let ir = self.ir;
        self.indent(depth)?;
        match &ir.insts[inst] {
            InstData::Declare(var) => {
                self.declaration(&ir.vars[*var])?;
                writeln!(self.f, ";")
            }
            InstData::Assign { lhs, rhs } => {
                self.expr(*lhs)?;
                write!(self.f, " = ")?;
                self.expr(*rhs)?;
                writeln!(self.f, ";")
            }
            InstData::Call {
                callee,
                args,
                result,
            } => {
                if let Some(result) = result {
                    self.expr(*result)?;
                    write!(self.f, " = ")?;
                }
                write!(self.f, "{}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(self.f, ", ")?;
                    }
                    self.expr(*arg)?;
                }
                writeln!(self.f, ");")
            }
            InstData::If {
                condition,
                then_body,
                else_body,
            } => {
                write!(self.f, "if (")?;
                self.expr(*condition)?;
                writeln!(self.f, ") {{")?;
                self.body(then_body, depth + 1)?;
                if !else_body.is_empty() {
                    self.indent(depth)?;
                    writeln!(self.f, "}} else {{")?;
                    self.body(else_body, depth + 1)?;
                }
                self.indent(depth)?;
                writeln!(self.f, "}}")
            }
            InstData::Loop { body } => {
                writeln!(self.f, "loop {{")?;
                self.body(body, depth + 1)?;
                self.indent(depth)?;
                writeln!(self.f, "}}")
            }
            InstData::Break => writeln!(self.f, "break;"),
            InstData::Continue => writeln!(self.f, "continue;"),
            InstData::Return(None) => writeln!(self.f, "return;"),
            InstData::Return(Some(value)) => {
                write!(self.f, "return ")?;
                self.expr(*value)?;
                writeln!(self.f, ";")
            }
            InstData::Discard => writeln!(self.f, "discard;"),
            InstData::EmitVertex => writeln!(self.f, "EmitVertex();"),
            InstData::EndPrimitive => writeln!(self.f, "EndPrimitive();"),
        }
    }

    fn expr(&mut self, expr: Expr) -> fmt::Result {
        let ir = self.ir;
        match &ir.exprs[expr].kind {
            ExprKind::Constant(c) => write!(self.f, "{}", c),
            ExprKind::Var(var) => write!(self.f, "{}", ir.vars[*var].name),
            ExprKind::Index { array, index } => {
                self.expr(*array)?;
                write!(self.f, "[")?;
                self.expr(*index)?;
                write!(self.f, "]")
            }
            ExprKind::Field { record, field } => {
                self.expr(*record)?;
                write!(self.f, ".{}", field)
            }
            ExprKind::Unary { op, operand } => {
                let symbol = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Not => "!",
                };
                write!(self.f, "{}", symbol)?;
                self.expr(*operand)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                write!(self.f, "(")?;
                self.expr(*lhs)?;
                write!(self.f, " {} ", op.symbol())?;
                self.expr(*rhs)?;
                write!(self.f, ")")
            }
            ExprKind::Swizzle { value, components } => {
                self.expr(*value)?;
                write!(self.f, ".")?;
                for c in components {
                    let name = COMPONENTS.get(usize::from(*c)).copied().unwrap_or('?');
                    write!(self.f, "{}", name)?;
                }
                Ok(())
            }
            ExprKind::Texture {
                sampler,
                coordinate,
            } => {
                write!(self.f, "texture(")?;
                self.expr(*sampler)?;
                write!(self.f, ", ")?;
                self.expr(*coordinate)?;
                write!(self.f, ")")
            }
        }
    }
}

impl fmt::Display for ShaderIr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut p = Printer { ir: self, f };
        for item in &self.items {
            match item {
                Item::Variable(var) => {
                    p.declaration(&self.vars[*var])?;
                    writeln!(p.f, ";")?;
                }
                Item::Inst(inst) => p.inst(*inst, 0)?,
                Item::Function(func) => {
                    let function = &self.funcs[*func];
                    for sig in &function.signatures {
                        write!(p.f, "{} {}(", sig.return_type, function.name)?;
                        for (i, param) in sig.params.iter().enumerate() {
                            if i > 0 {
                                write!(p.f, ", ")?;
                            }
                            p.declaration(&self.vars[*param])?;
                        }
                        if !sig.is_defined {
                            writeln!(p.f, ");")?;
                            continue;
                        }
                        writeln!(p.f, ") {{")?;
                        p.body(&sig.body, 1)?;
                        writeln!(p.f, "}}")?;
                    }
                }
            }
        }
        Ok(())
    }
}
