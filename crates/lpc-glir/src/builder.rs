//! Shader builder.
//!
//! Builds a [`ShaderIr`] the way a front end would: every dereference marks
//! its variable as used, and constant array indices are recorded in the
//! variable's `max_array_access` (or in `max_ifc_array_access` for members
//! of a named interface block instance).

use alloc::{string::String, vec::Vec};

use crate::{
    constant::Constant,
    entity::{Expr, Func, Inst, Var},
    ir::{BinaryOp, ExprKind, FunctionSignature, InstData, Item, ShaderIr, UnaryOp},
    types::Type,
    variable::Variable,
};

/// Builder for shader IR.
#[derive(Debug, Default)]
pub struct ShaderBuilder {
    ir: ShaderIr,
}

impl ShaderBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish building and return the shader.
    pub fn finish(self) -> ShaderIr {
        self.ir
    }

    /// Access the shader under construction.
    pub fn ir(&self) -> &ShaderIr {
        &self.ir
    }

    // Declarations

    /// Declare a global variable.
    pub fn global(&mut self, variable: Variable) -> Var {
        self.ir.add_global(variable)
    }

    /// Allocate a local variable; declare it with [`declare`](Self::declare).
    pub fn local(&mut self, variable: Variable) -> Var {
        self.ir.push_var(variable)
    }

    /// Allocate a function parameter.
    pub fn param(&mut self, variable: Variable) -> Var {
        self.ir.push_var(variable)
    }

    /// Add a statement outside any function (a global initializer).
    pub fn top_level(&mut self, inst: Inst) {
        self.ir.items.push(Item::Inst(inst));
    }

    /// Define a function overload with a body.
    pub fn define_function(
        &mut self,
        name: &str,
        return_type: Type,
        params: Vec<Var>,
        body: Vec<Inst>,
    ) -> Func {
        self.add_signature(name, return_type, params, body, true, false)
    }

    /// Declare a function prototype without a body.
    pub fn prototype(&mut self, name: &str, return_type: Type, params: Vec<Var>) -> Func {
        self.add_signature(name, return_type, params, Vec::new(), false, false)
    }

    /// Define a built-in library function.
    pub fn define_builtin(
        &mut self,
        name: &str,
        return_type: Type,
        params: Vec<Var>,
        body: Vec<Inst>,
    ) -> Func {
        self.add_signature(name, return_type, params, body, true, true)
    }

    fn add_signature(
        &mut self,
        name: &str,
        return_type: Type,
        params: Vec<Var>,
        body: Vec<Inst>,
        is_defined: bool,
        is_builtin: bool,
    ) -> Func {
        let sig = FunctionSignature {
            return_type,
            params,
            body,
            is_defined,
            is_builtin,
        };
        self.ir.add_signature(name, sig).0
    }

    // Statements

    /// `declare var`
    pub fn declare(&mut self, var: Var) -> Inst {
        self.ir.push_inst(InstData::Declare(var))
    }

    /// `lhs = rhs`
    pub fn assign(&mut self, lhs: Expr, rhs: Expr) -> Inst {
        self.ir.push_inst(InstData::Assign { lhs, rhs })
    }

    /// `var = rhs`
    pub fn assign_var(&mut self, var: Var, rhs: Expr) -> Inst {
        let lhs = self.var_ref(var);
        self.assign(lhs, rhs)
    }

    /// Call `callee` with `args`, storing the return value in `result`.
    pub fn call(&mut self, callee: &str, args: Vec<Expr>, result: Option<Expr>) -> Inst {
        self.ir.push_inst(InstData::Call {
            callee: String::from(callee),
            args,
            result,
        })
    }

    /// `if (condition) { then_body } else { else_body }`
    pub fn if_(&mut self, condition: Expr, then_body: Vec<Inst>, else_body: Vec<Inst>) -> Inst {
        self.ir.push_inst(InstData::If {
            condition,
            then_body,
            else_body,
        })
    }

    /// `loop { body }`
    pub fn loop_(&mut self, body: Vec<Inst>) -> Inst {
        self.ir.push_inst(InstData::Loop { body })
    }

    /// `break`
    pub fn break_(&mut self) -> Inst {
        self.ir.push_inst(InstData::Break)
    }

    /// `return value`
    pub fn return_(&mut self, value: Option<Expr>) -> Inst {
        self.ir.push_inst(InstData::Return(value))
    }

    /// `discard`
    pub fn discard(&mut self) -> Inst {
        self.ir.push_inst(InstData::Discard)
    }

    /// `EmitVertex()`
    pub fn emit_vertex(&mut self) -> Inst {
        self.ir.push_inst(InstData::EmitVertex)
    }

    /// `EndPrimitive()`
    pub fn end_primitive(&mut self) -> Inst {
        self.ir.push_inst(InstData::EndPrimitive)
    }

    // Expressions

    /// Literal constant.
    pub fn constant(&mut self, value: Constant) -> Expr {
        let ty = value.ty.clone();
        self.ir.push_expr(ty, ExprKind::Constant(value))
    }

    /// `int` literal.
    pub fn int(&mut self, value: i32) -> Expr {
        self.constant(Constant::int(value))
    }

    /// `float` literal.
    pub fn float(&mut self, value: f32) -> Expr {
        self.constant(Constant::float(value))
    }

    /// Dereference a whole variable.
    pub fn var_ref(&mut self, var: Var) -> Expr {
        let variable = &mut self.ir.vars[var];
        variable.used = true;
        let ty = variable.ty.clone();
        self.ir.push_expr(ty, ExprKind::Var(var))
    }

    /// `array[index]`
    ///
    /// A non-constant index into a sized array counts as an access to its
    /// last element.
    pub fn index(&mut self, array: Expr, index: Expr) -> Expr {
        let array_ty = &self.ir.exprs[array].ty;
        let ty = array_ty.index_result().unwrap_or(Type::Void);
        let last = array_ty.array_length().filter(|&n| n > 0).map(|n| n - 1);
        if let Some(value) = self.constant_index(index) {
            self.record_access(array, value);
        } else if let Some(last) = last {
            self.record_access(array, last);
        }
        self.ir.push_expr(ty, ExprKind::Index { array, index })
    }

    /// `array[value]` with a constant index.
    pub fn index_const(&mut self, array: Expr, value: i32) -> Expr {
        let index = self.int(value);
        self.index(array, index)
    }

    /// `record.field`
    pub fn field(&mut self, record: Expr, field: &str) -> Expr {
        let ty = self.ir.exprs[record]
            .ty
            .field_type(field)
            .cloned()
            .unwrap_or(Type::Void);
        self.ir.push_expr(
            ty,
            ExprKind::Field {
                record,
                field: String::from(field),
            },
        )
    }

    /// Unary operation; the result has the operand's type.
    pub fn unary(&mut self, op: UnaryOp, operand: Expr) -> Expr {
        let ty = self.ir.exprs[operand].ty.clone();
        self.ir.push_expr(ty, ExprKind::Unary { op, operand })
    }

    /// Binary operation producing a value of type `ty`.
    pub fn binary(&mut self, op: BinaryOp, ty: Type, lhs: Expr, rhs: Expr) -> Expr {
        self.ir.push_expr(ty, ExprKind::Binary { op, lhs, rhs })
    }

    /// `value.xyzw` style component selection.
    pub fn swizzle(&mut self, value: Expr, components: &[u8]) -> Expr {
        let base = self.ir.exprs[value]
            .ty
            .base_type()
            .unwrap_or(crate::types::ScalarType::Float);
        let ty = if components.len() == 1 {
            Type::Scalar(base)
        } else {
            Type::Vector {
                base,
                size: components.len() as u8,
            }
        };
        self.ir.push_expr(
            ty,
            ExprKind::Swizzle {
                value,
                components: components.to_vec(),
            },
        )
    }

    /// `texture(sampler, coordinate)`
    pub fn texture(&mut self, sampler: Expr, coordinate: Expr) -> Expr {
        self.ir
            .push_expr(Type::vec(4), ExprKind::Texture { sampler, coordinate })
    }

    fn constant_index(&self, index: Expr) -> Option<u32> {
        match &self.ir.exprs[index].kind {
            ExprKind::Constant(c) => c.as_index().and_then(|i| u32::try_from(i).ok()),
            _ => None,
        }
    }

    fn record_access(&mut self, array: Expr, value: u32) {
        match &self.ir.exprs[array].kind {
            ExprKind::Var(var) => {
                let var = *var;
                self.ir.vars[var].record_array_access(value);
            }
            ExprKind::Field { record, field } => {
                let ExprKind::Var(var) = self.ir.exprs[*record].kind else {
                    return;
                };
                let field = field.clone();
                let variable = &mut self.ir.vars[var];
                let Some(slot) = variable
                    .interface_type
                    .as_ref()
                    .and_then(|ifc| ifc.field_index(&field))
                else {
                    return;
                };
                if let Some(max) = variable.max_ifc_array_access.get_mut(slot) {
                    *max = (*max).max(value);
                }
            }
            _ => {}
        }
    }
}
