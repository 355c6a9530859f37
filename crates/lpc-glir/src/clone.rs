//! Deep copy of IR trees between shaders.
//!
//! Statements and expressions are copied node by node into the destination
//! arenas. Variables are resolved through a [`VarRemap`], which decides
//! whether a referenced variable is cloned, shared, or looked up by name.

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::{
    entity::{Expr, Inst, Var},
    ir::{ExprKind, Function, FunctionSignature, InstData, Item, ShaderIr},
};

/// Maps variables of a source shader onto variables of a destination shader.
pub trait VarRemap {
    /// Map a variable declared inside the copied tree (a local or a parameter).
    fn declare(&mut self, src: &ShaderIr, var: Var, dst: &mut ShaderIr) -> Var;

    /// Map a reference to a variable.
    fn reference(&mut self, src: &ShaderIr, var: Var, dst: &mut ShaderIr) -> Var;
}

/// Scratch identity map from source to destination variables.
///
/// Declared variables are cloned into the destination. A reference to a
/// variable the map has not seen is cloned too, without a declaration.
#[derive(Debug, Default)]
pub struct ScratchRemap {
    map: HashMap<Var, Var>,
}

impl ScratchRemap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `src` is represented by `dst`.
    pub fn insert(&mut self, src: Var, dst: Var) {
        self.map.insert(src, dst);
    }

    /// The destination variable for `src`, if known.
    pub fn get(&self, src: Var) -> Option<Var> {
        self.map.get(&src).copied()
    }
}

impl VarRemap for ScratchRemap {
    fn declare(&mut self, src: &ShaderIr, var: Var, dst: &mut ShaderIr) -> Var {
        let new = dst.push_var(src.vars[var].clone());
        self.map.insert(var, new);
        new
    }

    fn reference(&mut self, src: &ShaderIr, var: Var, dst: &mut ShaderIr) -> Var {
        match self.map.get(&var) {
            Some(new) => *new,
            None => self.declare(src, var, dst),
        }
    }
}

/// Copy an expression tree into `dst`.
pub fn clone_expr_into<R: VarRemap>(
    src: &ShaderIr,
    expr: Expr,
    dst: &mut ShaderIr,
    remap: &mut R,
) -> Expr {
    let data = &src.exprs[expr];
    let kind = match &data.kind {
        ExprKind::Constant(c) => ExprKind::Constant(c.clone()),
        ExprKind::Var(var) => ExprKind::Var(remap.reference(src, *var, dst)),
        ExprKind::Index { array, index } => ExprKind::Index {
            array: clone_expr_into(src, *array, dst, remap),
            index: clone_expr_into(src, *index, dst, remap),
        },
        ExprKind::Field { record, field } => ExprKind::Field {
            record: clone_expr_into(src, *record, dst, remap),
            field: field.clone(),
        },
        ExprKind::Unary { op, operand } => ExprKind::Unary {
            op: *op,
            operand: clone_expr_into(src, *operand, dst, remap),
        },
        ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
            op: *op,
            lhs: clone_expr_into(src, *lhs, dst, remap),
            rhs: clone_expr_into(src, *rhs, dst, remap),
        },
        ExprKind::Swizzle { value, components } => ExprKind::Swizzle {
            value: clone_expr_into(src, *value, dst, remap),
            components: components.clone(),
        },
        ExprKind::Texture {
            sampler,
            coordinate,
        } => ExprKind::Texture {
            sampler: clone_expr_into(src, *sampler, dst, remap),
            coordinate: clone_expr_into(src, *coordinate, dst, remap),
        },
    };
    dst.push_expr(data.ty.clone(), kind)
}

/// Copy a statement tree into `dst`.
pub fn clone_inst_into<R: VarRemap>(
    src: &ShaderIr,
    inst: Inst,
    dst: &mut ShaderIr,
    remap: &mut R,
) -> Inst {
    let data = match &src.insts[inst] {
        InstData::Declare(var) => InstData::Declare(remap.declare(src, *var, dst)),
        InstData::Assign { lhs, rhs } => {
            let rhs = clone_expr_into(src, *rhs, dst, remap);
            let lhs = clone_expr_into(src, *lhs, dst, remap);
            InstData::Assign { lhs, rhs }
        }
        InstData::Call {
            callee,
            args,
            result,
        } => InstData::Call {
            callee: callee.clone(),
            args: args
                .iter()
                .map(|arg| clone_expr_into(src, *arg, dst, remap))
                .collect(),
            result: result.map(|r| clone_expr_into(src, r, dst, remap)),
        },
        InstData::If {
            condition,
            then_body,
            else_body,
        } => InstData::If {
            condition: clone_expr_into(src, *condition, dst, remap),
            then_body: clone_body_into(src, then_body, dst, remap),
            else_body: clone_body_into(src, else_body, dst, remap),
        },
        InstData::Loop { body } => InstData::Loop {
            body: clone_body_into(src, body, dst, remap),
        },
        InstData::Return(value) => {
            InstData::Return(value.map(|v| clone_expr_into(src, v, dst, remap)))
        }
        InstData::Break => InstData::Break,
        InstData::Continue => InstData::Continue,
        InstData::Discard => InstData::Discard,
        InstData::EmitVertex => InstData::EmitVertex,
        InstData::EndPrimitive => InstData::EndPrimitive,
    };
    dst.push_inst(data)
}

/// Copy a list of statements into `dst`.
pub fn clone_body_into<R: VarRemap>(
    src: &ShaderIr,
    body: &[Inst],
    dst: &mut ShaderIr,
    remap: &mut R,
) -> Vec<Inst> {
    body.iter()
        .map(|inst| clone_inst_into(src, *inst, dst, remap))
        .collect()
}

/// Copy a function overload into `dst`; parameters are declared through
/// the remap.
pub fn clone_signature_into<R: VarRemap>(
    src: &ShaderIr,
    sig: &FunctionSignature,
    dst: &mut ShaderIr,
    remap: &mut R,
) -> FunctionSignature {
    let params = sig
        .params
        .iter()
        .map(|p| remap.declare(src, *p, dst))
        .collect();
    FunctionSignature {
        return_type: sig.return_type.clone(),
        params,
        body: clone_body_into(src, &sig.body, dst, remap),
        is_defined: sig.is_defined,
        is_builtin: sig.is_builtin,
    }
}

impl ShaderIr {
    /// Rebuild the arenas keeping only nodes reachable from the items.
    ///
    /// Passes that remove statements leave their nodes behind in the
    /// arenas; compaction drops them.
    pub fn compacted(&self) -> ShaderIr {
        let mut dst = ShaderIr::new();
        let mut remap = ScratchRemap::new();

        // Globals first, so references from earlier functions resolve.
        let placed: Vec<Option<Var>> = self
            .items
            .iter()
            .map(|item| match item {
                Item::Variable(var) => {
                    let new = dst.push_var(self.vars[*var].clone());
                    remap.insert(*var, new);
                    Some(new)
                }
                _ => None,
            })
            .collect();

        for (item, global) in self.items.iter().zip(placed) {
            let new_item = match (item, global) {
                (_, Some(var)) => Item::Variable(var),
                (Item::Function(func), None) => {
                    let function = &self.funcs[*func];
                    let signatures = function
                        .signatures
                        .iter()
                        .map(|sig| clone_signature_into(self, sig, &mut dst, &mut remap))
                        .collect();
                    Item::Function(dst.funcs.push(Function {
                        name: function.name.clone(),
                        signatures,
                    }))
                }
                (Item::Inst(inst), None) => {
                    Item::Inst(clone_inst_into(self, *inst, &mut dst, &mut remap))
                }
                (Item::Variable(var), None) => {
                    Item::Variable(remap.reference(self, *var, &mut dst))
                }
            };
            dst.items.push(new_item);
        }
        dst
    }
}
