//! Tree traversal.
//!
//! A [`Visitor`] gets one hook per node kind. Each hook returns a
//! [`VisitStatus`] that decides whether the walk descends into the node's
//! children, skips them, or stops altogether.

use alloc::{string::String, vec::Vec};

use crate::{
    entity::{Expr, Inst, Var},
    ir::{ExprKind, InstData, Item, ShaderIr},
    types::Type,
};

/// What the walker does after a hook returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitStatus {
    /// Visit the children of this node
    Continue,
    /// Do not visit the children of this node, but continue with siblings
    SkipChildren,
    /// Abort the whole walk
    Stop,
}

/// Per-node-kind hooks. All hooks default to `Continue`.
pub trait Visitor {
    /// Called for every global variable declaration.
    fn visit_global(&mut self, _ir: &ShaderIr, _var: Var) -> VisitStatus {
        VisitStatus::Continue
    }

    /// Called for every statement, before its children.
    fn visit_inst(&mut self, _ir: &ShaderIr, _inst: Inst) -> VisitStatus {
        VisitStatus::Continue
    }

    /// Called for every expression, before its operands.
    fn visit_expr(&mut self, _ir: &ShaderIr, _expr: Expr) -> VisitStatus {
        VisitStatus::Continue
    }
}

/// Walk every item of a shader, including all function bodies.
pub fn walk_shader<V: Visitor>(ir: &ShaderIr, visitor: &mut V) -> VisitStatus {
    for item in &ir.items {
        let status = match item {
            Item::Variable(var) => visitor.visit_global(ir, *var),
            Item::Function(func) => {
                let mut status = VisitStatus::Continue;
                for sig in &ir.funcs[*func].signatures {
                    status = walk_body(ir, &sig.body, visitor);
                    if status == VisitStatus::Stop {
                        break;
                    }
                }
                status
            }
            Item::Inst(inst) => walk_inst(ir, *inst, visitor),
        };
        if status == VisitStatus::Stop {
            return VisitStatus::Stop;
        }
    }
    VisitStatus::Continue
}

/// Walk a list of statements.
pub fn walk_body<V: Visitor>(ir: &ShaderIr, body: &[Inst], visitor: &mut V) -> VisitStatus {
    for inst in body {
        if walk_inst(ir, *inst, visitor) == VisitStatus::Stop {
            return VisitStatus::Stop;
        }
    }
    VisitStatus::Continue
}

/// Walk one statement and everything below it.
pub fn walk_inst<V: Visitor>(ir: &ShaderIr, inst: Inst, visitor: &mut V) -> VisitStatus {
    match visitor.visit_inst(ir, inst) {
        VisitStatus::Stop => return VisitStatus::Stop,
        VisitStatus::SkipChildren => return VisitStatus::Continue,
        VisitStatus::Continue => {}
    }
    let data = &ir.insts[inst];
    for operand in data.operands() {
        if walk_expr(ir, operand, visitor) == VisitStatus::Stop {
            return VisitStatus::Stop;
        }
    }
    for body in data.bodies() {
        if walk_body(ir, body, visitor) == VisitStatus::Stop {
            return VisitStatus::Stop;
        }
    }
    VisitStatus::Continue
}

/// Walk one expression and its operands.
pub fn walk_expr<V: Visitor>(ir: &ShaderIr, expr: Expr, visitor: &mut V) -> VisitStatus {
    match visitor.visit_expr(ir, expr) {
        VisitStatus::Stop => return VisitStatus::Stop,
        VisitStatus::SkipChildren => return VisitStatus::Continue,
        VisitStatus::Continue => {}
    }
    match &ir.exprs[expr].kind {
        ExprKind::Constant(_) | ExprKind::Var(_) => VisitStatus::Continue,
        ExprKind::Field { record, .. } => walk_expr(ir, *record, visitor),
        ExprKind::Unary { operand, .. } => walk_expr(ir, *operand, visitor),
        ExprKind::Swizzle { value, .. } => walk_expr(ir, *value, visitor),
        ExprKind::Index { array, index } => walk_pair(ir, *array, *index, visitor),
        ExprKind::Binary { lhs, rhs, .. } => walk_pair(ir, *lhs, *rhs, visitor),
        ExprKind::Texture {
            sampler,
            coordinate,
        } => walk_pair(ir, *sampler, *coordinate, visitor),
    }
}

fn walk_pair<V: Visitor>(ir: &ShaderIr, a: Expr, b: Expr, visitor: &mut V) -> VisitStatus {
    if walk_expr(ir, a, visitor) == VisitStatus::Stop {
        return VisitStatus::Stop;
    }
    walk_expr(ir, b, visitor)
}

/// Finds whether a variable is written: as the target of an assignment, as
/// an `out`/`inout` call argument, or as a call's return value target.
struct FindAssignment<'a> {
    name: &'a str,
    found: bool,
}

impl FindAssignment<'_> {
    fn writes(&self, ir: &ShaderIr, expr: Expr) -> bool {
        ir.variable_referenced(expr)
            .is_some_and(|var| ir.vars[var].name == self.name)
    }
}

impl Visitor for FindAssignment<'_> {
    fn visit_inst(&mut self, ir: &ShaderIr, inst: Inst) -> VisitStatus {
        match &ir.insts[inst] {
            InstData::Assign { lhs, .. } => {
                self.found = self.writes(ir, *lhs);
            }
            InstData::Call {
                callee,
                args,
                result,
            } => {
                if result.is_some_and(|r| self.writes(ir, r)) {
                    self.found = true;
                } else if let Some(sig) = ir.find_signature(callee, &ir.arg_types(args)) {
                    let sig = ir.signature(sig);
                    self.found = sig.params.iter().zip(args).any(|(param, arg)| {
                        ir.vars[*param].mode.is_out_parameter() && self.writes(ir, *arg)
                    });
                }
            }
            _ => {}
        }
        if self.found {
            VisitStatus::Stop
        } else {
            VisitStatus::Continue
        }
    }
}

/// Whether any statement writes the variable called `name`.
pub fn find_assignment(ir: &ShaderIr, name: &str) -> bool {
    let mut v = FindAssignment { name, found: false };
    walk_shader(ir, &mut v);
    v.found
}

struct FindDereference<'a> {
    name: &'a str,
    found: bool,
}

impl Visitor for FindDereference<'_> {
    fn visit_expr(&mut self, ir: &ShaderIr, expr: Expr) -> VisitStatus {
        if let ExprKind::Var(var) = ir.exprs[expr].kind {
            if ir.vars[var].name == self.name {
                self.found = true;
                return VisitStatus::Stop;
            }
        }
        VisitStatus::Continue
    }
}

/// Whether any expression dereferences the variable called `name`.
pub fn find_dereference(ir: &ShaderIr, name: &str) -> bool {
    let mut v = FindDereference { name, found: false };
    walk_shader(ir, &mut v);
    v.found
}

struct FindEndPrimitive {
    found: bool,
}

impl Visitor for FindEndPrimitive {
    fn visit_inst(&mut self, ir: &ShaderIr, inst: Inst) -> VisitStatus {
        if ir.insts[inst] == InstData::EndPrimitive {
            self.found = true;
            return VisitStatus::Stop;
        }
        VisitStatus::Continue
    }

    fn visit_expr(&mut self, _ir: &ShaderIr, _expr: Expr) -> VisitStatus {
        VisitStatus::SkipChildren
    }
}

/// Whether the shader calls `EndPrimitive()`.
pub fn find_end_primitive(ir: &ShaderIr) -> bool {
    let mut v = FindEndPrimitive { found: false };
    walk_shader(ir, &mut v);
    v.found
}

/// Collects the names of all functions called anywhere below a node.
pub struct CallCollector {
    /// `(callee, argument types)` of every call, in visit order
    pub calls: Vec<(String, Vec<Type>)>,
}

impl Visitor for CallCollector {
    fn visit_inst(&mut self, ir: &ShaderIr, inst: Inst) -> VisitStatus {
        if let InstData::Call { callee, args, .. } = &ir.insts[inst] {
            self.calls.push((callee.clone(), ir.arg_types(args)));
        }
        VisitStatus::Continue
    }

    fn visit_expr(&mut self, _ir: &ShaderIr, _expr: Expr) -> VisitStatus {
        VisitStatus::SkipChildren
    }
}
