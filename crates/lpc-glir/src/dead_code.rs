//! Dead code elimination.
//!
//! Works on whole variables: a variable that is never read has its
//! declaration and its assignments removed, subject to the rules of its
//! storage mode. Removed statements stay in the arenas until the shader is
//! [compacted](crate::ShaderIr::compacted).

use alloc::{collections::BTreeSet, vec::Vec};

use hashbrown::{HashMap, HashSet};
use log::trace;

use crate::{
    entity::{Expr, Inst, Var},
    ir::{ExprKind, InstData, Item, ShaderIr, SignatureRef},
    variable::VariableMode,
    visitor::{walk_body, walk_expr, walk_shader, CallCollector, VisitStatus, Visitor},
};

#[derive(Debug, Default)]
struct VarUsage {
    declared: bool,
    reads: u32,
    assignments: Vec<Inst>,
}

#[derive(Debug, Default)]
struct RefCounter {
    usage: HashMap<Var, VarUsage>,
}

impl RefCounter {
    /// Count reads inside an assignment target, not counting the written
    /// variable itself.
    fn count_lvalue(&mut self, ir: &ShaderIr, lhs: Expr) {
        match &ir.exprs[lhs].kind {
            ExprKind::Var(_) => {}
            ExprKind::Index { array, index } => {
                self.count_lvalue(ir, *array);
                walk_expr(ir, *index, self);
            }
            ExprKind::Field { record, .. } => self.count_lvalue(ir, *record),
            ExprKind::Swizzle { value, .. } => self.count_lvalue(ir, *value),
            _ => {
                walk_expr(ir, lhs, self);
            }
        }
    }
}

impl Visitor for RefCounter {
    fn visit_global(&mut self, _ir: &ShaderIr, var: Var) -> VisitStatus {
        self.usage.entry(var).or_default().declared = true;
        VisitStatus::Continue
    }

    fn visit_inst(&mut self, ir: &ShaderIr, inst: Inst) -> VisitStatus {
        match &ir.insts[inst] {
            InstData::Declare(var) => {
                self.usage.entry(*var).or_default().declared = true;
                VisitStatus::Continue
            }
            InstData::Assign { lhs, rhs } => {
                if let Some(var) = ir.variable_referenced(*lhs) {
                    self.usage.entry(var).or_default().assignments.push(inst);
                }
                self.count_lvalue(ir, *lhs);
                walk_expr(ir, *rhs, self);
                VisitStatus::SkipChildren
            }
            _ => VisitStatus::Continue,
        }
    }

    fn visit_expr(&mut self, ir: &ShaderIr, expr: Expr) -> VisitStatus {
        if let ExprKind::Var(var) = ir.exprs[expr].kind {
            self.usage.entry(var).or_default().reads += 1;
        }
        VisitStatus::Continue
    }
}

/// Remove declarations of, and assignments to, variables that are never
/// read.
///
/// - locals, globals and temporaries lose their declaration and every
///   assignment;
/// - shader outputs are kept while anything assigns them;
/// - uniforms are kept when they belong to a uniform block, carry a
///   constant initializer, or `uniform_locations_assigned` is set;
/// - unreferenced shader inputs are removed.
///
/// Returns whether anything was removed.
pub fn do_dead_code(ir: &mut ShaderIr, uniform_locations_assigned: bool) -> bool {
    let mut counter = RefCounter::default();
    walk_shader(ir, &mut counter);

    let mut dead_vars: HashSet<Var> = HashSet::new();
    let mut dead_insts: HashSet<Inst> = HashSet::new();

    for (var, usage) in &counter.usage {
        if !usage.declared || usage.reads > 0 {
            continue;
        }
        let variable = &ir.vars[*var];
        let removable = match variable.mode {
            VariableMode::Auto | VariableMode::Temporary => true,
            VariableMode::ShaderOut => usage.assignments.is_empty(),
            VariableMode::Uniform => {
                !(uniform_locations_assigned
                    || variable.is_in_uniform_block()
                    || variable.constant_initializer.is_some())
            }
            VariableMode::ShaderIn | VariableMode::SystemValue => true,
            VariableMode::FunctionIn | VariableMode::FunctionOut | VariableMode::FunctionInOut => {
                false
            }
        };
        if removable {
            trace!("removing dead {} '{}'", variable.mode_string(), variable.name);
            dead_vars.insert(*var);
            dead_insts.extend(usage.assignments.iter().copied());
        }
    }

    if dead_vars.is_empty() {
        return false;
    }

    let is_dead = |ir: &ShaderIr, inst: Inst| match &ir.insts[inst] {
        InstData::Declare(var) => dead_vars.contains(var),
        _ => dead_insts.contains(&inst),
    };

    let mut items = core::mem::take(&mut ir.items);
    items.retain(|item| match item {
        Item::Variable(var) => !dead_vars.contains(var),
        Item::Inst(inst) => !is_dead(&*ir, *inst),
        Item::Function(_) => true,
    });
    ir.items = items;

    let funcs: Vec<_> = ir.funcs.keys().collect();
    for func in funcs {
        for index in 0..ir.funcs[func].signatures.len() {
            let body = core::mem::take(&mut ir.funcs[func].signatures[index].body);
            let body = retain_live(ir, body, &is_dead);
            ir.funcs[func].signatures[index].body = body;
        }
    }
    true
}

/// Filter a statement list and every list nested in it.
fn retain_live<F>(ir: &mut ShaderIr, body: Vec<Inst>, is_dead: &F) -> Vec<Inst>
where
    F: Fn(&ShaderIr, Inst) -> bool,
{
    let mut live = Vec::with_capacity(body.len());
    for inst in body {
        if is_dead(&*ir, inst) {
            continue;
        }
        let mut data = ir.insts[inst].clone();
        let mut changed = false;
        for nested in data.bodies_mut() {
            let before = nested.len();
            let filtered = retain_live(ir, core::mem::take(nested), is_dead);
            changed |= filtered.len() != before;
            *nested = filtered;
        }
        if changed {
            ir.insts[inst] = data;
        }
        live.push(inst);
    }
    live
}

/// Remove function overloads that `main` never calls, directly or through
/// other functions. Returns whether anything was removed.
pub fn do_dead_functions(ir: &mut ShaderIr) -> bool {
    let Some(main) = ir.main_signature() else {
        return false;
    };

    let mut reachable: BTreeSet<SignatureRef> = BTreeSet::new();
    let mut worklist = alloc::vec![main];
    while let Some(sig) = worklist.pop() {
        if !reachable.insert(sig) {
            continue;
        }
        let mut calls = CallCollector { calls: Vec::new() };
        walk_body(ir, &ir.signature(sig).body, &mut calls);
        for (callee, args) in calls.calls {
            if let Some(target) = ir.find_signature(&callee, &args) {
                worklist.push(target);
            }
        }
    }

    let mut progress = false;
    let funcs: Vec<_> = ir.functions().collect();
    for func in funcs {
        let function = &mut ir.funcs[func];
        let mut index = 0;
        function.signatures.retain(|_| {
            let keep = reachable.contains(&(func, index));
            index += 1;
            keep
        });
        if function.signatures.len() != index {
            trace!("removed unused overloads of '{}'", function.name);
            progress = true;
        }
    }

    let before = ir.items.len();
    let funcs = &ir.funcs;
    ir.items.retain(|item| match item {
        Item::Function(func) => !funcs[*func].signatures.is_empty(),
        _ => true,
    });
    progress | (ir.items.len() != before)
}

/// Run the dead code passes until neither makes progress.
///
/// Returns whether anything changed.
pub fn do_common_optimization(ir: &mut ShaderIr, uniform_locations_assigned: bool) -> bool {
    let mut any = false;
    loop {
        let mut progress = do_dead_functions(ir);
        progress |= do_dead_code(ir, uniform_locations_assigned);
        if !progress {
            return any;
        }
        any = true;
    }
}
