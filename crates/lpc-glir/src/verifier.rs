//! IR verifier.
//!
//! Checks that a shader is well formed: handles are valid, every variable
//! reference is in scope, dereference types agree with their operands, and
//! every call resolves to a defined overload.

use alloc::{
    collections::BTreeSet,
    format,
    string::{String, ToString},
    vec::Vec,
};

use crate::{
    entity::{Expr, Inst, Var},
    ir::{ExprKind, FunctionSignature, InstData, Item, ShaderIr},
};

/// Verifier error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierError {
    /// Error message describing what's wrong
    pub message: String,
    /// Optional location information (e.g., "inst5", "expr3")
    pub location: Option<String>,
}

impl VerifierError {
    /// Create a new verifier error
    pub fn new(message: String) -> Self {
        Self {
            message,
            location: None,
        }
    }

    /// Create a new verifier error with location
    pub fn with_location(message: String, location: String) -> Self {
        Self {
            message,
            location: Some(location),
        }
    }
}

impl core::fmt::Display for VerifierError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Verify a shader is well-formed
///
/// Returns `Ok(())` if the shader is valid, or `Err(errors)` with every
/// problem found.
pub fn verify(ir: &ShaderIr) -> Result<(), Vec<VerifierError>> {
    let mut verifier = Verifier {
        ir,
        errors: Vec::new(),
        globals: ir.global_vars().collect(),
        scopes: Vec::new(),
    };
    verifier.verify_items();

    if verifier.errors.is_empty() {
        Ok(())
    } else {
        Err(verifier.errors)
    }
}

struct Verifier<'a> {
    ir: &'a ShaderIr,
    errors: Vec<VerifierError>,
    globals: BTreeSet<Var>,
    scopes: Vec<BTreeSet<Var>>,
}

impl Verifier<'_> {
    fn error(&mut self, message: String, location: String) {
        self.errors.push(VerifierError::with_location(message, location));
    }

    fn verify_items(&mut self) {
        let ir = self.ir;
        let mut names = BTreeSet::new();
        for item in &ir.items {
            match item {
                Item::Variable(var) => {
                    if !ir.vars.is_valid(*var) {
                        self.errors
                            .push(VerifierError::new(format!("{} does not exist", var)));
                    }
                }
                Item::Function(func) => {
                    let Some(function) = ir.funcs.get(*func) else {
                        self.errors
                            .push(VerifierError::new(format!("{} does not exist", func)));
                        continue;
                    };
                    if !names.insert(function.name.as_str()) {
                        self.errors.push(VerifierError::new(format!(
                            "function '{}' is listed more than once",
                            function.name
                        )));
                    }
                    for sig in &function.signatures {
                        self.verify_signature(&function.name, sig);
                    }
                }
                Item::Inst(inst) => {
                    self.scopes.push(BTreeSet::new());
                    self.verify_inst(*inst);
                    self.scopes.pop();
                }
            }
        }
    }

    fn verify_signature(&mut self, name: &str, sig: &FunctionSignature) {
        if !sig.is_defined && !sig.body.is_empty() {
            self.errors.push(VerifierError::new(format!(
                "prototype of '{}' has a body",
                name
            )));
        }
        self.scopes.push(sig.params.iter().copied().collect());
        self.verify_body(&sig.body);
        self.scopes.pop();
    }

    fn verify_body(&mut self, body: &[Inst]) {
        self.scopes.push(BTreeSet::new());
        for inst in body {
            self.verify_inst(*inst);
        }
        self.scopes.pop();
    }

    fn verify_inst(&mut self, inst: Inst) {
        let ir = self.ir;
        let Some(data) = ir.insts.get(inst) else {
            self.errors
                .push(VerifierError::new(format!("{} does not exist", inst)));
            return;
        };
        let location = inst.to_string();
        match data {
            InstData::Declare(var) => {
                if !ir.vars.is_valid(*var) {
                    self.error(format!("declares missing {}", var), location);
                } else if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(*var);
                }
            }
            InstData::Assign { lhs, rhs } => {
                self.verify_expr(*lhs);
                self.verify_expr(*rhs);
                if ir.exprs.is_valid(*lhs) && ir.variable_referenced(*lhs).is_none() {
                    self.error(
                        "assignment target is not a dereference".to_string(),
                        location.clone(),
                    );
                }
                if let (Some(l), Some(r)) = (ir.exprs.get(*lhs), ir.exprs.get(*rhs)) {
                    if l.ty != r.ty {
                        self.error(
                            format!("assigning {} to {}", r.ty, l.ty),
                            location,
                        );
                    }
                }
            }
            InstData::Call {
                callee,
                args,
                result,
            } => {
                for arg in args {
                    self.verify_expr(*arg);
                }
                if let Some(result) = result {
                    self.verify_expr(*result);
                }
                if args.iter().all(|a| ir.exprs.is_valid(*a))
                    && ir
                        .find_defined_signature(callee, &ir.arg_types(args))
                        .is_none()
                {
                    self.error(
                        format!("call to undefined function '{}'", callee),
                        location,
                    );
                }
            }
            InstData::If {
                condition,
                then_body,
                else_body,
            } => {
                self.verify_expr(*condition);
                self.verify_body(then_body);
                self.verify_body(else_body);
            }
            InstData::Loop { body } => self.verify_body(body),
            InstData::Return(Some(value)) => self.verify_expr(*value),
            InstData::Return(None)
            | InstData::Break
            | InstData::Continue
            | InstData::Discard
            | InstData::EmitVertex
            | InstData::EndPrimitive => {}
        }
    }

    fn in_scope(&self, var: Var) -> bool {
        self.globals.contains(&var) || self.scopes.iter().any(|s| s.contains(&var))
    }

    fn verify_expr(&mut self, expr: Expr) {
        let ir = self.ir;
        let Some(data) = ir.exprs.get(expr) else {
            self.errors
                .push(VerifierError::new(format!("{} does not exist", expr)));
            return;
        };
        let location = expr.to_string();
        match &data.kind {
            ExprKind::Constant(c) => {
                if c.ty != data.ty {
                    self.error(
                        format!("constant of type {} used as {}", c.ty, data.ty),
                        location,
                    );
                }
            }
            ExprKind::Var(var) => {
                let Some(variable) = ir.vars.get(*var) else {
                    self.error(format!("references missing {}", var), location);
                    return;
                };
                if !self.in_scope(*var) {
                    self.error(
                        format!("'{}' referenced out of scope", variable.name),
                        location.clone(),
                    );
                }
                if variable.ty != data.ty {
                    self.error(
                        format!(
                            "dereference of '{}' has type {}, variable has type {}",
                            variable.name, data.ty, variable.ty
                        ),
                        location,
                    );
                }
            }
            ExprKind::Index { array, index } => {
                self.verify_expr(*array);
                self.verify_expr(*index);
                if let Some(array_data) = ir.exprs.get(*array) {
                    match array_data.ty.index_result() {
                        Some(ty) if ty == data.ty => {}
                        Some(ty) => self.error(
                            format!("indexing {} yields {}, not {}", array_data.ty, ty, data.ty),
                            location,
                        ),
                        None => self.error(
                            format!("cannot index a value of type {}", array_data.ty),
                            location,
                        ),
                    }
                }
            }
            ExprKind::Field { record, field } => {
                self.verify_expr(*record);
                if let Some(record_data) = ir.exprs.get(*record) {
                    match record_data.ty.field_type(field) {
                        Some(ty) if *ty == data.ty => {}
                        Some(ty) => self.error(
                            format!("field '{}' has type {}, not {}", field, ty, data.ty),
                            location,
                        ),
                        None => self.error(
                            format!("type {} has no field '{}'", record_data.ty, field),
                            location,
                        ),
                    }
                }
            }
            ExprKind::Unary { operand, .. } => self.verify_expr(*operand),
            ExprKind::Swizzle { value, .. } => self.verify_expr(*value),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.verify_expr(*lhs);
                self.verify_expr(*rhs);
            }
            ExprKind::Texture {
                sampler,
                coordinate,
            } => {
                self.verify_expr(*sampler);
                self.verify_expr(*coordinate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::{
        builder::ShaderBuilder,
        types::Type,
        variable::{Variable, VariableMode},
    };

    #[test]
    fn test_valid_shader() {
        let mut b = ShaderBuilder::new();
        let out = b.global(Variable::new("o", Type::FLOAT, VariableMode::ShaderOut));
        let t = b.local(Variable::new("t", Type::FLOAT, VariableMode::Temporary));
        let decl = b.declare(t);
        let one = b.float(1.0);
        let init = b.assign_var(t, one);
        let read = b.var_ref(t);
        let store = b.assign_var(out, read);
        b.define_function("main", Type::Void, vec![], vec![decl, init, store]);

        assert_eq!(verify(&b.finish()), Ok(()));
    }

    #[test]
    fn test_undefined_call() {
        let mut b = ShaderBuilder::new();
        b.prototype("helper", Type::Void, vec![]);
        let call = b.call("helper", vec![], None);
        b.define_function("main", Type::Void, vec![], vec![call]);

        let errors = verify(&b.finish()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "call to undefined function 'helper'");
    }

    #[test]
    fn test_out_of_scope_local() {
        let mut b = ShaderBuilder::new();
        let out = b.global(Variable::new("o", Type::FLOAT, VariableMode::ShaderOut));
        let t = b.local(Variable::new("t", Type::FLOAT, VariableMode::Auto));
        let read = b.var_ref(t);
        let store = b.assign_var(out, read);
        b.define_function("main", Type::Void, vec![], vec![store]);

        let errors = verify(&b.finish()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.message == "'t' referenced out of scope"));
    }

    #[test]
    fn test_stale_deref_type() {
        let mut b = ShaderBuilder::new();
        let a = b.global(Variable::new(
            "a",
            Type::unsized_array(Type::FLOAT),
            VariableMode::Uniform,
        ));
        let out = b.global(Variable::new("o", Type::FLOAT, VariableMode::ShaderOut));
        let deref = b.var_ref(a);
        let elem = b.index_const(deref, 1);
        let store = b.assign_var(out, elem);
        b.define_function("main", Type::Void, vec![], vec![store]);
        let mut ir = b.finish();

        ir.vars[a].ty = Type::array(Type::FLOAT, 2);
        assert!(verify(&ir).is_err());
        ir.refresh_deref_types();
        assert_eq!(verify(&ir), Ok(()));
    }

    #[test]
    fn test_error_display() {
        let e = VerifierError::with_location("bad".to_string(), "inst3".to_string());
        assert_eq!(e.to_string(), "inst3: bad");
    }
}
