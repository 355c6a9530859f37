//! Shader IR: arenas, statements and expressions.

use alloc::{string::String, vec::Vec};

use crate::{
    constant::Constant,
    entity::{Expr, Func, Inst, Var},
    entity_map::PrimaryMap,
    types::Type,
    variable::{Variable, VariableMode},
};

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation
    Neg,
    /// Logical not
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Less,
    Greater,
    Equal,
    NotEqual,
    LogicAnd,
    LogicOr,
}

impl BinaryOp {
    /// Operator as written in GLSL.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LogicAnd => "&&",
            BinaryOp::LogicOr => "||",
        }
    }
}

/// What an expression computes.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal value
    Constant(Constant),
    /// Whole-variable dereference
    Var(Var),
    /// Array dereference `array[index]`
    Index {
        /// Dereferenced value
        array: Expr,
        /// Index expression
        index: Expr,
    },
    /// Record dereference `record.field`
    Field {
        /// Dereferenced structure or block instance
        record: Expr,
        /// Member name
        field: String,
    },
    /// Unary operation
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Expr,
    },
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Expr,
        /// Right operand
        rhs: Expr,
    },
    /// Component selection `value.xyz`
    Swizzle {
        /// Vector operand
        value: Expr,
        /// Selected component indices
        components: Vec<u8>,
    },
    /// Texture lookup
    Texture {
        /// Sampler operand
        sampler: Expr,
        /// Coordinate operand
        coordinate: Expr,
    },
}

/// An expression: a type and what computes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprData {
    /// Result type
    pub ty: Type,
    /// Operation
    pub kind: ExprKind,
}

/// Statement data.
#[derive(Debug, Clone, PartialEq)]
pub enum InstData {
    /// Declaration of a local variable
    Declare(Var),
    /// `lhs = rhs`
    Assign {
        /// Assigned location (a dereference)
        lhs: Expr,
        /// Value
        rhs: Expr,
    },
    /// Function call, optionally storing the return value in `result`
    Call {
        /// Callee name; the overload is chosen by argument types
        callee: String,
        /// Actual parameters
        args: Vec<Expr>,
        /// Dereference receiving the return value
        result: Option<Expr>,
    },
    /// Conditional
    If {
        /// Condition
        condition: Expr,
        /// Statements run when the condition holds
        then_body: Vec<Inst>,
        /// Statements run otherwise
        else_body: Vec<Inst>,
    },
    /// Infinite loop, left with `Break` or `Return`
    Loop {
        /// Loop body
        body: Vec<Inst>,
    },
    Break,
    Continue,
    /// Return from the current function
    Return(Option<Expr>),
    /// Fragment `discard`
    Discard,
    /// Geometry `EmitVertex()`
    EmitVertex,
    /// Geometry `EndPrimitive()`
    EndPrimitive,
}

impl InstData {
    /// Expressions used directly by this statement.
    pub fn operands(&self) -> Vec<Expr> {
        match self {
            InstData::Assign { lhs, rhs } => alloc::vec![*lhs, *rhs],
            InstData::Call { args, result, .. } => {
                let mut ops = args.clone();
                ops.extend(result.iter().copied());
                ops
            }
            InstData::If { condition, .. } => alloc::vec![*condition],
            InstData::Return(Some(value)) => alloc::vec![*value],
            _ => Vec::new(),
        }
    }

    /// Nested statement lists.
    pub fn bodies(&self) -> Vec<&Vec<Inst>> {
        match self {
            InstData::If {
                then_body,
                else_body,
                ..
            } => alloc::vec![then_body, else_body],
            InstData::Loop { body } => alloc::vec![body],
            _ => Vec::new(),
        }
    }

    /// Nested statement lists, mutably.
    pub fn bodies_mut(&mut self) -> Vec<&mut Vec<Inst>> {
        match self {
            InstData::If {
                then_body,
                else_body,
                ..
            } => alloc::vec![then_body, else_body],
            InstData::Loop { body } => alloc::vec![body],
            _ => Vec::new(),
        }
    }
}

/// One overload of a function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    /// Return type
    pub return_type: Type,
    /// Parameter variables, in order
    pub params: Vec<Var>,
    /// Body statements
    pub body: Vec<Inst>,
    /// A body was given (false for prototypes)
    pub is_defined: bool,
    /// Provided by the built-in function library
    pub is_builtin: bool,
}

/// A function: all overloads sharing one name.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Overloads in declaration order
    pub signatures: Vec<FunctionSignature>,
}

/// A top-level entry of a shader, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Item {
    /// Global variable declaration
    Variable(Var),
    /// Function (all its overloads)
    Function(Func),
    /// Statement outside any function (global initializers)
    Inst(Inst),
}

/// Location of a function overload: the function and the signature index.
pub type SignatureRef = (Func, usize);

/// The IR of one shader.
///
/// All nodes live in arenas owned by the shader. Operands are allocated
/// before the expressions using them, so arena order is a valid post-order.
#[derive(Debug, Clone, Default)]
pub struct ShaderIr {
    /// Variable arena
    pub vars: PrimaryMap<Var, Variable>,
    /// Function arena
    pub funcs: PrimaryMap<Func, Function>,
    /// Statement arena
    pub insts: PrimaryMap<Inst, InstData>,
    /// Expression arena
    pub exprs: PrimaryMap<Expr, ExprData>,
    /// Top-level items in declaration order
    pub items: Vec<Item>,
}

impl ShaderIr {
    /// Create an empty shader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Global variables in declaration order.
    pub fn global_vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.items.iter().filter_map(|item| match item {
            Item::Variable(var) => Some(*var),
            _ => None,
        })
    }

    /// Functions in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = Func> + '_ {
        self.items.iter().filter_map(|item| match item {
            Item::Function(func) => Some(*func),
            _ => None,
        })
    }

    /// Look up a global variable by name.
    pub fn global_var(&self, name: &str) -> Option<Var> {
        self.global_vars().find(|var| self.vars[*var].name == name)
    }

    /// Look up a function by name.
    pub fn function(&self, name: &str) -> Option<Func> {
        self.functions().find(|func| self.funcs[*func].name == name)
    }

    /// Parameter types of a signature.
    pub fn param_types(&self, sig: &FunctionSignature) -> Vec<Type> {
        sig.params.iter().map(|p| self.vars[*p].ty.clone()).collect()
    }

    /// Find the overload of `name` whose parameter types are exactly `args`.
    pub fn find_signature(&self, name: &str, args: &[Type]) -> Option<SignatureRef> {
        let func = self.function(name)?;
        self.funcs[func]
            .signatures
            .iter()
            .position(|sig| {
                sig.params.len() == args.len()
                    && sig
                        .params
                        .iter()
                        .zip(args)
                        .all(|(p, ty)| self.vars[*p].ty == *ty)
            })
            .map(|index| (func, index))
    }

    /// Like [`find_signature`](Self::find_signature), but only matches
    /// overloads that have a body.
    pub fn find_defined_signature(&self, name: &str, args: &[Type]) -> Option<SignatureRef> {
        self.find_signature(name, args)
            .filter(|(func, index)| self.funcs[*func].signatures[*index].is_defined)
    }

    /// Get a signature by reference.
    pub fn signature(&self, sig: SignatureRef) -> &FunctionSignature {
        &self.funcs[sig.0].signatures[sig.1]
    }

    /// Get a signature by reference, mutably.
    pub fn signature_mut(&mut self, sig: SignatureRef) -> &mut FunctionSignature {
        &mut self.funcs[sig.0].signatures[sig.1]
    }

    /// The defined `void main()` signature, if any.
    pub fn main_signature(&self) -> Option<SignatureRef> {
        self.find_defined_signature("main", &[])
    }

    /// Argument types of a call, as used for overload resolution.
    pub fn arg_types(&self, args: &[Expr]) -> Vec<Type> {
        args.iter().map(|a| self.exprs[*a].ty.clone()).collect()
    }

    /// The variable a dereference chain ends in, if the expression is a
    /// dereference (or a swizzle of one).
    pub fn variable_referenced(&self, expr: Expr) -> Option<Var> {
        match &self.exprs[expr].kind {
            ExprKind::Var(var) => Some(*var),
            ExprKind::Index { array, .. } => self.variable_referenced(*array),
            ExprKind::Field { record, .. } => self.variable_referenced(*record),
            ExprKind::Swizzle { value, .. } => self.variable_referenced(*value),
            _ => None,
        }
    }

    /// Allocate a variable without declaring it anywhere.
    pub fn push_var(&mut self, variable: Variable) -> Var {
        self.vars.push(variable)
    }

    /// Allocate an expression.
    pub fn push_expr(&mut self, ty: Type, kind: ExprKind) -> Expr {
        self.exprs.push(ExprData { ty, kind })
    }

    /// Allocate a statement.
    pub fn push_inst(&mut self, data: InstData) -> Inst {
        self.insts.push(data)
    }

    /// Allocate a global variable and append its declaration.
    pub fn add_global(&mut self, variable: Variable) -> Var {
        let var = self.vars.push(variable);
        self.items.push(Item::Variable(var));
        var
    }

    /// Add a signature to the function `name`, creating the function if
    /// needed.
    pub fn add_signature(&mut self, name: &str, sig: FunctionSignature) -> SignatureRef {
        let func = match self.function(name) {
            Some(func) => func,
            None => {
                let func = self.funcs.push(Function {
                    name: String::from(name),
                    signatures: Vec::new(),
                });
                self.items.push(Item::Function(func));
                func
            }
        };
        let signatures = &mut self.funcs[func].signatures;
        signatures.push(sig);
        (func, signatures.len() - 1)
    }

    /// Global variables with the given mode, in declaration order.
    pub fn globals_with_mode(&self, mode: VariableMode) -> Vec<Var> {
        self.global_vars()
            .filter(|var| self.vars[*var].mode == mode)
            .collect()
    }

    /// Recompute the type of every dereference from its operand.
    ///
    /// Needed after a variable's type changes (array sizing). Dereference
    /// types of unaffected variables are left as they were.
    pub fn refresh_deref_types(&mut self) {
        let keys: Vec<Expr> = self.exprs.keys().collect();
        for expr in keys {
            let new_ty = match &self.exprs[expr].kind {
                ExprKind::Var(var) => Some(self.vars[*var].ty.clone()),
                ExprKind::Index { array, .. } => {
                    let array_ty = &self.exprs[*array].ty;
                    array_ty.index_result()
                }
                ExprKind::Field { record, field } => {
                    self.exprs[*record].ty.field_type(field).cloned()
                }
                _ => None,
            };
            if let Some(ty) = new_ty {
                self.exprs[expr].ty = ty;
            }
        }
    }

    /// Whether the shader contains no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
