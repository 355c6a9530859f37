//! GLSL Intermediate Representation (IR).
//!
//! Tree IR for independently compiled shader units, as consumed by the
//! linker:
//! - Types (scalars, vectors, matrices, arrays, structs, interface blocks)
//! - Variables (declarations with storage mode and layout qualifiers)
//! - Statements and expressions, stored in per-shader arenas
//! - Traversal, deep copy, dead code elimination and verification

#![no_std]

extern crate alloc;

mod builder;
mod clone;
mod constant;
mod dead_code;
mod display;
mod entity;
mod entity_map;
mod ir;
mod types;
mod variable;
mod verifier;
mod visitor;

pub use builder::ShaderBuilder;
pub use clone::{
    clone_body_into, clone_expr_into, clone_inst_into, clone_signature_into, ScratchRemap,
    VarRemap,
};
pub use constant::{Constant, ConstantValue};
pub use dead_code::{do_common_optimization, do_dead_code, do_dead_functions};
pub use entity::{EntityRef, Expr, Func, Inst, Var};
pub use entity_map::PrimaryMap;
pub use ir::{
    BinaryOp, ExprData, ExprKind, Function, FunctionSignature, InstData, Item, ShaderIr,
    SignatureRef, UnaryOp,
};
pub use types::{
    std140_offsets, InterfacePacking, InterfaceType, SamplerDim, ScalarType, StructField,
    StructType, Type,
};
pub use variable::{DepthLayout, Interpolation, Variable, VariableMode};
pub use verifier::{verify, VerifierError};
pub use visitor::{
    find_assignment, find_dereference, find_end_primitive, walk_body, walk_expr, walk_inst,
    walk_shader, CallCollector, VisitStatus, Visitor,
};
