//! Entity references for shader IR nodes.
//!
//! Every node of a [`ShaderIr`](crate::ShaderIr) lives in an arena owned by
//! the shader and is referred to by a small, copyable handle. Handles of
//! different kinds are distinct types, so a variable handle can never be
//! used where an expression handle is expected.

use core::fmt;

/// Base trait for entity references.
///
/// Entities are type-safe identifiers for IR nodes. They provide O(1)
/// conversion to/from indices while maintaining type safety.
pub trait EntityRef: Copy + Clone + PartialEq + Eq + core::hash::Hash + fmt::Debug {
    /// Get the index of this entity
    fn index(self) -> usize;

    /// Create an entity from an index
    fn from_index(index: usize) -> Self;

    /// Get the next available index (for entity creation)
    fn next_index(self) -> Self {
        Self::from_index(self.index() + 1)
    }
}

macro_rules! entity_impl {
    ($entity:ident, $prefix:expr) => {
        impl $entity {
            /// Create a new entity with the given index
            pub fn new(index: u32) -> Self {
                $entity(index)
            }

            /// Get the raw index of this entity
            pub fn as_u32(self) -> u32 {
                self.0
            }
        }

        impl EntityRef for $entity {
            fn index(self) -> usize {
                self.0 as usize
            }

            fn from_index(index: usize) -> Self {
                $entity(index as u32)
            }
        }

        impl fmt::Display for $entity {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

/// Variable entity reference.
///
/// Refers to a declaration (global, local, parameter or temporary) stored in
/// the owning shader's variable arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(u32);

entity_impl!(Var, "var");

/// Function entity reference.
///
/// A function groups all overloaded signatures sharing one name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Func(u32);

entity_impl!(Func, "func");

/// Statement entity reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Inst(u32);

entity_impl!(Inst, "inst");

/// Expression entity reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Expr(u32);

entity_impl!(Expr, "expr");
