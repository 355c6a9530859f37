//! Constant values (initializers and literal operands).

use alloc::{vec, vec::Vec};
use core::fmt;

use crate::types::Type;

/// Component storage of a constant.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// Boolean components
    Bool(Vec<bool>),
    /// Signed integer components
    Int(Vec<i32>),
    /// Unsigned integer components
    Uint(Vec<u32>),
    /// Float components (column-major for matrices)
    Float(Vec<f32>),
    /// Elements of an array or members of a structure
    Aggregate(Vec<Constant>),
}

/// A typed constant value.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    /// Type of the constant
    pub ty: Type,
    /// Value
    pub value: ConstantValue,
}

impl Constant {
    /// A `float` constant.
    pub fn float(value: f32) -> Self {
        Self {
            ty: Type::FLOAT,
            value: ConstantValue::Float(vec![value]),
        }
    }

    /// An `int` constant.
    pub fn int(value: i32) -> Self {
        Self {
            ty: Type::INT,
            value: ConstantValue::Int(vec![value]),
        }
    }

    /// A `uint` constant.
    pub fn uint(value: u32) -> Self {
        Self {
            ty: Type::UINT,
            value: ConstantValue::Uint(vec![value]),
        }
    }

    /// A `bool` constant.
    pub fn bool(value: bool) -> Self {
        Self {
            ty: Type::BOOL,
            value: ConstantValue::Bool(vec![value]),
        }
    }

    /// A float vector constant; the vector size is the number of components.
    pub fn vec(components: &[f32]) -> Self {
        Self {
            ty: Type::vec(components.len() as u8),
            value: ConstantValue::Float(components.to_vec()),
        }
    }

    /// An array constant.
    pub fn array(element: Type, elements: Vec<Constant>) -> Self {
        Self {
            ty: Type::array(element, elements.len() as u32),
            value: ConstantValue::Aggregate(elements),
        }
    }

    /// Whether `other` has the same type and value.
    pub fn has_value(&self, other: &Constant) -> bool {
        self == other
    }

    /// Value of a scalar integer constant, as used for array indices.
    pub fn as_index(&self) -> Option<i64> {
        match &self.value {
            ConstantValue::Int(v) if v.len() == 1 => Some(i64::from(v[0])),
            ConstantValue::Uint(v) if v.len() == 1 => Some(i64::from(v[0])),
            _ => None,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.ty)?;
        match &self.value {
            ConstantValue::Bool(v) => write_list(f, v)?,
            ConstantValue::Int(v) => write_list(f, v)?,
            ConstantValue::Uint(v) => write_list(f, v)?,
            ConstantValue::Float(v) => write_list(f, v)?,
            ConstantValue::Aggregate(v) => write_list(f, v)?,
        }
        write!(f, ")")
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}
