//! GLSL type system.
//!
//! Types compare structurally: two declarations have "the same type" when
//! their `Type` values are equal. Arrays with `length == 0` are unsized and
//! get their length at link time.

use alloc::{
    boxed::Box,
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::fmt;

/// Base type of scalars, vectors and matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarType {
    /// Boolean
    Bool,
    /// 32-bit signed integer
    Int,
    /// 32-bit unsigned integer
    Uint,
    /// 32-bit float
    Float,
}

impl ScalarType {
    /// Name of the scalar type.
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::Uint => "uint",
            ScalarType::Float => "float",
        }
    }

    /// Prefix used for vector type names (`bvec`, `ivec`, ...).
    fn vector_prefix(self) -> &'static str {
        match self {
            ScalarType::Bool => "bvec",
            ScalarType::Int => "ivec",
            ScalarType::Uint => "uvec",
            ScalarType::Float => "vec",
        }
    }
}

/// Sampler dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerDim {
    /// `sampler1D`
    D1,
    /// `sampler2D`
    D2,
    /// `sampler3D`
    D3,
    /// `samplerCube`
    Cube,
    /// `sampler2DShadow`
    D2Shadow,
    /// `sampler2DArray`
    D2Array,
}

impl SamplerDim {
    fn name(self) -> &'static str {
        match self {
            SamplerDim::D1 => "sampler1D",
            SamplerDim::D2 => "sampler2D",
            SamplerDim::D3 => "sampler3D",
            SamplerDim::Cube => "samplerCube",
            SamplerDim::D2Shadow => "sampler2DShadow",
            SamplerDim::D2Array => "sampler2DArray",
        }
    }
}

/// A named member of a structure or interface block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructField {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: Type,
}

impl StructField {
    /// Create a new field.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A user-defined structure type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructType {
    /// Structure name
    pub name: String,
    /// Members in declaration order
    pub fields: Vec<StructField>,
}

/// Memory layout of an interface block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfacePacking {
    /// `layout(std140)`
    Std140,
    /// `layout(shared)`
    Shared,
    /// `layout(packed)`
    Packed,
}

/// The type of an interface block (`uniform`, `in` or `out` block).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceType {
    /// Block name (not the instance name)
    pub name: String,
    /// Members in declaration order
    pub fields: Vec<StructField>,
    /// Packing mode
    pub packing: InterfacePacking,
}

impl InterfaceType {
    /// Create a new interface block type.
    pub fn new(name: impl Into<String>, fields: Vec<StructField>, packing: InterfacePacking) -> Self {
        Self {
            name: name.into(),
            fields,
            packing,
        }
    }

    /// Index of the field named `name`.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Whether any member is an unsized array.
    pub fn contains_unsized_arrays(&self) -> bool {
        self.fields.iter().any(|f| f.ty.is_unsized_array())
    }
}

/// GLSL type representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// `void` (function return type only)
    Void,
    /// Scalar
    Scalar(ScalarType),
    /// Vector of 2 to 4 components
    Vector {
        /// Component type
        base: ScalarType,
        /// Number of components
        size: u8,
    },
    /// Float matrix
    Matrix {
        /// Number of column vectors
        columns: u8,
        /// Number of rows (components per column)
        rows: u8,
    },
    /// Opaque sampler
    Sampler(SamplerDim),
    /// Opaque atomic counter
    AtomicUint,
    /// Array; a length of 0 means unsized
    Array {
        /// Element type
        element: Box<Type>,
        /// Declared length, 0 when unsized
        length: u32,
    },
    /// Structure
    Struct(StructType),
    /// Interface block
    Interface(InterfaceType),
}

impl Type {
    /// `bool`
    pub const BOOL: Type = Type::Scalar(ScalarType::Bool);
    /// `int`
    pub const INT: Type = Type::Scalar(ScalarType::Int);
    /// `uint`
    pub const UINT: Type = Type::Scalar(ScalarType::Uint);
    /// `float`
    pub const FLOAT: Type = Type::Scalar(ScalarType::Float);

    /// A float vector (`vec2`..`vec4`).
    pub fn vec(size: u8) -> Type {
        Type::Vector {
            base: ScalarType::Float,
            size,
        }
    }

    /// A square float matrix (`mat2`..`mat4`).
    pub fn mat(size: u8) -> Type {
        Type::Matrix {
            columns: size,
            rows: size,
        }
    }

    /// An array of `element` with `length` elements.
    pub fn array(element: Type, length: u32) -> Type {
        Type::Array {
            element: Box::new(element),
            length,
        }
    }

    /// An unsized array of `element`.
    pub fn unsized_array(element: Type) -> Type {
        Type::array(element, 0)
    }

    /// Check if this is an array type.
    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    /// Check if this is an array declared without a size.
    pub fn is_unsized_array(&self) -> bool {
        matches!(self, Type::Array { length: 0, .. })
    }

    /// Check if this is an interface block type.
    pub fn is_interface(&self) -> bool {
        matches!(self, Type::Interface(_))
    }

    /// Element type of an array.
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Declared array length (0 for unsized arrays).
    pub fn array_length(&self) -> Option<u32> {
        match self {
            Type::Array { length, .. } => Some(*length),
            _ => None,
        }
    }

    /// The same array type with a different length.
    ///
    /// Returns `None` for non-array types.
    pub fn with_length(&self, length: u32) -> Option<Type> {
        self.element_type()
            .map(|element| Type::array(element.clone(), length))
    }

    /// Type produced by indexing a value of this type with `[]`.
    ///
    /// Arrays yield their element, vectors their base scalar, and matrices
    /// their column vector.
    pub fn index_result(&self) -> Option<Type> {
        match self {
            Type::Array { element, .. } => Some((**element).clone()),
            Type::Vector { base, .. } => Some(Type::Scalar(*base)),
            Type::Matrix { rows, .. } => Some(Type::vec(*rows)),
            _ => None,
        }
    }

    /// Members of a structure or interface block.
    pub fn fields(&self) -> Option<&[StructField]> {
        match self {
            Type::Struct(s) => Some(&s.fields),
            Type::Interface(i) => Some(&i.fields),
            _ => None,
        }
    }

    /// Type of the member named `name`.
    pub fn field_type(&self, name: &str) -> Option<&Type> {
        self.fields()?
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.ty)
    }

    /// Base scalar type of scalars, vectors and matrices.
    pub fn base_type(&self) -> Option<ScalarType> {
        match self {
            Type::Scalar(s) => Some(*s),
            Type::Vector { base, .. } => Some(*base),
            Type::Matrix { .. } => Some(ScalarType::Float),
            _ => None,
        }
    }

    /// Number of scalar components of a scalar, vector or matrix.
    pub fn components(&self) -> u32 {
        match self {
            Type::Scalar(_) => 1,
            Type::Vector { size, .. } => u32::from(*size),
            Type::Matrix { columns, rows } => u32::from(*columns) * u32::from(*rows),
            _ => 0,
        }
    }

    /// Number of uniform components used by a value of this type.
    ///
    /// Opaque types (samplers, atomic counters) do not consume components.
    pub fn component_slots(&self) -> u32 {
        match self {
            Type::Scalar(_) | Type::Vector { .. } | Type::Matrix { .. } => self.components(),
            Type::Array { element, length } => length * element.component_slots(),
            Type::Struct(s) => s.fields.iter().map(|f| f.ty.component_slots()).sum(),
            Type::Interface(i) => i.fields.iter().map(|f| f.ty.component_slots()).sum(),
            Type::Void | Type::Sampler(_) | Type::AtomicUint => 0,
        }
    }

    /// Number of vertex attribute / varying slots used by a value of this type.
    ///
    /// Each scalar or vector uses one slot, each matrix column one slot.
    pub fn count_attribute_slots(&self) -> u32 {
        match self {
            Type::Scalar(_) | Type::Vector { .. } => 1,
            Type::Matrix { columns, .. } => u32::from(*columns),
            Type::Array { element, length } => length * element.count_attribute_slots(),
            Type::Struct(s) => s.fields.iter().map(|f| f.ty.count_attribute_slots()).sum(),
            Type::Interface(i) => i.fields.iter().map(|f| f.ty.count_attribute_slots()).sum(),
            Type::Void | Type::Sampler(_) | Type::AtomicUint => 0,
        }
    }

    /// Number of sampler units used by a value of this type.
    pub fn sampler_count(&self) -> u32 {
        match self {
            Type::Sampler(_) => 1,
            Type::Array { element, length } => length * element.sampler_count(),
            Type::Struct(s) => s.fields.iter().map(|f| f.ty.sampler_count()).sum(),
            _ => 0,
        }
    }

    /// Whether this type is or contains a sampler.
    pub fn contains_sampler(&self) -> bool {
        match self {
            Type::Sampler(_) => true,
            Type::Array { element, .. } => element.contains_sampler(),
            Type::Struct(s) => s.fields.iter().any(|f| f.ty.contains_sampler()),
            _ => false,
        }
    }

    /// Whether this type is or contains an atomic counter.
    pub fn contains_atomic(&self) -> bool {
        match self {
            Type::AtomicUint => true,
            Type::Array { element, .. } => element.contains_atomic(),
            Type::Struct(s) => s.fields.iter().any(|f| f.ty.contains_atomic()),
            _ => false,
        }
    }

    /// Number of atomic counters in a value of this type.
    pub fn atomic_size(&self) -> u32 {
        match self {
            Type::AtomicUint => 1,
            Type::Array { element, length } => length * element.atomic_size(),
            _ => 0,
        }
    }

    /// Base alignment in bytes under the std140 layout rules.
    pub fn std140_base_alignment(&self) -> u32 {
        match self {
            Type::Scalar(_) => 4,
            Type::Vector { size: 2, .. } => 8,
            Type::Vector { .. } => 16,
            Type::Matrix { .. } => 16,
            Type::Array { element, .. } => round_up(element.std140_base_alignment(), 16),
            Type::Struct(s) => {
                let max = s
                    .fields
                    .iter()
                    .map(|f| f.ty.std140_base_alignment())
                    .max()
                    .unwrap_or(0);
                round_up(max, 16)
            }
            Type::Interface(_) => 16,
            Type::Void | Type::Sampler(_) | Type::AtomicUint => 0,
        }
    }

    /// Size in bytes under the std140 layout rules.
    pub fn std140_size(&self) -> u32 {
        match self {
            Type::Scalar(_) | Type::Vector { .. } => 4 * self.components(),
            Type::Matrix { columns, .. } => 16 * u32::from(*columns),
            Type::Array { element, length } => {
                let stride = round_up(element.std140_size(), 16);
                stride * length
            }
            Type::Struct(s) => {
                let size = std140_fields_size(&s.fields);
                round_up(size, self.std140_base_alignment())
            }
            Type::Interface(i) => std140_fields_size(&i.fields),
            Type::Void | Type::Sampler(_) | Type::AtomicUint => 0,
        }
    }

    /// Name of the type as written in GLSL.
    pub fn name(&self) -> String {
        match self {
            Type::Void => "void".to_string(),
            Type::Scalar(s) => s.name().to_string(),
            Type::Vector { base, size } => format!("{}{}", base.vector_prefix(), size),
            Type::Matrix { columns, rows } if columns == rows => format!("mat{}", columns),
            Type::Matrix { columns, rows } => format!("mat{}x{}", columns, rows),
            Type::Sampler(dim) => dim.name().to_string(),
            Type::AtomicUint => "atomic_uint".to_string(),
            Type::Array { element, length: 0 } => format!("{}[]", element.name()),
            Type::Array { element, length } => format!("{}[{}]", element.name(), length),
            Type::Struct(s) => s.name.clone(),
            Type::Interface(i) => i.name.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn round_up(value: u32, alignment: u32) -> u32 {
    if alignment == 0 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

/// Offset of every member of a std140 block, followed by the total size.
pub fn std140_offsets(fields: &[StructField]) -> (Vec<u32>, u32) {
    let mut offsets = Vec::with_capacity(fields.len());
    let mut offset = 0;
    for field in fields {
        offset = round_up(offset, field.ty.std140_base_alignment());
        offsets.push(offset);
        offset += field.ty.std140_size();
    }
    (offsets, offset)
}

fn std140_fields_size(fields: &[StructField]) -> u32 {
    std140_offsets(fields).1
}
