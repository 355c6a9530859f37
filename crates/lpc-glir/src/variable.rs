//! Variable declarations.

use alloc::{string::String, vec, vec::Vec};

use crate::{
    constant::Constant,
    types::{InterfaceType, Type},
};

/// Storage mode of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableMode {
    /// Ordinary global or function-local variable
    Auto,
    /// Compiler-generated temporary
    Temporary,
    /// Uniform, shared across stages by name
    Uniform,
    /// Stage input (`in` / `attribute` / `varying` in the fragment stage)
    ShaderIn,
    /// Stage output (`out` / `varying` in the vertex stage)
    ShaderOut,
    /// Function `in` parameter
    FunctionIn,
    /// Function `out` parameter
    FunctionOut,
    /// Function `inout` parameter
    FunctionInOut,
    /// Built-in input provided by the pipeline (e.g. `gl_VertexID`)
    SystemValue,
}

impl VariableMode {
    /// Whether a call writes through a parameter of this mode.
    pub fn is_out_parameter(self) -> bool {
        matches!(self, VariableMode::FunctionOut | VariableMode::FunctionInOut)
    }
}

/// Interpolation qualifier of an interface variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    /// No explicit qualifier
    #[default]
    Smooth,
    /// `flat`
    Flat,
    /// `noperspective`
    NoPerspective,
}

/// Layout qualifier of `gl_FragDepth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthLayout {
    /// Not redeclared with a depth layout
    #[default]
    None,
    /// `depth_any`
    Any,
    /// `depth_greater`
    Greater,
    /// `depth_less`
    Less,
    /// `depth_unchanged`
    Unchanged,
}

/// A variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Variable name
    pub name: String,
    /// Declared type
    pub ty: Type,
    /// Storage mode
    pub mode: VariableMode,
    /// `const` global
    pub read_only: bool,
    /// Assigned location, -1 when unassigned
    pub location: i32,
    /// Location was given by a layout qualifier or is fixed for a built-in
    pub explicit_location: bool,
    /// Dual-source blending index of a fragment output
    pub index: u32,
    /// Binding point of an opaque uniform or atomic counter
    pub binding: i32,
    /// Binding was given by a layout qualifier
    pub explicit_binding: bool,
    /// Byte offset of an atomic counter inside its buffer
    pub atomic_offset: u32,
    /// `invariant` qualifier
    pub invariant: bool,
    /// `centroid` qualifier
    pub centroid: bool,
    /// Interpolation qualifier
    pub interpolation: Interpolation,
    /// `gl_FragDepth` layout qualifier
    pub depth_layout: DepthLayout,
    /// Constant initializer, if the initializer is a constant expression
    pub constant_initializer: Option<Constant>,
    /// Any initializer (constant or not) was given
    pub has_initializer: bool,
    /// Highest constant index used to access this variable as an array
    pub max_array_access: u32,
    /// Highest constant index used per member of an interface block instance
    pub max_ifc_array_access: Vec<u32>,
    /// Interface block this variable is an instance or member of
    pub interface_type: Option<InterfaceType>,
    /// Referenced anywhere in the shader
    pub used: bool,
    /// Generic interface variable not yet paired with the adjacent stage
    pub is_unmatched_generic_inout: bool,
}

impl Variable {
    /// Create a declaration with default qualifiers.
    pub fn new(name: impl Into<String>, ty: Type, mode: VariableMode) -> Self {
        Self {
            name: name.into(),
            ty,
            mode,
            read_only: false,
            location: -1,
            explicit_location: false,
            index: 0,
            binding: 0,
            explicit_binding: false,
            atomic_offset: 0,
            invariant: false,
            centroid: false,
            interpolation: Interpolation::Smooth,
            depth_layout: DepthLayout::None,
            constant_initializer: None,
            has_initializer: false,
            max_array_access: 0,
            max_ifc_array_access: Vec::new(),
            interface_type: None,
            used: false,
            is_unmatched_generic_inout: false,
        }
    }

    /// Set an explicit location.
    pub fn with_location(mut self, location: i32) -> Self {
        self.location = location;
        self.explicit_location = true;
        self
    }

    /// Set an explicit binding.
    pub fn with_binding(mut self, binding: i32) -> Self {
        self.binding = binding;
        self.explicit_binding = true;
        self
    }

    /// Set the atomic counter offset.
    pub fn with_atomic_offset(mut self, offset: u32) -> Self {
        self.atomic_offset = offset;
        self
    }

    /// Set a constant initializer.
    pub fn with_initializer(mut self, value: Constant) -> Self {
        self.constant_initializer = Some(value);
        self.has_initializer = true;
        self
    }

    /// Mark as initialized by a non-constant expression.
    pub fn with_non_constant_initializer(mut self) -> Self {
        self.has_initializer = true;
        self
    }

    /// Set the `invariant` qualifier.
    pub fn invariant(mut self) -> Self {
        self.invariant = true;
        self
    }

    /// Set the `centroid` qualifier.
    pub fn centroid(mut self) -> Self {
        self.centroid = true;
        self
    }

    /// Set the interpolation qualifier.
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Set the `gl_FragDepth` layout qualifier.
    pub fn with_depth_layout(mut self, layout: DepthLayout) -> Self {
        self.depth_layout = layout;
        self
    }

    /// Mark as a `const` global.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Make this variable an instance or member of the interface block `ifc`.
    pub fn with_interface(mut self, ifc: InterfaceType) -> Self {
        self.max_ifc_array_access = vec![0; ifc.fields.len()];
        self.interface_type = Some(ifc);
        self
    }

    /// Mark the variable as referenced.
    pub fn mark_used(mut self) -> Self {
        self.used = true;
        self
    }

    /// Human-readable storage class, as used in link diagnostics.
    pub fn mode_string(&self) -> &'static str {
        match self.mode {
            VariableMode::Auto if self.read_only => "global constant",
            VariableMode::Auto => "global variable",
            VariableMode::Uniform => "uniform",
            VariableMode::ShaderIn | VariableMode::SystemValue => "shader input",
            VariableMode::ShaderOut => "shader output",
            VariableMode::FunctionIn => "function input",
            VariableMode::FunctionOut => "function output",
            VariableMode::FunctionInOut => "function inout",
            VariableMode::Temporary => "compiler temporary",
        }
    }

    /// Built-in variables use the reserved `gl_` prefix.
    pub fn is_builtin(&self) -> bool {
        self.name.starts_with("gl_")
    }

    /// Member of a uniform block (named or unnamed).
    pub fn is_in_uniform_block(&self) -> bool {
        self.mode == VariableMode::Uniform && self.interface_type.is_some()
    }

    /// The variable is the instance of a named interface block, or an
    /// array of instances.
    pub fn is_interface_instance(&self) -> bool {
        match &self.ty {
            Type::Interface(_) => true,
            Type::Array { element, .. } => element.is_interface(),
            _ => false,
        }
    }

    /// Replace the interface block type this variable belongs to.
    pub fn change_interface_type(&mut self, ifc: InterfaceType) {
        if self.max_ifc_array_access.len() != ifc.fields.len() {
            self.max_ifc_array_access.resize(ifc.fields.len(), 0);
        }
        self.interface_type = Some(ifc);
    }

    /// Record an access with a constant array index.
    pub fn record_array_access(&mut self, index: u32) {
        self.max_array_access = self.max_array_access.max(index);
    }
}
