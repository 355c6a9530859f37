//! Error types for program linking.

use alloc::string::String;

use thiserror::Error;

use crate::stage::ShaderStage;

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Broad class of a link failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Declarations of one name disagree across units or stages
    Redeclaration,
    /// A required function or stage is missing or defined twice
    Structural,
    /// Output and input interfaces of adjacent stages disagree
    InterfaceMismatch,
    /// Not enough locations, or an implementation limit is exceeded
    ResourceExhaustion,
    /// A declaration carries an invalid or inconsistent qualifier value
    MalformedDeclaration,
    /// The linker produced IR that does not verify
    Internal,
}

/// A link error. Each variant renders the exact diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("{mode} `{name}' declared as type `{new_type}' and type `{existing_type}'")]
    TypeMismatch {
        mode: &'static str,
        name: String,
        new_type: String,
        existing_type: String,
    },

    #[error("explicit locations for {mode} `{name}' have differing values")]
    LocationMismatch { mode: &'static str, name: String },

    #[error("explicit bindings for {mode} `{name}' have differing values")]
    BindingMismatch { mode: &'static str, name: String },

    #[error("offset specifications for {mode} `{name}' have differing values")]
    AtomicOffsetMismatch { mode: &'static str, name: String },

    #[error(
        "All redeclarations of gl_FragDepth in all fragment shaders in a single program \
         must have the same set of qualifiers."
    )]
    FragDepthQualifierMismatch,

    #[error(
        "If gl_FragDepth is redeclared with a layout qualifier in any fragment shader, \
         it must be redeclared with the same layout qualifier in all fragment shaders \
         that have assignments to gl_FragDepth"
    )]
    FragDepthLayoutMissing,

    #[error("initializers for {mode} `{name}' have differing values")]
    InitializerMismatch { mode: &'static str, name: String },

    #[error("shared global variable `{name}' has multiple non-constant initializers.")]
    MultipleNonConstantInitializers { name: String },

    #[error("declarations for {mode} `{name}' have mismatching invariant qualifiers")]
    InvariantMismatch { mode: &'static str, name: String },

    #[error("declarations for {mode} `{name}' have mismatching centroid qualifiers")]
    CentroidMismatch { mode: &'static str, name: String },

    #[error("definitions of interface block `{name}' do not match")]
    InterfaceBlockMismatch { name: String },

    #[error("uniform block `{name}' has mismatching definitions")]
    UniformBlockMismatch { name: String },

    #[error("function `{name}' is multiply defined")]
    FunctionMultiplyDefined { name: String },

    #[error("{stage} shader lacks `main'")]
    MissingMain { stage: ShaderStage },

    #[error("unresolved reference to function `{name}'")]
    UnresolvedFunction { name: String },

    #[error("function `{prototype}' has static recursion")]
    StaticRecursion { prototype: String },

    #[error("{stage} shader failed IR validation: {message}")]
    InvalidIr { stage: ShaderStage, message: String },

    #[error("geometry shader defined with conflicting input types")]
    GeometryConflictingInputType,

    #[error("geometry shader defined with conflicting output types")]
    GeometryConflictingOutputType,

    #[error("geometry shader defined with conflicting output vertex count ({first} and {second})")]
    GeometryConflictingVertexCount { first: u32, second: u32 },

    #[error("geometry shader didn't declare primitive input type")]
    GeometryMissingInputType,

    #[error("geometry shader didn't declare primitive output type")]
    GeometryMissingOutputType,

    #[error("geometry shader didn't declare max_vertices")]
    GeometryMissingMaxVertices,

    #[error("size of array {name} declared as {declared}, but number of input vertices is {vertices}")]
    GeometryInputArraySize {
        name: String,
        declared: u32,
        vertices: u32,
    },

    #[error("geometry shader accesses element {index} of {name}, but only {vertices} input vertices")]
    GeometryInputAccess {
        index: u32,
        name: String,
        vertices: u32,
    },

    #[error("{stage} shader writes to both `gl_ClipVertex' and `gl_ClipDistance'")]
    ClipVertexAndClipDistance { stage: ShaderStage },

    #[error("vertex shader does not write to `gl_Position'")]
    MissingPositionWrite,

    #[error("fragment shader writes to both `gl_FragColor' and `gl_FragData'")]
    FragColorAndFragData,

    #[error(
        "{producer} shader output `{name}' declared as type `{output_type}', \
         but {consumer} shader input declared as type `{input_type}'"
    )]
    VaryingTypeMismatch {
        producer: ShaderStage,
        name: String,
        output_type: String,
        consumer: ShaderStage,
        input_type: String,
    },

    #[error(
        "{producer} shader output `{name}' {output_has} {qualifier} qualifier, \
         but {consumer} shader input {input_has} {qualifier} qualifier"
    )]
    VaryingQualifierMismatch {
        producer: ShaderStage,
        name: String,
        qualifier: &'static str,
        output_has: &'static str,
        consumer: ShaderStage,
        input_has: &'static str,
    },

    #[error(
        "{producer} shader output `{name}' specifies {output} interpolation qualifier, \
         but {consumer} shader input specifies {input} interpolation qualifier"
    )]
    VaryingInterpolationMismatch {
        producer: ShaderStage,
        name: String,
        output: &'static str,
        consumer: ShaderStage,
        input: &'static str,
    },

    #[error("{consumer} shader varying {name} not written by {producer} shader")]
    VaryingNotWritten {
        consumer: ShaderStage,
        name: String,
        producer: ShaderStage,
    },

    #[error("{stage} shader uses too many output vectors ({count} > {max})")]
    TooManyOutputVectors {
        stage: ShaderStage,
        count: u32,
        max: u32,
    },

    #[error("{stage} shader uses too many input vectors ({count} > {max})")]
    TooManyInputVectors {
        stage: ShaderStage,
        count: u32,
        max: u32,
    },

    #[error("invalid explicit location {location} specified for `{name}'")]
    InvalidExplicitLocation { location: i32, name: String },

    #[error(
        "insufficient contiguous locations available for {target} `{name}' {used} {use_mask} {attr}"
    )]
    ExplicitLocationOverlap {
        target: &'static str,
        name: String,
        used: i32,
        use_mask: i32,
        attr: i32,
    },

    #[error("insufficient contiguous locations available for {target} `{name}'")]
    InsufficientLocations { target: &'static str, name: String },

    #[error("Transform feedback varyings specified, but no vertex or geometry shader is present.")]
    TransformFeedbackWithoutVertexStage,

    #[error("Transform feedback varying {name} specified more than once.")]
    TransformFeedbackDuplicate { name: String },

    #[error("Transform feedback varying {name} undeclared.")]
    TransformFeedbackUndeclared { name: String },

    #[error("Transform feedback varying {name} has index {index}, but the array size is {size}.")]
    TransformFeedbackIndexOutOfRange { name: String, index: u32, size: u32 },

    #[error("Transform feedback varying {name} requested, but {var_name} is not an array.")]
    TransformFeedbackNotArray { name: String, var_name: String },

    #[error("Transform feedback varying {name} exceeds MAX_TRANSFORM_FEEDBACK_SEPARATE_COMPONENTS.")]
    TransformFeedbackSeparateComponents { name: String },

    #[error("The MAX_TRANSFORM_FEEDBACK_INTERLEAVED_COMPONENTS limit has been exceeded.")]
    TransformFeedbackInterleavedComponents,

    #[error("Atomic counter {name} declared at offset {offset} which is already in use.")]
    AtomicCounterOverlap { name: String, offset: u32 },

    #[error("Too many {stage} shader atomic counters")]
    TooManyAtomicCounters { stage: ShaderStage },

    #[error("Too many {stage} shader atomic counter buffers")]
    TooManyAtomicBuffers { stage: ShaderStage },

    #[error("Too many combined atomic counters")]
    TooManyCombinedAtomicCounters,

    #[error("Too many combined atomic buffers")]
    TooManyCombinedAtomicBuffers,

    #[error("Too many {stage} shader texture samplers")]
    TooManySamplers { stage: ShaderStage },

    #[error("Too many {stage} shader default uniform block components")]
    TooManyDefaultUniformComponents { stage: ShaderStage },

    #[error("Too many {stage} shader uniform components")]
    TooManyUniformComponents { stage: ShaderStage },

    #[error("Too many combined uniform blocks ({count}/{max})")]
    TooManyCombinedUniformBlocks { count: u32, max: u32 },

    #[error("Too many {stage} uniform blocks ({count}/{max})")]
    TooManyUniformBlocks {
        stage: ShaderStage,
        count: u32,
        max: u32,
    },

    #[error("all shaders must use same shading language version")]
    VersionMismatch,

    #[error("Geometry shader must be linked with vertex shader")]
    GeometryWithoutVertex,

    #[error("program lacks a vertex shader")]
    MissingVertexShader,

    #[error("program lacks a fragment shader")]
    MissingFragmentShader,
}

impl LinkError {
    /// The class of failure this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        use LinkError::*;
        match self {
            TypeMismatch { .. }
            | LocationMismatch { .. }
            | BindingMismatch { .. }
            | AtomicOffsetMismatch { .. }
            | FragDepthQualifierMismatch
            | FragDepthLayoutMissing
            | InitializerMismatch { .. }
            | MultipleNonConstantInitializers { .. }
            | InvariantMismatch { .. }
            | CentroidMismatch { .. }
            | UniformBlockMismatch { .. } => ErrorCategory::Redeclaration,

            FunctionMultiplyDefined { .. }
            | MissingMain { .. }
            | UnresolvedFunction { .. }
            | StaticRecursion { .. }
            | MissingPositionWrite
            | FragColorAndFragData
            | ClipVertexAndClipDistance { .. }
            | VersionMismatch
            | GeometryWithoutVertex
            | TransformFeedbackWithoutVertexStage
            | MissingVertexShader
            | MissingFragmentShader => ErrorCategory::Structural,

            InterfaceBlockMismatch { .. }
            | VaryingTypeMismatch { .. }
            | VaryingQualifierMismatch { .. }
            | VaryingInterpolationMismatch { .. }
            | VaryingNotWritten { .. }
            | TransformFeedbackUndeclared { .. } => ErrorCategory::InterfaceMismatch,

            TooManyOutputVectors { .. }
            | TooManyInputVectors { .. }
            | ExplicitLocationOverlap { .. }
            | InsufficientLocations { .. }
            | TransformFeedbackSeparateComponents { .. }
            | TransformFeedbackInterleavedComponents
            | TooManyAtomicCounters { .. }
            | TooManyAtomicBuffers { .. }
            | TooManyCombinedAtomicCounters
            | TooManyCombinedAtomicBuffers
            | TooManySamplers { .. }
            | TooManyDefaultUniformComponents { .. }
            | TooManyUniformComponents { .. }
            | TooManyCombinedUniformBlocks { .. }
            | TooManyUniformBlocks { .. } => ErrorCategory::ResourceExhaustion,

            GeometryConflictingInputType
            | GeometryConflictingOutputType
            | GeometryConflictingVertexCount { .. }
            | GeometryMissingInputType
            | GeometryMissingOutputType
            | GeometryMissingMaxVertices
            | GeometryInputArraySize { .. }
            | GeometryInputAccess { .. }
            | InvalidExplicitLocation { .. }
            | TransformFeedbackDuplicate { .. }
            | TransformFeedbackIndexOutOfRange { .. }
            | TransformFeedbackNotArray { .. }
            | AtomicCounterOverlap { .. } => ErrorCategory::MalformedDeclaration,

            InvalidIr { .. } => ErrorCategory::Internal,
        }
    }
}

/// A resource-limit violation downgraded to a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkWarning {
    #[error(
        "Too many {stage} shader default uniform block components, but the driver will try \
         to optimize them out; this is non-portable behavior"
    )]
    DefaultUniformComponents { stage: ShaderStage },

    #[error(
        "Too many {stage} shader uniform components, but the driver will try to optimize \
         them out; this is non-portable behavior"
    )]
    UniformComponents { stage: ShaderStage },
}
