//! Transform feedback declarations.
//!
//! Each name requested by the application becomes a [`TfeedbackDecl`].
//! Varying assignment binds the declarations to outputs of the last
//! pre-fragment stage; the buffer layout is computed from them at the end.

use alloc::{string::String, vec::Vec};

use log::debug;
use lpc_glir::{Type, Variable};

use crate::{
    config::Limits,
    error::{LinkError, LinkResult},
    program::BufferMode,
    resource_name::split_resource_name,
};

/// One requested transform feedback varying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TfeedbackDecl {
    /// The name as requested
    pub orig_name: String,
    /// The name without a subscript
    pub var_name: String,
    /// Requested array element
    pub subscript: Option<u32>,
    /// Varying slot of the captured data, once bound
    pub location: i32,
    /// Captured array elements
    pub size: u32,
    pub vector_elements: u32,
    pub matrix_columns: u32,
}

impl TfeedbackDecl {
    pub fn new(name: &str) -> Self {
        let (var_name, subscript) = split_resource_name(name);
        Self {
            orig_name: String::from(name),
            var_name: String::from(var_name),
            subscript,
            location: -1,
            size: 0,
            vector_elements: 0,
            matrix_columns: 0,
        }
    }

    /// Two declarations name the same data.
    pub fn is_same(&self, other: &TfeedbackDecl) -> bool {
        self.var_name == other.var_name && self.subscript == other.subscript
    }

    /// Components captured for this declaration.
    pub fn num_components(&self) -> u32 {
        self.vector_elements * self.matrix_columns * self.size
    }

    /// Bind the declaration to the output `variable`.
    pub fn assign_location(
        &mut self,
        variable: &Variable,
        mode: BufferMode,
        limits: &Limits,
    ) -> LinkResult<()> {
        let (element, location) = match &variable.ty {
            Type::Array { element, length } => {
                let columns = matrix_columns(element);
                match self.subscript {
                    Some(index) if index >= *length => {
                        return Err(LinkError::TransformFeedbackIndexOutOfRange {
                            name: self.orig_name.clone(),
                            index,
                            size: *length,
                        });
                    }
                    Some(index) => {
                        self.size = 1;
                        (&**element, variable.location + (index * columns) as i32)
                    }
                    None => {
                        self.size = *length;
                        (&**element, variable.location)
                    }
                }
            }
            ty => {
                if self.subscript.is_some() {
                    return Err(LinkError::TransformFeedbackNotArray {
                        name: self.orig_name.clone(),
                        var_name: self.var_name.clone(),
                    });
                }
                self.size = 1;
                (ty, variable.location)
            }
        };
        self.matrix_columns = matrix_columns(element);
        self.vector_elements = vector_elements(element);
        self.location = location;

        if mode == BufferMode::Separate
            && self.num_components() > limits.max_transform_feedback_separate_components
        {
            return Err(LinkError::TransformFeedbackSeparateComponents {
                name: self.orig_name.clone(),
            });
        }
        Ok(())
    }
}

fn matrix_columns(ty: &Type) -> u32 {
    match ty {
        Type::Matrix { columns, .. } => u32::from(*columns),
        _ => 1,
    }
}

fn vector_elements(ty: &Type) -> u32 {
    match ty {
        Type::Matrix { rows, .. } => u32::from(*rows),
        other => other.components().max(1),
    }
}

/// Turn the requested names into declarations, rejecting duplicates.
pub fn parse_tfeedback_decls(names: &[String]) -> LinkResult<Vec<TfeedbackDecl>> {
    let mut decls: Vec<TfeedbackDecl> = Vec::with_capacity(names.len());
    for name in names {
        let decl = TfeedbackDecl::new(name);
        if decls.iter().any(|d| d.is_same(&decl)) {
            return Err(LinkError::TransformFeedbackDuplicate {
                name: decl.orig_name,
            });
        }
        decls.push(decl);
    }
    Ok(decls)
}

/// One captured output in the final buffer layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformFeedbackOutput {
    pub name: String,
    /// Varying slot
    pub location: i32,
    pub components: u32,
    /// Destination buffer
    pub buffer: u32,
    /// Offset in the buffer, in components
    pub offset: u32,
}

/// Transform feedback layout of a linked program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformFeedbackInfo {
    pub outputs: Vec<TransformFeedbackOutput>,
    /// Components per captured vertex, per buffer
    pub buffer_strides: Vec<u32>,
}

/// Lay the bound declarations out in buffers.
pub fn store_tfeedback_info(
    decls: &[TfeedbackDecl],
    mode: BufferMode,
    limits: &Limits,
) -> LinkResult<TransformFeedbackInfo> {
    let mut info = TransformFeedbackInfo::default();
    let mut interleaved_total = 0;
    for (i, decl) in decls.iter().enumerate() {
        let buffer = match mode {
            BufferMode::Separate => i as u32,
            BufferMode::Interleaved => 0,
        };
        if info.buffer_strides.len() <= buffer as usize {
            info.buffer_strides.resize(buffer as usize + 1, 0);
        }
        let components = decl.num_components();
        let offset = info.buffer_strides[buffer as usize];
        info.buffer_strides[buffer as usize] += components;
        if mode == BufferMode::Interleaved {
            interleaved_total += components;
            if interleaved_total > limits.max_transform_feedback_interleaved_components {
                return Err(LinkError::TransformFeedbackInterleavedComponents);
            }
        }
        info.outputs.push(TransformFeedbackOutput {
            name: decl.orig_name.clone(),
            location: decl.location,
            components,
            buffer,
            offset,
        });
    }
    debug!(
        "transform feedback: {} output(s) in {} buffer(s)",
        info.outputs.len(),
        info.buffer_strides.len()
    );
    Ok(info)
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec};

    use lpc_glir::VariableMode;

    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_duplicates() {
        assert!(parse_tfeedback_decls(&names(&["a", "b[1]", "b[2]"])).is_ok());
        let err = parse_tfeedback_decls(&names(&["a", "b[1]", "b[1]"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Transform feedback varying b[1] specified more than once."
        );
    }

    #[test]
    fn test_assign_array_element() {
        let mut var = Variable::new("v", Type::array(Type::mat(2), 3), VariableMode::ShaderOut);
        var.location = 32;
        let limits = Limits::default();

        let mut decl = TfeedbackDecl::new("v[2]");
        decl.assign_location(&var, BufferMode::Interleaved, &limits)
            .expect("bound");
        assert_eq!(decl.location, 36);
        assert_eq!(decl.num_components(), 4);

        let mut whole = TfeedbackDecl::new("v");
        whole
            .assign_location(&var, BufferMode::Interleaved, &limits)
            .expect("bound");
        assert_eq!(whole.num_components(), 12);
        assert_eq!(
            whole.assign_location(&var, BufferMode::Separate, &limits),
            Err(LinkError::TransformFeedbackSeparateComponents {
                name: "v".to_string()
            })
        );

        let mut past = TfeedbackDecl::new("v[3]");
        assert_eq!(
            past.assign_location(&var, BufferMode::Interleaved, &limits)
                .unwrap_err()
                .to_string(),
            "Transform feedback varying v[3] has index 3, but the array size is 3."
        );
    }

    #[test]
    fn test_subscript_on_scalar() {
        let var = Variable::new("s", Type::FLOAT, VariableMode::ShaderOut);
        let mut decl = TfeedbackDecl::new("s[0]");
        let err = decl
            .assign_location(&var, BufferMode::Interleaved, &Limits::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Transform feedback varying s[0] requested, but s is not an array."
        );
    }

    #[test]
    fn test_buffer_layout() {
        let mut a = TfeedbackDecl::new("a");
        a.size = 1;
        a.vector_elements = 4;
        a.matrix_columns = 1;
        let mut b = a.clone();
        b.orig_name = "b".to_string();
        b.vector_elements = 2;

        let limits = Limits::default();
        let info = store_tfeedback_info(&[a.clone(), b.clone()], BufferMode::Interleaved, &limits)
            .expect("layout");
        assert_eq!(info.buffer_strides, vec![6]);
        assert_eq!(info.outputs[1].offset, 4);

        let info = store_tfeedback_info(&[a.clone(), b], BufferMode::Separate, &limits)
            .expect("layout");
        assert_eq!(info.buffer_strides, vec![4, 2]);

        let mut big = a;
        big.size = 17;
        assert_eq!(
            store_tfeedback_info(&[big], BufferMode::Interleaved, &limits),
            Err(LinkError::TransformFeedbackInterleavedComponents)
        );
    }
}
