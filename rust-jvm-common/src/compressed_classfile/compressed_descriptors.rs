use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::compressed_classfile::compressed_types::{CompressedParsedDescriptorType, CPDType};

pub type CMethodDescriptor = CompressedMethodDescriptor;

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct CompressedMethodDescriptor {
    pub arg_types: Vec<CompressedParsedDescriptorType>,
    pub return_type: CompressedParsedDescriptorType,
}

impl CompressedMethodDescriptor {
    pub fn void_return(arg_types: Vec<CPDType>) -> Self {
        Self { arg_types, return_type: CPDType::VoidType }
    }

    pub fn jvm_representation(&self) -> String {
        format!("({}){}", self.arg_types.iter().map(|arg| arg.jvm_representation()).join(""), self.return_type.jvm_representation())
    }

    /// Argument slots taken by the parameters, with long and double counting twice. Excludes any receiver.
    pub fn parameter_slot_count(&self) -> usize {
        self.arg_types.iter().map(|arg| arg.slot_size()).sum()
    }
}

impl Display for CompressedMethodDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.jvm_representation())
    }
}

pub type CFieldDescriptor = CompressedFieldDescriptor;

/// The type of a field. Never `void`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct CompressedFieldDescriptor(pub CompressedParsedDescriptorType);
