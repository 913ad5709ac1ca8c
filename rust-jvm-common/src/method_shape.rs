use std::fmt::{Display, Formatter};

use crate::compressed_classfile::CMethodDescriptor;
use crate::compressed_classfile::names::MethodName;

/// Name plus descriptor; the key methods are looked up and overridden by.
#[derive(Clone, Hash, Eq, PartialEq, Debug)]
pub struct MethodShape {
    pub name: MethodName,
    pub desc: CMethodDescriptor,
}

impl MethodShape {
    pub fn new(name: MethodName, desc: CMethodDescriptor) -> Self {
        Self { name, desc }
    }
}

impl Display for MethodShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.name, self.desc)
    }
}
