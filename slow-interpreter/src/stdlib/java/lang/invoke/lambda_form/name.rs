use std::fmt::{Debug, Formatter};

use itertools::Itertools;

use crate::java_values::JavaValue;
use crate::stdlib::java::lang::invoke::lambda_form::basic_type::BasicType;
use crate::stdlib::java::lang::invoke::lambda_form::named_function::NamedFunction;

/// An operand of a [`Name`]: an earlier name of the same form, or a value fixed when the form was built.
#[derive(Clone)]
pub enum NameArg {
    Name(usize),
    Constant(JavaValue),
}

impl NameArg {
    pub fn remap(&self, map: impl Fn(usize) -> NameArg) -> NameArg {
        match self {
            NameArg::Name(index) => map(*index),
            NameArg::Constant(constant) => NameArg::Constant(constant.clone()),
        }
    }
}

impl Debug for NameArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NameArg::Name(index) => write!(f, "t{}", index),
            NameArg::Constant(constant) => write!(f, "{:?}", constant),
        }
    }
}

/// One step of a lambda form. Parameters have no function.
#[derive(Clone)]
pub struct Name {
    pub index: usize,
    pub basic_type: BasicType,
    pub function: Option<NamedFunction>,
    pub arguments: Vec<NameArg>,
}

impl Name {
    pub fn parameter(index: usize, basic_type: BasicType) -> Self {
        Self { index, basic_type, function: None, arguments: vec![] }
    }

    pub fn is_param(&self) -> bool {
        self.function.is_none()
    }

    pub fn referenced_names(&self) -> impl Iterator<Item=usize> + '_ {
        self.arguments.iter().filter_map(|arg| match arg {
            NameArg::Name(index) => Some(*index),
            NameArg::Constant(_) => None,
        })
    }
}

impl Debug for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.function {
            None => write!(f, "a{}:{}", self.index, self.basic_type.basic_type_char()),
            Some(function) => write!(f, "t{}:{}={:?}({})", self.index, self.basic_type.basic_type_char(), function, self.arguments.iter().map(|arg| format!("{:?}", arg)).join(",")),
        }
    }
}
