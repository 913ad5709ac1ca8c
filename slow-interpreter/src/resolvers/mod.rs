use std::fmt::{Display, Formatter};

use crate::exceptions::InvokeError;

pub mod fields;
pub mod methods;

/// Why a symbolic reference failed to resolve. Kept as data until a caller asks for an error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResolutionFailure {
    NoSuchMethod(String),
    NoSuchField(String),
    IllegalAccess(String),
    Linkage(String),
}

impl ResolutionFailure {
    pub fn to_error(&self) -> InvokeError {
        match self {
            ResolutionFailure::NoSuchMethod(msg) => InvokeError::NoSuchMember(format!("no such method: {}", msg)),
            ResolutionFailure::NoSuchField(msg) => InvokeError::NoSuchMember(format!("no such field: {}", msg)),
            ResolutionFailure::IllegalAccess(msg) => InvokeError::IllegalAccess(msg.clone()),
            ResolutionFailure::Linkage(msg) => InvokeError::Linkage(msg.clone()),
        }
    }
}

impl Display for ResolutionFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_error())
    }
}
