use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use thiserror::Error;

use crate::java_values::Object;

/// A Java exception object raised by a member body. It is propagated through handle invocation unchanged.
#[derive(Clone)]
pub struct WasException {
    pub exception_obj: Arc<Object>,
}

impl WasException {
    pub fn new(exception_obj: Arc<Object>) -> Self {
        Self { exception_obj }
    }
}

impl Debug for WasException {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "exception {}", self)
    }
}

impl Display for WasException {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.exception_obj.runtime_type().java_source_representation())?;
        if let Some(message) = self.exception_obj.detail_message() {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone)]
pub enum InvokeError {
    #[error("invalid method type: {0}")]
    InvalidSignature(String),
    #[error("bad parameter count {slots}")]
    SlotLimitExceeded { slots: usize },
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("linkage error: {0}")]
    Linkage(String),
    #[error("no such member: {0}")]
    NoSuchMember(String),
    #[error("illegal access: {0}")]
    IllegalAccess(String),
    #[error("wrong method type: {0}")]
    WrongMethodType(String),
    #[error("cannot cast {from} to {to}")]
    ClassCast { from: String, to: String },
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
    #[error("illegal state: {0}")]
    IllegalState(String),
    #[error("null pointer: {0}")]
    NullPointer(String),
    #[error(transparent)]
    Thrown(#[from] ThrownException),
}

/// Wrapper so the thrown object participates in `#[from]` conversion.
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct ThrownException(pub WasException);

impl From<WasException> for InvokeError {
    fn from(exception: WasException) -> Self {
        InvokeError::Thrown(ThrownException(exception))
    }
}

impl InvokeError {
    pub fn class_cast(from: impl Display, to: impl Display) -> Self {
        InvokeError::ClassCast { from: from.to_string(), to: to.to_string() }
    }

    pub fn try_unwrap_thrown(&self) -> Option<&WasException> {
        match self {
            InvokeError::Thrown(ThrownException(exception)) => Some(exception),
            _ => None,
        }
    }
}

pub type InvokeResult<T> = Result<T, InvokeError>;
