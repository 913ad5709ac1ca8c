pub mod access;
pub mod bootstrap_classes;
pub mod class_loading;
pub mod exceptions;
pub mod instance_of_common;
pub mod interpreter_util;
pub mod java_values;
pub mod jvm_state;
pub mod options;
pub mod resolvers;
pub mod runtime_class;
pub mod stdlib;
pub mod throw_utils;
pub mod tracing;
pub mod view;

pub use exceptions::{InvokeError, InvokeResult, WasException};
pub use jvm_state::JVMState;
pub use options::JVMOptions;
