//! Method handles over a small class runtime: typed, directly invocable references to methods,
//! constructors and fields, the lambda forms that run them, and the lookups that hand them out.

pub use java_lang_invoke_method_handle_natives as natives;
pub use rust_jvm_common as common;
pub use slow_interpreter as runtime;

pub use java_lang_invoke_method_handle_natives::{Lookup, MethodHandleInfo};
pub use slow_interpreter::{InvokeError, InvokeResult, JVMOptions, JVMState};
pub use slow_interpreter::stdlib::java::lang::invoke::call_site::CallSite;
pub use slow_interpreter::stdlib::java::lang::invoke::method_handle::MethodHandle;
pub use slow_interpreter::stdlib::java::lang::invoke::method_handles;
pub use slow_interpreter::stdlib::java::lang::invoke::method_type::MethodType;
pub use slow_interpreter::stdlib::java::lang::member_name::{MemberName, MemberNameFactory};
