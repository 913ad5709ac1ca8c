use std::sync::Arc;

use crate::exceptions::InvokeResult;
use crate::stdlib::java::lang::invoke::lambda_form::LambdaForm;
use crate::stdlib::java::lang::invoke::method_handle::{MethodHandle, MethodHandleKind};
use crate::stdlib::java::lang::invoke::method_type::MethodType;

/// A handle with no state of its own. Its form does all the work.
pub fn make(type_: MethodType, form: Arc<LambdaForm>) -> InvokeResult<MethodHandle> {
    MethodHandle::new(type_, form, MethodHandleKind::Simple)
}
