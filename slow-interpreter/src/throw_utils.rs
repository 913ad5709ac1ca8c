use rust_jvm_common::compressed_classfile::names::{CClassName, FieldName};

use crate::class_loading::check_initing_or_inited_class;
use crate::exceptions::{InvokeError, WasException};
use crate::interpreter_util::new_object;
use crate::java_values::JavaValue;
use crate::jvm_state::JVMState;

/// Allocates an exception of `class_name` carrying `message`, ready to be returned from a method body.
pub fn throw_exception(jvm: &JVMState, class_name: CClassName, message: &str) -> InvokeError {
    let class = match check_initing_or_inited_class(jvm, class_name) {
        Ok(class) => class,
        Err(err) => return err,
    };
    if !class.is_subclass_of(CClassName::throwable()) {
        return InvokeError::class_cast(class_name, CClassName::throwable());
    }
    let exception = new_object(&class);
    if let (Some(object), Some(field_number)) = (exception.unwrap_object(), class.lookup_instance_field(CClassName::throwable(), FieldName::new("detailMessage"))) {
        object.unwrap_normal_object().fields.write()[field_number.number] = JavaValue::new_string(message);
        return WasException::new(object).into();
    }
    InvokeError::IllegalState(format!("could not allocate {}", class_name))
}

pub fn throw_runtime_exception(jvm: &JVMState, message: &str) -> InvokeError {
    throw_exception(jvm, CClassName::runtime_exception(), message)
}
