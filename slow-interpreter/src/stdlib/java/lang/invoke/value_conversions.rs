use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::primitive_wrapper::Wrapper;

use crate::exceptions::{InvokeError, InvokeResult};
use crate::instance_of_common::instance_of;
use crate::java_values::{default_value, JavaValue};
use crate::jvm_state::JVMState;

/// A single-value conversion performed by `as_type` adapters.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ValueConversion {
    /// Primitive to primitive.
    Widen { from: Wrapper, to: Wrapper },
    Box(Wrapper),
    /// Reference to primitive: a box whose primitive widens to the target. Null is rejected.
    Unbox(Wrapper),
    /// Reference checkcast; null always passes.
    Cast(CPDType),
    /// Produces the zero value of a type from nothing (a void result).
    Zero(CPDType),
    /// Drops a value (conversion to a void result).
    Discard,
}

/// The conversion from a value of `src` to `dst`, or `None` when the value passes through unchanged.
pub fn value_conversion(src: &CPDType, dst: &CPDType) -> Option<ValueConversion> {
    if src == dst {
        return None;
    }
    if dst.is_void() {
        return Some(ValueConversion::Discard);
    }
    if src.is_void() {
        return Some(ValueConversion::Zero(*dst));
    }
    match (Wrapper::for_primitive_type(src), Wrapper::for_primitive_type(dst)) {
        (Some(from), Some(to)) => Some(ValueConversion::Widen { from, to }),
        (Some(from), None) => Some(ValueConversion::Box(from)),
        (None, Some(to)) => Some(ValueConversion::Unbox(to)),
        (None, None) => {
            if dst.is_object() {
                None
            } else {
                Some(ValueConversion::Cast(*dst))
            }
        }
    }
}

impl ValueConversion {
    /// Basic type of the converted value.
    pub fn result_type(&self) -> CPDType {
        match self {
            ValueConversion::Widen { to, .. } => to.primitive_type(),
            ValueConversion::Box(from) => from.wrapper_type(),
            ValueConversion::Unbox(to) => to.primitive_type(),
            ValueConversion::Cast(to) => *to,
            ValueConversion::Zero(to) => *to,
            ValueConversion::Discard => CPDType::VoidType,
        }
    }

    pub fn apply(&self, jvm: &JVMState, value: JavaValue) -> InvokeResult<JavaValue> {
        match self {
            ValueConversion::Widen { from, to } => {
                value.convert_primitive(*to).ok_or_else(|| InvokeError::class_cast(from.primitive_type().java_source_representation(), to.primitive_type().java_source_representation()))
            }
            ValueConversion::Box(from) => {
                let primitive = value.convert_primitive(*from).ok_or_else(|| InvokeError::class_cast(format!("{:?}", value), from.wrapper_class().to_str()))?;
                Ok(JavaValue::boxed(primitive))
            }
            ValueConversion::Unbox(to) => unbox_widening(&value, *to),
            ValueConversion::Cast(to) => {
                if let Some(object) = value.to_object()? {
                    if !instance_of(jvm, object.as_ref(), to) {
                        return Err(InvokeError::class_cast(object.runtime_type().java_source_representation(), to.java_source_representation()));
                    }
                }
                Ok(value)
            }
            ValueConversion::Zero(to) => Ok(default_value(to)),
            ValueConversion::Discard => Ok(JavaValue::Top),
        }
    }
}

fn unbox_widening(value: &JavaValue, to: Wrapper) -> InvokeResult<JavaValue> {
    let object = value.to_object_nonnull(&format!("cannot unbox null to {}", to.primitive_type().java_source_representation()))?;
    let primitive = value.try_unbox().ok_or_else(|| InvokeError::class_cast(object.runtime_type().java_source_representation(), to.wrapper_class().to_str().replace('/', ".")))?;
    match primitive.primitive_wrapper() {
        Some(from) if to.is_convertible_from(from) => primitive.convert_primitive(to).ok_or_else(|| InvokeError::class_cast(object.runtime_type().java_source_representation(), to.primitive_type().java_source_representation())),
        _ => Err(InvokeError::class_cast(object.runtime_type().java_source_representation(), to.wrapper_class().to_str().replace('/', "."))),
    }
}

#[cfg(test)]
pub mod test {
    use rust_jvm_common::compressed_classfile::CPDType;
    use rust_jvm_common::compressed_classfile::names::CClassName;
    use rust_jvm_common::primitive_wrapper::Wrapper;

    use crate::exceptions::InvokeError;
    use crate::java_values::JavaValue;
    use crate::jvm_state::JVMState;
    use crate::options::JVMOptions;
    use crate::stdlib::java::lang::invoke::value_conversions::{value_conversion, ValueConversion};

    #[test]
    pub fn conversion_selection() {
        assert_eq!(value_conversion(&CPDType::IntType, &CPDType::IntType), None);
        assert_eq!(value_conversion(&CPDType::IntType, &CPDType::object()), Some(ValueConversion::Box(Wrapper::Int)));
        assert_eq!(value_conversion(&CPDType::object(), &CPDType::LongType), Some(ValueConversion::Unbox(Wrapper::Long)));
        assert_eq!(value_conversion(&CPDType::string(), &CPDType::object()), None);
        assert_eq!(value_conversion(&CPDType::object(), &CPDType::string()), Some(ValueConversion::Cast(CPDType::string())));
        assert_eq!(value_conversion(&CPDType::VoidType, &CPDType::IntType), Some(ValueConversion::Zero(CPDType::IntType)));
        assert_eq!(value_conversion(&CPDType::IntType, &CPDType::VoidType), Some(ValueConversion::Discard));
    }

    #[test]
    pub fn strict_unboxing() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        let unbox_long = ValueConversion::Unbox(Wrapper::Long);
        assert_eq!(unbox_long.apply(&jvm, JavaValue::boxed(JavaValue::Int(4))).unwrap(), JavaValue::Long(4));
        assert!(matches!(unbox_long.apply(&jvm, JavaValue::null()), Err(InvokeError::NullPointer(_))));
        assert!(matches!(ValueConversion::Unbox(Wrapper::Int).apply(&jvm, JavaValue::boxed(JavaValue::Long(4))), Err(InvokeError::ClassCast { .. })));
        assert!(matches!(ValueConversion::Unbox(Wrapper::Int).apply(&jvm, JavaValue::new_string("4")), Err(InvokeError::ClassCast { .. })));
        let cast = ValueConversion::Cast(CPDType::Class(CClassName::int()));
        assert!(cast.apply(&jvm, JavaValue::null()).unwrap().is_null());
        assert!(cast.apply(&jvm, JavaValue::new_string("x")).is_err());
    }
}
