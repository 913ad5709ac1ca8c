use std::sync::Arc;

use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::compressed_classfile::names::CClassName;

use crate::class_loading::check_loaded_class;
use crate::exceptions::InvokeResult;
use crate::java_values::Object;
use crate::jvm_state::JVMState;
use crate::runtime_class::RuntimeClass;

pub fn instance_of(jvm: &JVMState, obj: &Object, expected_type: &CPDType) -> bool {
    is_assignable(jvm, &obj.runtime_type(), expected_type)
}

/// Whether a reference of type `from` may be stored in a variable of type `to`. Primitives are only assignable to themselves.
pub fn is_assignable(jvm: &JVMState, from: &CPDType, to: &CPDType) -> bool {
    if from == to {
        return true;
    }
    if from.is_primitive() || to.is_primitive() {
        return false;
    }
    if to.is_object() {
        return true;
    }
    match from {
        CPDType::Array { .. } => {
            //If S is a class representing the array type SC[], that is, an array
            // of components of type SC, then:
            match to {
                CPDType::Array { .. } => {
                    //If T is an array type TC[], that is, an array of components of
                    // type TC, then one of the following must be true:
                    //TC and SC are the same primitive type
                    //TC and SC are reference types, and type SC can be cast to TC
                    // by these run-time rules
                    let from_component = from.unwrap_array_type();
                    let to_component = to.unwrap_array_type();
                    from_component.is_reference() && is_assignable(jvm, &from_component, &to_component)
                }
                CPDType::Class(to_class) => {
                    //If T is an interface type, then T must be one of the interfaces
                    // implemented by arrays (JLS §4.10.3).
                    //If T is a class type, then T must be Object
                    *to_class == CClassName::cloneable() || *to_class == CClassName::serializable()
                }
                _ => false,
            }
        }
        CPDType::Class(from_class) => {
            match to {
                CPDType::Class(to_class) => {
                    //If S is an ordinary (nonarray) class, then:
                    // If T is an interface type, then S must implement interface T.
                    // If T is a class type, then S must be the same class as T, or S
                    // must be a subclass of T;
                    match jvm.lookup_class(*from_class) {
                        None => false,
                        Some(from_class) => from_class.implements(*to_class),
                    }
                }
                _ => false,
            }
        }
        _ => false,
    }
}

/// The class whose methods an object responds to. Arrays respond to `Object`'s methods.
pub fn object_runtime_class(jvm: &JVMState, obj: &Object) -> InvokeResult<Arc<RuntimeClass>> {
    match obj {
        Object::Normal(normal) => Ok(normal.class.clone()),
        Object::Array(_) => check_loaded_class(jvm, CClassName::object()),
        other => check_loaded_class(jvm, other.runtime_type().unwrap_class_type()),
    }
}
