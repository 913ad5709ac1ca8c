use std::sync::Arc;

use parking_lot::RwLock;

use rust_jvm_common::compressed_classfile::CPDType;

use crate::java_values::{ArrayObject, default_value, JavaValue, NormalObject, Object};
use crate::runtime_class::RuntimeClass;

pub fn new_object(runtime_class: &Arc<RuntimeClass>) -> JavaValue {
    let fields = runtime_class.instance_field_types().iter().map(default_value).collect();
    JavaValue::new_object(Object::Normal(NormalObject { class: runtime_class.clone(), fields: RwLock::new(fields) }))
}

pub fn new_array(elem_type: CPDType, elems: Vec<JavaValue>) -> JavaValue {
    JavaValue::new_object(Object::Array(ArrayObject { elem_type, elems: RwLock::new(elems) }))
}

pub fn new_default_array(elem_type: CPDType, len: usize) -> JavaValue {
    new_array(elem_type, vec![default_value(&elem_type); len])
}
