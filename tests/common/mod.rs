#![allow(dead_code)]

use std::sync::Arc;

use rust_jvm_common::classfile::{ACC_ABSTRACT, ACC_INTERFACE, ACC_PUBLIC, ACC_STATIC, ACC_VARARGS};
use rust_jvm_common::compressed_classfile::names::{CClassName, FieldName};
use slow_interpreter::bootstrap_classes::{arg, receiver};
use slow_interpreter::class_loading::define_class;
use slow_interpreter::java_values::JavaValue;
use slow_interpreter::runtime_class::RuntimeClass;
use slow_interpreter::throw_utils::throw_exception;
use slow_interpreter::view::ClassView;

use rust_jvm_invoke::{JVMOptions, JVMState, MethodType};

pub fn jvm() -> JVMState {
    JVMState::new(JVMOptions::default()).unwrap()
}

pub fn method_type(desc: &str) -> MethodType {
    MethodType::from_method_descriptor_string(desc).unwrap()
}

pub fn counter() -> CClassName {
    CClassName::new("demo/Counter")
}

pub fn named() -> CClassName {
    CClassName::new("demo/Named")
}

pub fn greeter() -> CClassName {
    CClassName::new("demo/Greeter")
}

pub fn set_static(class: &RuntimeClass, name: &str, value: JavaValue) {
    let number = class.lookup_static_field(FieldName::new(name)).unwrap().number;
    class.static_vars.write()[number] = value;
}

pub fn ints(values: &[i32]) -> Vec<JavaValue> {
    values.iter().map(|value| JavaValue::Int(*value)).collect()
}

/// `demo/Counter`: static arithmetic helpers, a varargs counter, an instance counter and a method that throws.
pub fn define_counter(jvm: &JVMState) -> Arc<RuntimeClass> {
    define_class(jvm, ClassView::builder(counter())
        .field("count", "I", ACC_PUBLIC)
        .field("total", "I", ACC_PUBLIC | ACC_STATIC)
        .method("<init>", "()V", ACC_PUBLIC, |_, _| Ok(JavaValue::Top))
        .method("zero", "()I", ACC_PUBLIC | ACC_STATIC, |_, _| Ok(JavaValue::Int(0)))
        .method("negate", "(I)I", ACC_PUBLIC | ACC_STATIC, |_, args| Ok(JavaValue::Int(arg(&args, 0)?.unwrap_int().wrapping_neg())))
        .method("sub", "(II)I", ACC_PUBLIC | ACC_STATIC, |_, args| Ok(JavaValue::Int(arg(&args, 0)?.unwrap_int().wrapping_sub(arg(&args, 1)?.unwrap_int()))))
        .method("count", "([Ljava/lang/Object;)I", ACC_PUBLIC | ACC_STATIC | ACC_VARARGS, |_, args| {
            let array = arg(&args, 0)?.to_object_nonnull("count")?;
            Ok(JavaValue::Int(array.unwrap_array().len() as i32))
        })
        .method("increment", "()I", ACC_PUBLIC, |_, args| {
            let this = receiver(&args)?;
            let normal = this.unwrap_normal_object();
            let number = normal.class.lookup_instance_field(counter(), FieldName::new("count")).unwrap().number;
            let mut fields = normal.fields.write();
            let next = fields[number].unwrap_int() + 1;
            fields[number] = JavaValue::Int(next);
            Ok(JavaValue::Int(next))
        })
        .method("fail", "()V", ACC_PUBLIC | ACC_STATIC, |jvm, _| Err(throw_exception(jvm, CClassName::new("java/lang/IllegalStateException"), "boom")))
        .build().unwrap(), jvm.new_loader()).unwrap()
}

/// `demo/Named`, an interface with a default `toString`, and `demo/Greeter`, which overrides it.
pub fn define_greeter(jvm: &JVMState) -> Arc<RuntimeClass> {
    let loader = jvm.new_loader();
    define_class(jvm, ClassView::builder(named())
        .access_flags(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
        .method("toString", "()Ljava/lang/String;", ACC_PUBLIC, |_, _| Ok(JavaValue::new_string("named")))
        .abstract_method("name", "()Ljava/lang/String;", ACC_PUBLIC)
        .build().unwrap(), loader).unwrap();
    define_class(jvm, ClassView::builder(greeter())
        .interface(named())
        .method("<init>", "()V", ACC_PUBLIC, |_, _| Ok(JavaValue::Top))
        .method("toString", "()Ljava/lang/String;", ACC_PUBLIC, |_, _| Ok(JavaValue::new_string("greeter")))
        .method("name", "()Ljava/lang/String;", ACC_PUBLIC, |_, _| Ok(JavaValue::new_string("hello")))
        .build().unwrap(), loader).unwrap()
}
