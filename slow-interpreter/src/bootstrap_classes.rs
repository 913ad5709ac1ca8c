use std::cmp::Ordering;
use std::sync::Arc;

use itertools::Itertools;
use strum::IntoEnumIterator;

use rust_jvm_common::classfile::{ACC_ABSTRACT, ACC_FINAL, ACC_INTERFACE, ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC};
use rust_jvm_common::compressed_classfile::names::{CClassName, FieldName};
use rust_jvm_common::jint;
use rust_jvm_common::loading::LoaderName;
use rust_jvm_common::primitive_wrapper::Wrapper;

use crate::class_loading::{define_class, initialize_class};
use crate::exceptions::{InvokeError, InvokeResult};
use crate::java_values::{ClassMirror, JavaValue, Object};
use crate::jvm_state::JVMState;
use crate::throw_utils::throw_exception;
use crate::view::{ClassView, ClassViewBuilder};

const PUBLIC: u16 = ACC_PUBLIC;
const PUBLIC_STATIC: u16 = ACC_PUBLIC | ACC_STATIC;
const PUBLIC_FINAL: u16 = ACC_PUBLIC | ACC_FINAL;
const PUBLIC_INTERFACE: u16 = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;

pub fn receiver(args: &[JavaValue]) -> InvokeResult<Arc<Object>> {
    arg(args, 0)?.to_object_nonnull("receiver")
}

pub fn arg(args: &[JavaValue], i: usize) -> InvokeResult<&JavaValue> {
    args.get(i).ok_or(InvokeError::IndexOutOfRange { index: i, len: args.len() })
}

fn int_arg(args: &[JavaValue], i: usize) -> InvokeResult<jint> {
    let value = arg(args, i)?;
    value.try_unwrap_int().ok_or_else(|| InvokeError::IllegalState(format!("expected int argument, found {:?}", value)))
}

pub fn identity_hash_code(object: &Arc<Object>) -> jint {
    (Arc::as_ptr(object) as usize >> 3) as jint
}

pub fn string_hash_code(string: &str) -> jint {
    string.encode_utf16().fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

pub fn java_hash_code(object: &Arc<Object>) -> jint {
    match object.as_ref() {
        Object::String(string) => string_hash_code(string),
        Object::Boxed(value) => match value {
            JavaValue::Long(long) => (*long ^ ((*long as u64) >> 32) as i64) as jint,
            JavaValue::Boolean(boolean) => if *boolean != 0 { 1231 } else { 1237 },
            JavaValue::Float(float) => float.to_bits() as jint,
            JavaValue::Double(double) => {
                let bits = double.to_bits();
                (bits ^ (bits >> 32)) as jint
            }
            other => other.try_unwrap_int().unwrap_or(0),
        },
        _ => identity_hash_code(object),
    }
}

pub fn java_equals(a: &Arc<Object>, b: &Arc<Object>) -> bool {
    match (a.as_ref(), b.as_ref()) {
        (Object::String(a), Object::String(b)) => a == b,
        (Object::Boxed(a), Object::Boxed(b)) => a.primitive_wrapper() == b.primitive_wrapper() && a == b,
        _ => Arc::ptr_eq(a, b),
    }
}

fn boxed_to_string(value: &JavaValue) -> String {
    match value {
        JavaValue::Long(long) => long.to_string(),
        JavaValue::Int(int) => int.to_string(),
        JavaValue::Short(short) => short.to_string(),
        JavaValue::Byte(byte) => byte.to_string(),
        JavaValue::Boolean(boolean) => (*boolean != 0).to_string(),
        JavaValue::Char(char) => String::from_utf16_lossy(&[*char]),
        JavaValue::Float(float) => format!("{:?}", float),
        JavaValue::Double(double) => format!("{:?}", double),
        JavaValue::Object(_) | JavaValue::Top => "null".to_string(),
    }
}

pub fn java_to_string(object: &Arc<Object>) -> String {
    match object.as_ref() {
        Object::String(string) => string.clone(),
        Object::Boxed(value) => boxed_to_string(value),
        Object::Class(ClassMirror { cpdtype }) => format!("class {}", cpdtype.java_source_representation()),
        Object::MethodType(method_type) => method_type.to_string(),
        Object::MethodHandle(method_handle) => format!("MethodHandle{}", method_handle.type_()),
        Object::MemberName(member_name) => member_name.to_string(),
        _ => {
            let type_name = object.runtime_type().java_source_representation();
            match object.detail_message() {
                Some(message) => format!("{}: {}", type_name, message),
                None => format!("{}@{:x}", type_name, identity_hash_code(object)),
            }
        }
    }
}

fn unboxed_receiver(args: &[JavaValue]) -> InvokeResult<JavaValue> {
    match receiver(args)?.as_ref() {
        Object::Boxed(value) => Ok(value.clone()),
        other => Err(InvokeError::class_cast(other.runtime_type().java_source_representation(), "java.lang.Number")),
    }
}

fn compare_boxed(a: &JavaValue, b: &JavaValue) -> Option<Ordering> {
    match (a, b) {
        (JavaValue::Float(a), JavaValue::Float(b)) => a.partial_cmp(b),
        (JavaValue::Double(a), JavaValue::Double(b)) => a.partial_cmp(b),
        (JavaValue::Long(a), JavaValue::Long(b)) => Some(a.cmp(b)),
        (a, b) => Some(a.try_unwrap_int()?.cmp(&b.try_unwrap_int()?)),
    }
}

fn value_method_name(wrapper: Wrapper) -> String {
    format!("{}Value", wrapper.primitive_type().java_source_representation())
}

fn wrapper_class(wrapper: Wrapper) -> InvokeResult<ClassView> {
    let primitive_desc = wrapper.primitive_type().jvm_representation();
    let wrapper_desc = wrapper.wrapper_type().jvm_representation();
    let super_class = if wrapper.is_numeric() && wrapper != Wrapper::Char { CClassName::number() } else { CClassName::object() };
    let mut builder = ClassView::builder(wrapper.wrapper_class())
        .super_class(Some(super_class))
        .access_flags(PUBLIC_FINAL)
        .interface(CClassName::serializable())
        .interface(CClassName::comparable())
        .method("valueOf", format!("({}){}", primitive_desc, wrapper_desc).as_str(), PUBLIC_STATIC, move |_, args| {
            let value = arg(&args, 0)?.convert_primitive(wrapper).ok_or_else(|| InvokeError::IllegalState("expected primitive".to_string()))?;
            Ok(JavaValue::boxed(value))
        })
        .method("compareTo", "(Ljava/lang/Object;)I", PUBLIC, move |_, args| {
            let this = unboxed_receiver(&args)?;
            let other = arg(&args, 1)?;
            let other = other.try_unbox().filter(|other| other.primitive_wrapper() == Some(wrapper))
                .ok_or_else(|| InvokeError::class_cast(format!("{:?}", other), wrapper.wrapper_class()))?;
            Ok(JavaValue::Int(match compare_boxed(&this, &other) {
                Some(Ordering::Less) => -1,
                Some(Ordering::Equal) | None => 0,
                Some(Ordering::Greater) => 1,
            }))
        });
    let value_methods = if super_class == CClassName::number() {
        vec![Wrapper::Int, Wrapper::Long, Wrapper::Float, Wrapper::Double, wrapper]
    } else {
        vec![wrapper]
    };
    for target in value_methods.into_iter().unique() {
        let desc = format!("(){}", target.primitive_type().jvm_representation());
        builder = builder.method(value_method_name(target).as_str(), desc.as_str(), PUBLIC, move |_, args| {
            unboxed_receiver(&args)?.convert_primitive(target).ok_or_else(|| InvokeError::IllegalState("expected primitive".to_string()))
        });
    }
    if wrapper == Wrapper::Int {
        builder = builder.method("parseInt", "(Ljava/lang/String;)I", PUBLIC_STATIC, |jvm, args| {
            let string = arg(&args, 0)?.try_unwrap_string().ok_or_else(|| throw_exception(jvm, CClassName::new("java/lang/NumberFormatException"), "null"))?;
            string.parse::<jint>().map(JavaValue::Int)
                .map_err(|_| throw_exception(jvm, CClassName::new("java/lang/NumberFormatException"), format!("For input string: \"{}\"", string).as_str()))
        });
    }
    builder.build()
}

fn exception_class(name: &str, super_class: CClassName) -> InvokeResult<ClassView> {
    with_exception_constructors(ClassView::builder(CClassName::new(name)).super_class(Some(super_class))).build()
}

fn with_exception_constructors(builder: ClassViewBuilder) -> ClassViewBuilder {
    builder
        .method("<init>", "()V", PUBLIC, |_, _| Ok(JavaValue::Top))
        .method("<init>", "(Ljava/lang/String;)V", PUBLIC, |_, args| {
            let this = receiver(&args)?;
            if let Object::Normal(normal) = this.as_ref() {
                if let Some(field_number) = normal.class.lookup_instance_field(CClassName::throwable(), FieldName::new("detailMessage")) {
                    normal.fields.write()[field_number.number] = arg(&args, 1)?.clone();
                }
            }
            Ok(JavaValue::Top)
        })
}

fn bootstrap_class_views() -> InvokeResult<Vec<ClassView>> {
    let mut views = vec![
        ClassView::builder(CClassName::object())
            .super_class(None)
            .method("<init>", "()V", PUBLIC, |_, _| Ok(JavaValue::Top))
            .method("hashCode", "()I", PUBLIC, |_, args| Ok(JavaValue::Int(java_hash_code(&receiver(&args)?))))
            .method("equals", "(Ljava/lang/Object;)Z", PUBLIC, |_, args| {
                let this = receiver(&args)?;
                Ok(JavaValue::Boolean(match arg(&args, 1)?.to_object()? {
                    None => 0,
                    Some(other) => java_equals(&this, &other) as u8,
                }))
            })
            .method("toString", "()Ljava/lang/String;", PUBLIC, |_, args| Ok(JavaValue::new_string(java_to_string(&receiver(&args)?))))
            .method("getClass", "()Ljava/lang/Class;", PUBLIC_FINAL, |_, args| {
                Ok(JavaValue::new_object(Object::Class(ClassMirror { cpdtype: receiver(&args)?.runtime_type() })))
            })
            .build()?,
        ClassView::builder(CClassName::serializable()).access_flags(PUBLIC_INTERFACE).build()?,
        ClassView::builder(CClassName::cloneable()).access_flags(PUBLIC_INTERFACE).build()?,
        ClassView::builder(CClassName::comparable()).access_flags(PUBLIC_INTERFACE)
            .abstract_method("compareTo", "(Ljava/lang/Object;)I", PUBLIC)
            .build()?,
        ClassView::builder(CClassName::char_sequence()).access_flags(PUBLIC_INTERFACE)
            .abstract_method("length", "()I", PUBLIC)
            .abstract_method("charAt", "(I)C", PUBLIC)
            .abstract_method("toString", "()Ljava/lang/String;", PUBLIC)
            .build()?,
        ClassView::builder(CClassName::number()).access_flags(ACC_PUBLIC | ACC_ABSTRACT)
            .interface(CClassName::serializable())
            .method("<init>", "()V", PUBLIC, |_, _| Ok(JavaValue::Top))
            .abstract_method("intValue", "()I", PUBLIC)
            .abstract_method("longValue", "()J", PUBLIC)
            .abstract_method("floatValue", "()F", PUBLIC)
            .abstract_method("doubleValue", "()D", PUBLIC)
            .build()?,
    ];
    for wrapper in Wrapper::iter().filter(|wrapper| !wrapper.is_other()) {
        views.push(wrapper_class(wrapper)?);
    }
    views.push(ClassView::builder(CClassName::void()).access_flags(PUBLIC_FINAL).build()?);
    views.push(ClassView::builder(CClassName::string()).access_flags(PUBLIC_FINAL)
        .interface(CClassName::serializable())
        .interface(CClassName::comparable())
        .interface(CClassName::char_sequence())
        .method("length", "()I", PUBLIC, |_, args| Ok(JavaValue::Int(string_receiver(&args)?.encode_utf16().count() as jint)))
        .method("isEmpty", "()Z", PUBLIC, |_, args| Ok(JavaValue::Boolean(string_receiver(&args)?.is_empty() as u8)))
        .method("charAt", "(I)C", PUBLIC, |jvm, args| {
            let string = string_receiver(&args)?;
            let index = int_arg(&args, 1)?;
            usize::try_from(index).ok()
                .and_then(|index| string.encode_utf16().nth(index))
                .map(JavaValue::Char)
                .ok_or_else(|| throw_exception(jvm, CClassName::new("java/lang/StringIndexOutOfBoundsException"), format!("index {}", index).as_str()))
        })
        .method("concat", "(Ljava/lang/String;)Ljava/lang/String;", PUBLIC, |jvm, args| {
            let string = string_receiver(&args)?;
            let other = arg(&args, 1)?.try_unwrap_string().ok_or_else(|| throw_exception(jvm, CClassName::new("java/lang/NullPointerException"), "concat"))?;
            Ok(JavaValue::new_string(string + other.as_str()))
        })
        .method("compareTo", "(Ljava/lang/Object;)I", PUBLIC, |_, args| {
            let string = string_receiver(&args)?;
            let other = arg(&args, 1)?;
            let other = other.try_unwrap_string().ok_or_else(|| InvokeError::class_cast(format!("{:?}", other), CClassName::string()))?;
            Ok(JavaValue::Int(string.encode_utf16().zip_longest(other.encode_utf16())
                .find_map(|pair| match pair {
                    itertools::EitherOrBoth::Both(a, b) if a != b => Some(a as jint - b as jint),
                    itertools::EitherOrBoth::Both(_, _) => None,
                    itertools::EitherOrBoth::Left(_) | itertools::EitherOrBoth::Right(_) => Some(string.encode_utf16().count() as jint - other.encode_utf16().count() as jint),
                })
                .unwrap_or(0)))
        })
        .method("valueOf", "(Ljava/lang/Object;)Ljava/lang/String;", PUBLIC_STATIC, |_, args| {
            Ok(JavaValue::new_string(match arg(&args, 0)?.to_object()? {
                None => "null".to_string(),
                Some(object) => java_to_string(&object),
            }))
        })
        .build()?);
    views.push(ClassView::builder(CClassName::class()).access_flags(PUBLIC_FINAL)
        .interface(CClassName::serializable())
        .method("getName", "()Ljava/lang/String;", PUBLIC, |_, args| match receiver(&args)?.as_ref() {
            Object::Class(mirror) => Ok(JavaValue::new_string(mirror.cpdtype.java_source_representation())),
            other => Err(InvokeError::class_cast(other.runtime_type().java_source_representation(), CClassName::class())),
        })
        .build()?);
    views.push(with_exception_constructors(ClassView::builder(CClassName::throwable()))
        .interface(CClassName::serializable())
        .field("detailMessage", "Ljava/lang/String;", ACC_PRIVATE)
        .method("getMessage", "()Ljava/lang/String;", PUBLIC, |_, args| {
            Ok(receiver(&args)?.detail_message().map(JavaValue::new_string).unwrap_or_else(JavaValue::null))
        })
        .build()?);
    views.push(exception_class("java/lang/Exception", CClassName::throwable())?);
    views.push(exception_class("java/lang/RuntimeException", CClassName::exception())?);
    for (name, super_name) in [
        ("java/lang/IllegalArgumentException", "java/lang/RuntimeException"),
        ("java/lang/NumberFormatException", "java/lang/IllegalArgumentException"),
        ("java/lang/IllegalStateException", "java/lang/RuntimeException"),
        ("java/lang/NullPointerException", "java/lang/RuntimeException"),
        ("java/lang/IndexOutOfBoundsException", "java/lang/RuntimeException"),
        ("java/lang/StringIndexOutOfBoundsException", "java/lang/IndexOutOfBoundsException"),
    ] {
        views.push(exception_class(name, CClassName::new(super_name))?);
    }
    views.push(ClassView::builder(CClassName::method_handle()).access_flags(ACC_PUBLIC | ACC_ABSTRACT)
        .method("type", "()Ljava/lang/invoke/MethodType;", PUBLIC, |_, args| Ok(arg(&args, 0)?.to_method_handle()?.type_().clone().into()))
        .method("isVarargsCollector", "()Z", PUBLIC, |_, args| Ok(JavaValue::Boolean(arg(&args, 0)?.to_method_handle()?.is_varargs_collector() as u8)))
        .method("asFixedArity", "()Ljava/lang/invoke/MethodHandle;", PUBLIC, |_, args| Ok(arg(&args, 0)?.to_method_handle()?.as_fixed_arity().into()))
        .method("bindTo", "(Ljava/lang/Object;)Ljava/lang/invoke/MethodHandle;", PUBLIC, |jvm, args| {
            Ok(arg(&args, 0)?.to_method_handle()?.bind_to(jvm, arg(&args, 1)?.clone())?.into())
        })
        .build()?);
    views.push(ClassView::builder(CClassName::method_type()).access_flags(PUBLIC_FINAL)
        .interface(CClassName::serializable())
        .method("parameterCount", "()I", PUBLIC, |_, args| Ok(JavaValue::Int(arg(&args, 0)?.to_method_type()?.parameter_count() as jint)))
        .method("returnType", "()Ljava/lang/Class;", PUBLIC, |_, args| {
            Ok(JavaValue::new_object(Object::Class(ClassMirror { cpdtype: arg(&args, 0)?.to_method_type()?.return_type() })))
        })
        .method("toMethodDescriptorString", "()Ljava/lang/String;", PUBLIC, |_, args| {
            Ok(JavaValue::new_string(arg(&args, 0)?.to_method_type()?.to_method_descriptor_string()))
        })
        .build()?);
    views.push(ClassView::builder(CClassName::member_name()).access_flags(ACC_FINAL)
        .method("getName", "()Ljava/lang/String;", PUBLIC, |_, args| Ok(JavaValue::new_string(arg(&args, 0)?.to_member_name()?.name_str())))
        .build()?);
    views.push(ClassView::builder(CClassName::call_site()).access_flags(ACC_PUBLIC | ACC_ABSTRACT)
        .method("type", "()Ljava/lang/invoke/MethodType;", PUBLIC, |_, args| Ok(arg(&args, 0)?.to_call_site()?.type_().clone().into()))
        .method("getTarget", "()Ljava/lang/invoke/MethodHandle;", PUBLIC, |_, args| Ok(arg(&args, 0)?.to_call_site()?.get_target().into()))
        .method("setTarget", "(Ljava/lang/invoke/MethodHandle;)V", PUBLIC, |_, args| {
            arg(&args, 0)?.to_call_site()?.set_target(arg(&args, 1)?.to_method_handle()?)?;
            Ok(JavaValue::Top)
        })
        .method("dynamicInvoker", "()Ljava/lang/invoke/MethodHandle;", PUBLIC, |jvm, args| Ok(arg(&args, 0)?.to_call_site()?.dynamic_invoker(jvm)?.into()))
        .build()?);
    Ok(views)
}

fn string_receiver(args: &[JavaValue]) -> InvokeResult<String> {
    match receiver(args)?.as_ref() {
        Object::String(string) => Ok(string.clone()),
        other => Err(InvokeError::class_cast(other.runtime_type().java_source_representation(), CClassName::string())),
    }
}

/// Defines and initializes the classes every runtime starts with, in dependency order.
pub fn define_bootstrap_classes(jvm: &JVMState) -> InvokeResult<()> {
    let classes = bootstrap_class_views()?.into_iter()
        .map(|view| define_class(jvm, view, LoaderName::BootstrapLoader))
        .collect::<InvokeResult<Vec<_>>>()?;
    for class in classes.iter() {
        initialize_class(jvm, class)?;
    }
    Ok(())
}
