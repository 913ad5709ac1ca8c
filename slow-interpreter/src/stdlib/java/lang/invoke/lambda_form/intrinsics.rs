use std::sync::Arc;
use std::sync::atomic::{fence, Ordering};

use parking_lot::RwLock;

use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::primitive_wrapper::Wrapper;

use crate::class_loading::{check_loaded_class, initialize_class};
use crate::exceptions::{InvokeError, InvokeResult};
use crate::instance_of_common::{instance_of, object_runtime_class};
use crate::interpreter_util::{new_array, new_object};
use crate::java_values::{JavaValue, Object};
use crate::jvm_state::JVMState;
use crate::resolvers::methods::{MethodLocation, select_method};
use crate::runtime_class::RuntimeClass;
use crate::stdlib::java::lang::invoke::direct_method_handle::{DirectMethodHandle, DirectVariant, ensure_initialized};
use crate::stdlib::java::lang::invoke::lambda_form::named_function::{Intrinsic, IntrinsicImpl, IntrinsicKind};
use crate::stdlib::java::lang::invoke::method_handle::MethodHandle;
use crate::stdlib::java::lang::invoke::method_type::MethodType;
use crate::view::HasAccessFlags;

pub(crate) fn implementation(kind: IntrinsicKind) -> IntrinsicImpl {
    match kind {
        IntrinsicKind::InvokeBasic => invoke_basic,
        IntrinsicKind::LinkToVirtual => link_to_virtual,
        IntrinsicKind::LinkToStatic => link_to_static,
        IntrinsicKind::LinkToSpecial => link_to_special,
        IntrinsicKind::LinkToInterface => link_to_interface,
        IntrinsicKind::InternalMemberName => internal_member_name,
        IntrinsicKind::InternalMemberNameEnsureInit => internal_member_name_ensure_init,
        IntrinsicKind::ConstructorMethod => constructor_method,
        IntrinsicKind::AllocateInstance => allocate_instance,
        IntrinsicKind::EnsureInitialized => ensure_initialized_barrier,
        IntrinsicKind::CheckReceiver => check_receiver,
        IntrinsicKind::CheckBase => check_base,
        IntrinsicKind::CheckCast => check_cast,
        IntrinsicKind::FieldOffset => field_offset,
        IntrinsicKind::StaticBase => static_base,
        IntrinsicKind::StaticOffset => static_offset,
        IntrinsicKind::GetField => get_field,
        IntrinsicKind::PutField => put_field,
        IntrinsicKind::BoundArgument => bound_argument,
        IntrinsicKind::DelegateTarget => delegate_target,
        IntrinsicKind::CheckExactType => check_exact_type,
        IntrinsicKind::CheckGenericType => check_generic_type,
        IntrinsicKind::SpreadTarget => spread_target,
        IntrinsicKind::GetCallSiteTarget => get_call_site_target,
        IntrinsicKind::CheckSpreadArgument => check_spread_argument,
        IntrinsicKind::ArrayElement => array_element,
        IntrinsicKind::NewArray => new_array_of,
        IntrinsicKind::Convert => convert,
        IntrinsicKind::ThrowUninitializedCallSite => throw_uninitialized_call_site,
        IntrinsicKind::Identity => identity,
    }
}

fn arg(args: &[JavaValue], i: usize) -> InvokeResult<&JavaValue> {
    args.get(i).ok_or(InvokeError::IndexOutOfRange { index: i, len: args.len() })
}

fn handle_arg(args: &[JavaValue], i: usize) -> InvokeResult<MethodHandle> {
    arg(args, i)?.to_method_handle()
}

fn direct<'l>(method_handle: &'l MethodHandle, intrinsic: Intrinsic) -> InvokeResult<&'l DirectMethodHandle> {
    method_handle.kind().try_unwrap_direct().ok_or_else(|| InvokeError::IllegalState(format!("{} applied to non-direct handle {}", intrinsic.name(), method_handle.type_())))
}

fn offset_arg(args: &[JavaValue], i: usize) -> InvokeResult<usize> {
    let offset = arg(args, i)?.try_unwrap_long().ok_or_else(|| InvokeError::IllegalState("field offset is not a long".to_string()))?;
    usize::try_from(offset).map_err(|_| InvokeError::IllegalState(format!("bad field offset {}", offset)))
}

fn invoke_basic(jvm: &JVMState, _: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let method_handle = handle_arg(&args, 0)?;
    method_handle.form().invoke(jvm, args)
}

/// Splits off the trailing member name and returns the method it was resolved to.
fn split_member(mut args: Vec<JavaValue>) -> InvokeResult<(Vec<JavaValue>, MethodLocation)> {
    let member = args.pop().ok_or(InvokeError::IndexOutOfRange { index: 0, len: 0 })?.to_member_name()?;
    let location = member.method_location()?.clone();
    Ok((args, location))
}

fn call_method(jvm: &JVMState, location: &MethodLocation, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let view = location.view();
    match view.body.as_ref() {
        Some(body) => body(jvm, args),
        None if view.is_abstract() => Err(InvokeError::Linkage(format!("AbstractMethodError: {}.{}", location.class.view.name().to_str(), view.shape()))),
        None => Err(InvokeError::Linkage(format!("UnsatisfiedLinkError: {}.{}", location.class.view.name().to_str(), view.shape()))),
    }
}

fn receiver_class(jvm: &JVMState, args: &[JavaValue], location: &MethodLocation) -> InvokeResult<Arc<RuntimeClass>> {
    let receiver = arg(args, 0)?.to_object()?.ok_or_else(|| InvokeError::NullPointer(format!("null receiver for {}.{}", location.class.view.name().to_str(), location.view().shape())))?;
    object_runtime_class(jvm, receiver.as_ref())
}

fn link_to_static(jvm: &JVMState, _: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let (args, location) = split_member(args)?;
    call_method(jvm, &location, args)
}

fn link_to_special(jvm: &JVMState, _: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let (args, location) = split_member(args)?;
    receiver_class(jvm, &args, &location)?;
    call_method(jvm, &location, args)
}

fn link_to_virtual(jvm: &JVMState, _: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let (args, location) = split_member(args)?;
    let receiver_class = receiver_class(jvm, &args, &location)?;
    let selected = select_method(jvm, &receiver_class, &location).map_err(|failure| failure.to_error())?;
    call_method(jvm, &selected, args)
}

fn link_to_interface(jvm: &JVMState, _: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let (args, location) = split_member(args)?;
    let receiver_class = receiver_class(jvm, &args, &location)?;
    let interface = location.class.view.name();
    if !receiver_class.implements(interface) {
        return Err(InvokeError::Linkage(format!("IncompatibleClassChangeError: Class {} does not implement the requested interface {}", receiver_class.view.name().to_str(), interface.to_str())));
    }
    let selected = select_method(jvm, &receiver_class, &location).map_err(|failure| failure.to_error())?;
    call_method(jvm, &selected, args)
}

fn internal_member_name(_: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let method_handle = handle_arg(&args, 0)?;
    Ok(direct(&method_handle, intrinsic)?.member().clone().into())
}

fn internal_member_name_ensure_init(jvm: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let method_handle = handle_arg(&args, 0)?;
    ensure_initialized(jvm, &method_handle)?;
    Ok(direct(&method_handle, intrinsic)?.member().clone().into())
}

fn constructor_method(_: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let method_handle = handle_arg(&args, 0)?;
    match direct(&method_handle, intrinsic)?.variant() {
        DirectVariant::Constructor { init_method, .. } => Ok(init_method.clone().into()),
        _ => Err(InvokeError::IllegalState(format!("{} is not a constructor handle", method_handle.type_()))),
    }
}

fn allocate_instance(jvm: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let method_handle = handle_arg(&args, 0)?;
    match direct(&method_handle, intrinsic)?.variant() {
        DirectVariant::Constructor { instance_class, .. } => {
            initialize_class(jvm, instance_class)?;
            Ok(new_object(instance_class))
        }
        _ => Err(InvokeError::IllegalState(format!("{} is not a constructor handle", method_handle.type_()))),
    }
}

fn ensure_initialized_barrier(jvm: &JVMState, _: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    ensure_initialized(jvm, &handle_arg(&args, 0)?)?;
    Ok(JavaValue::Top)
}

fn check_receiver(jvm: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let method_handle = handle_arg(&args, 0)?;
    let receiver = arg(&args, 1)?.clone();
    if let DirectVariant::Interface { ref_class } = direct(&method_handle, intrinsic)?.variant() {
        let object = receiver.to_object_nonnull("interface receiver")?;
        if !instance_of(jvm, object.as_ref(), &CPDType::Class(*ref_class)) {
            return Err(InvokeError::class_cast(object.runtime_type().java_source_representation(), CPDType::Class(*ref_class).java_source_representation()));
        }
    }
    Ok(receiver)
}

fn check_base(_: &JVMState, _: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let base = arg(&args, 0)?;
    if base.is_null() {
        return Err(InvokeError::NullPointer("field access on null object".to_string()));
    }
    Ok(base.clone())
}

fn check_cast(jvm: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let method_handle = handle_arg(&args, 0)?;
    let value = arg(&args, 1)?.clone();
    let field_type = match direct(&method_handle, intrinsic)?.variant() {
        DirectVariant::Accessor { field_type, .. } | DirectVariant::StaticAccessor { field_type, .. } => *field_type,
        _ => return Err(InvokeError::IllegalState(format!("{} is not a field accessor", method_handle.type_()))),
    };
    if let Some(object) = value.to_object()? {
        if !instance_of(jvm, object.as_ref(), &field_type) {
            return Err(InvokeError::class_cast(object.runtime_type().java_source_representation(), field_type.java_source_representation()));
        }
    }
    Ok(value)
}

fn field_offset(_: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let method_handle = handle_arg(&args, 0)?;
    match direct(&method_handle, intrinsic)?.variant() {
        DirectVariant::Accessor { field_offset, .. } => Ok(JavaValue::Long(*field_offset as i64)),
        _ => Err(InvokeError::IllegalState(format!("{} is not an instance field accessor", method_handle.type_()))),
    }
}

fn static_base(_: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let method_handle = handle_arg(&args, 0)?;
    match direct(&method_handle, intrinsic)?.variant() {
        DirectVariant::StaticAccessor { static_base, .. } => Ok(JavaValue::Object(Some(static_base.clone()))),
        _ => Err(InvokeError::IllegalState(format!("{} is not a static field accessor", method_handle.type_()))),
    }
}

fn static_offset(_: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let method_handle = handle_arg(&args, 0)?;
    match direct(&method_handle, intrinsic)?.variant() {
        DirectVariant::StaticAccessor { static_offset, .. } => Ok(JavaValue::Long(*static_offset as i64)),
        _ => Err(InvokeError::IllegalState(format!("{} is not a static field accessor", method_handle.type_()))),
    }
}

/// Runs `access` on the storage behind `base`: an instance's fields, or the statics of a class mirror.
fn with_field_storage<T>(jvm: &JVMState, base: &JavaValue, access: impl FnOnce(&RwLock<Vec<JavaValue>>) -> InvokeResult<T>) -> InvokeResult<T> {
    let base = base.to_object_nonnull("field base")?;
    match base.as_ref() {
        Object::Normal(normal) => access(&normal.fields),
        Object::Class(mirror) => {
            let class_name = mirror.cpdtype.try_unwrap_class_type().ok_or_else(|| InvokeError::IllegalState(format!("no statics in {}", mirror.cpdtype.java_source_representation())))?;
            let class = check_loaded_class(jvm, class_name)?;
            access(&class.static_vars)
        }
        other => Err(InvokeError::IllegalState(format!("{:?} has no fields", other))),
    }
}

fn get_field(jvm: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let Intrinsic::GetField { is_volatile, .. } = intrinsic else { unreachable!() };
    let offset = offset_arg(&args, 1)?;
    with_field_storage(jvm, arg(&args, 0)?, |storage| {
        if is_volatile {
            fence(Ordering::SeqCst);
        }
        let guard = storage.read();
        guard.get(offset).cloned().ok_or(InvokeError::IndexOutOfRange { index: offset, len: guard.len() })
    })
}

fn put_field(jvm: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let Intrinsic::PutField { field_kind, is_volatile } = intrinsic else { unreachable!() };
    let offset = offset_arg(&args, 1)?;
    let value = arg(&args, 2)?;
    let value = match field_kind {
        Wrapper::Object | Wrapper::Void => value.clone(),
        primitive => value.convert_primitive(primitive).ok_or_else(|| InvokeError::class_cast(format!("{:?}", value), primitive.primitive_type().java_source_representation()))?,
    };
    with_field_storage(jvm, arg(&args, 0)?, |storage| {
        let mut guard = storage.write();
        let len = guard.len();
        *guard.get_mut(offset).ok_or(InvokeError::IndexOutOfRange { index: offset, len })? = value;
        drop(guard);
        if is_volatile {
            fence(Ordering::SeqCst);
        }
        Ok(JavaValue::Top)
    })
}

fn bound_argument(_: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let Intrinsic::BoundArgument(i) = intrinsic else { unreachable!() };
    let method_handle = handle_arg(&args, 0)?;
    match method_handle.kind().try_unwrap_bound() {
        Some(bound) => bound.arg(i),
        None => Err(InvokeError::IllegalState(format!("{} has no bound arguments", method_handle.type_()))),
    }
}

fn delegate_target(_: &JVMState, _: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let method_handle = handle_arg(&args, 0)?;
    match method_handle.kind().try_unwrap_varargs_collector() {
        Some(collector) => Ok(collector.target().clone().into()),
        None => Err(InvokeError::IllegalState(format!("{} does not delegate", method_handle.type_()))),
    }
}

//the second argument is the invoker's own type, the target type with a leading handle parameter
fn expected_target_type(args: &[JavaValue]) -> InvokeResult<MethodType> {
    arg(args, 1)?.to_method_type()?.drop_parameter_types(0, 1)
}

fn check_exact_type(_: &JVMState, _: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let target = handle_arg(&args, 0)?;
    let expected = expected_target_type(&args)?;
    if *target.type_() != expected {
        return Err(InvokeError::WrongMethodType(format!("expected {} but found {}", expected, target.type_())));
    }
    Ok(target.into())
}

fn check_generic_type(jvm: &JVMState, _: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let target = handle_arg(&args, 0)?;
    let expected = expected_target_type(&args)?;
    Ok(target.as_type(jvm, &expected)?.into())
}

/// `(target, (A..., T[])R, n)`: `target` adapted to `(A..., T * n)R`, then spread to take its trailing arguments from the array.
fn spread_target(jvm: &JVMState, _: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let target = handle_arg(&args, 0)?;
    let pre_spread_type = arg(&args, 1)?.to_method_type()?;
    let spread_count = arg(&args, 2)?.try_unwrap_int().ok_or_else(|| InvokeError::IllegalState("spread count is not an int".to_string()))? as usize;
    let array_type = pre_spread_type.last_parameter_type().ok_or_else(|| InvokeError::IllegalState(format!("no array parameter to spread: {}", pre_spread_type)))?;
    let target_type = pre_spread_type.as_collector_type(&array_type, spread_count)?;
    Ok(target.as_type(jvm, &target_type)?.as_spreader(jvm, &array_type, spread_count)?.into())
}

fn get_call_site_target(_: &JVMState, _: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let call_site = arg(&args, 0)?.to_call_site()?;
    Ok(call_site.get_target().into())
}

fn check_spread_argument(_: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let Intrinsic::CheckSpreadArgument(expected_len) = intrinsic else { unreachable!() };
    let len = match arg(&args, 0)?.to_object()? {
        None => 0,
        Some(array) => match array.as_ref() {
            Object::Array(array) => array.len(),
            other => return Err(InvokeError::class_cast(other.runtime_type().java_source_representation(), "array")),
        },
    };
    if len != expected_len {
        return Err(InvokeError::IllegalArgument(format!("array is not of length {}", expected_len)));
    }
    Ok(JavaValue::Top)
}

fn array_element(_: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let Intrinsic::ArrayElement(i) = intrinsic else { unreachable!() };
    let array = arg(&args, 0)?.to_object_nonnull("spread array")?;
    match array.as_ref() {
        Object::Array(array) => array.get_i(i),
        other => Err(InvokeError::class_cast(other.runtime_type().java_source_representation(), "array")),
    }
}

fn new_array_of(_: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let Intrinsic::NewArray(component) = intrinsic else { unreachable!() };
    Ok(new_array(component, args))
}

fn convert(jvm: &JVMState, intrinsic: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    let Intrinsic::Convert(conversion) = intrinsic else { unreachable!() };
    conversion.apply(jvm, arg(&args, 0)?.clone())
}

fn throw_uninitialized_call_site(_: &JVMState, _: Intrinsic, _: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    Err(InvokeError::IllegalState("uninitialized call site".to_string()))
}

fn identity(_: &JVMState, _: Intrinsic, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
    Ok(arg(&args, 0)?.clone())
}
