use std::sync::Arc;

use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::compressed_classfile::names::CClassName;
use rust_jvm_common::mhn_consts::ReferenceKind;
use rust_jvm_common::primitive_wrapper::Wrapper;

use crate::class_loading::{check_loaded_class, should_be_initialized};
use crate::exceptions::{InvokeError, InvokeResult};
use crate::java_values::Object;
use crate::jvm_state::JVMState;
use crate::resolvers::methods::MethodLocation;
use crate::runtime_class::RuntimeClass;
use crate::stdlib::java::lang::invoke::lambda_form::basic_type::BasicType;
use crate::stdlib::java::lang::invoke::lambda_form::{LambdaForm, LambdaFormBuilder};
use crate::stdlib::java::lang::invoke::lambda_form::named_function::Intrinsic;
use crate::stdlib::java::lang::invoke::method_handle::{MethodHandle, MethodHandleKind};
use crate::stdlib::java::lang::invoke::method_type::MethodType;
use crate::stdlib::java::lang::invoke::method_type_form::{FieldAccessKind, LambdaFormKind};
use crate::stdlib::java::lang::member_name::MemberName;
use crate::view::HasAccessFlags;

pub enum DirectVariant {
    Plain,
    /// Receivers are checked against `ref_class` before dispatch.
    Interface { ref_class: CClassName },
    Special,
    Constructor { init_method: MemberName, instance_class: Arc<RuntimeClass> },
    Accessor { field_type: CPDType, field_offset: usize },
    StaticAccessor { field_type: CPDType, static_base: Arc<Object>, static_offset: usize },
}

/// A handle straight onto a resolved method, constructor or field.
pub struct DirectMethodHandle {
    member: MemberName,
    variant: DirectVariant,
}

impl DirectMethodHandle {
    pub fn member(&self) -> &MemberName {
        &self.member
    }

    pub fn variant(&self) -> &DirectVariant {
        &self.variant
    }

    pub fn make_from_member(jvm: &JVMState, member: &MemberName) -> InvokeResult<MethodHandle> {
        Self::make(jvm, member.get_declaring_class(), member)
    }

    /// A direct handle on `member`, a resolved member name. Receivers are typed as `ref_class`.
    pub fn make(jvm: &JVMState, ref_class: CClassName, member: &MemberName) -> InvokeResult<MethodHandle> {
        let ref_kind = member.get_reference_kind().ok_or_else(|| InvokeError::IllegalArgument(format!("no reference kind: {}", member)))?;
        let declaring_class = member.declaring_runtime_class()?.clone();
        if ref_kind.is_field() {
            return make_field(jvm, ref_class, member, ref_kind, &declaring_class);
        }
        if ref_kind.is_constructor() {
            return make_allocator(jvm, member, declaring_class);
        }
        let member = unify_object_method(jvm, member, ref_kind, &declaring_class)?;
        let ref_kind = member.get_reference_kind().unwrap_or(ref_kind);
        let mut type_ = member.get_invocation_type()?;
        if ref_kind.has_receiver() && ref_class != member.get_declaring_class() {
            type_ = type_.change_parameter_type(0, CPDType::Class(ref_class))?;
        }
        let (form_kind, variant) = match ref_kind {
            ReferenceKind::InvokeStatic => {
                let form_kind = if should_be_initialized(&declaring_class) { LambdaFormKind::InvokeStaticInit } else { LambdaFormKind::InvokeStatic };
                (form_kind, DirectVariant::Plain)
            }
            ReferenceKind::InvokeVirtual => (LambdaFormKind::InvokeVirtual, DirectVariant::Plain),
            ReferenceKind::InvokeSpecial => (LambdaFormKind::InvokeSpecial, DirectVariant::Special),
            ReferenceKind::InvokeInterface => (LambdaFormKind::InvokeInterface, DirectVariant::Interface { ref_class }),
            other => return Err(InvokeError::IllegalArgument(format!("{} is not a method reference kind", other.name()))),
        };
        let form = prepared_lambda_form(jvm, &type_, form_kind)?;
        MethodHandle::new(type_, form, MethodHandleKind::Direct(DirectMethodHandle { member, variant }))
    }
}

/// Interface calls that land on a public `Object` method are made virtual calls on `Object`'s method.
fn unify_object_method(jvm: &JVMState, member: &MemberName, ref_kind: ReferenceKind, declaring_class: &Arc<RuntimeClass>) -> InvokeResult<MemberName> {
    if ref_kind != ReferenceKind::InvokeInterface {
        return Ok(member.clone());
    }
    if declaring_class.view.name() == CClassName::object() {
        return member.as_normal_original(jvm);
    }
    let location = member.method_location()?;
    if location.view().is_abstract() {
        return Ok(member.clone());
    }
    let object_class = check_loaded_class(jvm, CClassName::object())?;
    let shape = location.view().shape();
    match object_class.view.lookup_method(&shape) {
        Some(method_i) => {
            let object_method = object_class.view.method_view_i(method_i);
            if object_method.is_public() && !object_method.is_static() {
                MemberName::from_method(&MethodLocation { class: object_class.clone(), method_i })
            } else {
                Ok(member.clone())
            }
        }
        None => Ok(member.clone()),
    }
}

fn make_allocator(jvm: &JVMState, member: &MemberName, instance_class: Arc<RuntimeClass>) -> InvokeResult<MethodHandle> {
    if instance_class.view.is_abstract() || instance_class.view.is_interface() {
        return Err(InvokeError::Linkage(format!("InstantiationError: {}", instance_class.view.name())));
    }
    let init_method = member.as_special()?;
    let type_ = member.get_invocation_type()?;
    let form = prepared_lambda_form(jvm, &type_, LambdaFormKind::NewInvokeSpecial)?;
    MethodHandle::new(type_, form, MethodHandleKind::Direct(DirectMethodHandle {
        member: member.clone(),
        variant: DirectVariant::Constructor { init_method, instance_class },
    }))
}

fn field_access_kind(member: &MemberName, ref_kind: ReferenceKind, field_type: &CPDType, needs_init: bool) -> FieldAccessKind {
    FieldAccessKind {
        is_getter: ref_kind.is_getter(),
        is_static: ref_kind.is_static(),
        needs_init,
        needs_cast: field_type.is_reference() && !field_type.is_object(),
        is_volatile: member.is_volatile(),
        field_kind: Wrapper::for_basic_type(field_type),
    }
}

fn make_field(jvm: &JVMState, ref_class: CClassName, member: &MemberName, ref_kind: ReferenceKind, declaring_class: &Arc<RuntimeClass>) -> InvokeResult<MethodHandle> {
    let binding = member.field_binding()?;
    let field_type = member.get_field_type().ok_or_else(|| InvokeError::IllegalArgument(format!("not a field: {}", member)))?;
    let mut type_ = member.get_invocation_type()?;
    if ref_kind.has_receiver() && ref_class != member.get_declaring_class() {
        type_ = type_.change_parameter_type(0, CPDType::Class(ref_class))?;
    }
    let needs_init = binding.is_static && should_be_initialized(declaring_class);
    let variant = if binding.is_static {
        DirectVariant::StaticAccessor { field_type, static_base: declaring_class.mirror(), static_offset: binding.offset }
    } else {
        DirectVariant::Accessor { field_type, field_offset: binding.offset }
    };
    let form = prepared_field_lambda_form(jvm, &type_, field_access_kind(member, ref_kind, &field_type, needs_init))?;
    MethodHandle::new(type_, form, MethodHandleKind::Direct(DirectMethodHandle { member: member.clone(), variant }))
}

fn compile_eagerly(jvm: &JVMState, form: &LambdaForm) {
    if form.arity() <= jvm.options.eager_compile_max_arity() {
        form.compile(jvm);
    }
}

/// The shared form invoking a member of invocation type `mtype` the way `kind` says, built once per basic type.
pub fn prepared_lambda_form(jvm: &JVMState, mtype: &MethodType, kind: LambdaFormKind) -> InvokeResult<Arc<LambdaForm>> {
    let basic_type = mtype.basic_type();
    let type_form = basic_type.form();
    if let Some(cached) = type_form.cached_lambda_form(kind) {
        return Ok(cached);
    }
    let form = Arc::new(make_prepared_lambda_form(jvm, &basic_type, kind)?);
    compile_eagerly(jvm, &form);
    Ok(type_form.set_cached_lambda_form(kind, form))
}

fn make_prepared_lambda_form(jvm: &JVMState, basic_type: &MethodType, kind: LambdaFormKind) -> InvokeResult<LambdaForm> {
    let mut params = vec![BasicType::L];
    params.extend(BasicType::from_types(basic_type.parameter_list()));
    let arity = params.len();
    let rtype = BasicType::from_type(&basic_type.return_type());
    let mut builder = LambdaFormBuilder::new(format!("DMH.{}", kind.name()), &params);
    let handle = builder.param(0);
    let (linker, mut args, member) = match kind {
        LambdaFormKind::InvokeStatic => (Intrinsic::LinkToStatic, builder.params(1..arity), Intrinsic::InternalMemberName),
        LambdaFormKind::InvokeStaticInit => (Intrinsic::LinkToStatic, builder.params(1..arity), Intrinsic::InternalMemberNameEnsureInit),
        LambdaFormKind::InvokeVirtual => (Intrinsic::LinkToVirtual, builder.params(1..arity), Intrinsic::InternalMemberName),
        LambdaFormKind::InvokeSpecial => (Intrinsic::LinkToSpecial, builder.params(1..arity), Intrinsic::InternalMemberName),
        LambdaFormKind::InvokeInterface => {
            let receiver = builder.add(BasicType::L, Intrinsic::CheckReceiver, vec![handle.clone(), builder.param(1)]);
            let mut args = vec![receiver];
            args.extend(builder.params(2..arity));
            (Intrinsic::LinkToInterface, args, Intrinsic::InternalMemberName)
        }
        LambdaFormKind::NewInvokeSpecial => {
            let instance = builder.add(BasicType::L, Intrinsic::AllocateInstance, vec![handle.clone()]);
            let init_method = builder.add(BasicType::L, Intrinsic::ConstructorMethod, vec![handle]);
            let mut args = vec![instance.clone()];
            args.extend(builder.params(1..arity));
            args.push(init_method);
            builder.add(BasicType::V, Intrinsic::LinkToSpecial, args);
            return builder.build(jvm, Some(instance));
        }
        other => return Err(InvokeError::IllegalArgument(format!("{} is not a direct invocation kind", other.name()))),
    };
    let member_name = builder.add(BasicType::L, member, vec![handle]);
    args.push(member_name);
    builder.add(rtype, linker, args);
    builder.build_returning_last(jvm)
}

/// The shared form for a field access of `kind`, whose invocation type is `mtype`.
pub fn prepared_field_lambda_form(jvm: &JVMState, mtype: &MethodType, kind: FieldAccessKind) -> InvokeResult<Arc<LambdaForm>> {
    let basic_type = mtype.basic_type();
    let type_form = basic_type.form();
    if let Some(cached) = type_form.cached_field_form(&kind) {
        return Ok(cached);
    }
    let form = Arc::new(make_prepared_field_lambda_form(jvm, &basic_type, kind)?);
    compile_eagerly(jvm, &form);
    Ok(type_form.set_cached_field_form(kind, form))
}

fn make_prepared_field_lambda_form(jvm: &JVMState, basic_type: &MethodType, kind: FieldAccessKind) -> InvokeResult<LambdaForm> {
    let mut params = vec![BasicType::L];
    params.extend(BasicType::from_types(basic_type.parameter_list()));
    let field_basic_type = BasicType::from_type(&kind.field_kind.primitive_type());
    let debug_name = format!("DMH.{}{}{}{}{}",
                             if kind.is_getter { "get" } else { "put" },
                             if kind.is_static { "Static" } else { "Field" },
                             if kind.is_volatile { "Volatile" } else { "" },
                             if kind.needs_init { "Init" } else { "" },
                             if kind.needs_cast { "Cast" } else { "" });
    let mut builder = LambdaFormBuilder::new(debug_name, &params);
    let handle = builder.param(0);
    if kind.needs_init {
        builder.add(BasicType::V, Intrinsic::EnsureInitialized, vec![handle.clone()]);
    }
    let (base, offset) = if kind.is_static {
        let base = builder.add(BasicType::L, Intrinsic::StaticBase, vec![handle.clone()]);
        let offset = builder.add(BasicType::J, Intrinsic::StaticOffset, vec![handle.clone()]);
        (base, offset)
    } else {
        let base = builder.add(BasicType::L, Intrinsic::CheckBase, vec![builder.param(1)]);
        let offset = builder.add(BasicType::J, Intrinsic::FieldOffset, vec![handle.clone()]);
        (base, offset)
    };
    let value_param = if kind.is_static { 1 } else { 2 };
    if kind.is_getter {
        let value = builder.add(field_basic_type, Intrinsic::GetField { field_kind: kind.field_kind, is_volatile: kind.is_volatile }, vec![base, offset]);
        if kind.needs_cast {
            builder.add(BasicType::L, Intrinsic::CheckCast, vec![handle, value]);
        }
        builder.build_returning_last(jvm)
    } else {
        let mut value = builder.param(value_param);
        if kind.needs_cast {
            value = builder.add(BasicType::L, Intrinsic::CheckCast, vec![handle, value]);
        }
        builder.add(BasicType::V, Intrinsic::PutField { field_kind: kind.field_kind, is_volatile: kind.is_volatile }, vec![base, offset, value]);
        builder.build(jvm, None)
    }
}

/// The class-init barrier of a static direct handle. Once the declaring class is seen fully initialized,
/// the handle's form is swapped for the same form without the barrier.
pub fn ensure_initialized(jvm: &JVMState, method_handle: &MethodHandle) -> InvokeResult<()> {
    let direct = method_handle.kind().try_unwrap_direct().ok_or_else(|| InvokeError::IllegalState(format!("{} has no class to initialize", method_handle)))?;
    let member = direct.member();
    let class = member.declaring_runtime_class()?;
    if !jvm.ensure_initialized.check_initialized(jvm, class)? {
        return Ok(());
    }
    let barrier_free = match direct.variant() {
        DirectVariant::StaticAccessor { field_type, .. } => {
            let ref_kind = member.get_reference_kind().ok_or_else(|| InvokeError::IllegalState(format!("no reference kind: {}", member)))?;
            prepared_field_lambda_form(jvm, method_handle.type_(), field_access_kind(member, ref_kind, field_type, false))?
        }
        _ => prepared_lambda_form(jvm, method_handle.type_(), LambdaFormKind::InvokeStatic)?,
    };
    if method_handle.update_form(barrier_free) {
        jvm.tracing().trace_barrier_removed(&class.view.name());
    }
    Ok(())
}
