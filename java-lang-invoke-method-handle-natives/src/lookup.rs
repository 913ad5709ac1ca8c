use std::sync::Arc;

use log::trace;

use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::compressed_classfile::names::{CClassName, FieldName, MethodName};
use rust_jvm_common::mhn_consts::ReferenceKind;
use slow_interpreter::class_loading::check_loaded_class;
use slow_interpreter::exceptions::{InvokeError, InvokeResult};
use slow_interpreter::instance_of_common::object_runtime_class;
use slow_interpreter::java_values::JavaValue;
use slow_interpreter::jvm_state::JVMState;
use slow_interpreter::resolvers::fields::FieldLocation;
use slow_interpreter::resolvers::methods::MethodLocation;
use slow_interpreter::runtime_class::RuntimeClass;
use slow_interpreter::stdlib::java::lang::invoke::direct_method_handle::DirectMethodHandle;
use slow_interpreter::stdlib::java::lang::invoke::method_handle::MethodHandle;
use slow_interpreter::stdlib::java::lang::invoke::method_handles;
use slow_interpreter::stdlib::java::lang::invoke::method_type::MethodType;
use slow_interpreter::stdlib::java::lang::member_name::{MemberName, MemberNameFactory};
use slow_interpreter::view::HasAccessFlags;

use crate::init::{mhn_init, ReflectedMember};
use crate::method_handle_info::MethodHandleInfo;

/// Finds members and hands out direct handles on them, with access checked from a lookup class.
///
/// A trusted lookup has no lookup class and may access everything.
#[derive(Clone, Debug)]
pub struct Lookup {
    lookup_class: Option<Arc<RuntimeClass>>,
}

fn check_method_name(ref_kind: ReferenceKind, name: &str) -> InvokeResult<()> {
    if name.starts_with('<') && !(ref_kind == ReferenceKind::NewInvokeSpecial && name == "<init>") {
        return Err(InvokeError::NoSuchMember(format!("illegal method name: {}", name)));
    }
    Ok(())
}

/// `handle` collecting trailing arguments into an array, if `member` is a varargs method.
fn set_varargs(jvm: &JVMState, member: &MemberName, handle: MethodHandle) -> InvokeResult<MethodHandle> {
    if !member.is_varargs() {
        return Ok(handle);
    }
    match handle.type_().last_parameter_type() {
        Some(array_type) if array_type.is_array() => handle.as_varargs_collector(jvm, &array_type),
        _ => Err(InvokeError::IllegalArgument(format!("not a varargs method: {}", member))),
    }
}

impl Lookup {
    pub fn trusted() -> Self {
        Self { lookup_class: None }
    }

    pub fn new(lookup_class: Arc<RuntimeClass>) -> Self {
        Self { lookup_class: Some(lookup_class) }
    }

    pub fn for_class(jvm: &JVMState, lookup_class: CClassName) -> InvokeResult<Self> {
        Ok(Self::new(check_loaded_class(jvm, lookup_class)?))
    }

    pub fn lookup_class(&self) -> Option<&Arc<RuntimeClass>> {
        self.lookup_class.as_ref()
    }

    fn resolve_or_fail(&self, jvm: &JVMState, ref_kind: ReferenceKind, member: &MemberName) -> InvokeResult<MemberName> {
        MemberNameFactory::resolve_or_fail(jvm, ref_kind, member, self.lookup_class.as_ref())
    }

    fn direct_method(&self, jvm: &JVMState, ref_class: CClassName, member: &MemberName) -> InvokeResult<MethodHandle> {
        trace!("[Lookup {} as {}]", member, ref_class);
        let handle = DirectMethodHandle::make(jvm, ref_class, member)?;
        set_varargs(jvm, member, handle)
    }

    fn check_final_setter(&self, member: &MemberName) -> InvokeResult<()> {
        if self.lookup_class.is_some() && member.is_final() {
            return Err(InvokeError::IllegalAccess(format!("{} is final", member)));
        }
        Ok(())
    }

    /// `(A...)R` for the static method `refc.name`.
    pub fn find_static(&self, jvm: &JVMState, refc: CClassName, name: &str, type_: &MethodType) -> InvokeResult<MethodHandle> {
        check_method_name(ReferenceKind::InvokeStatic, name)?;
        let member = MemberName::new_method(refc, MethodName::new(name), type_.clone(), ReferenceKind::InvokeStatic)?;
        let resolved = self.resolve_or_fail(jvm, ReferenceKind::InvokeStatic, &member)?;
        self.direct_method(jvm, refc, &resolved)
    }

    /// `(refc, A...)R`, dispatching on the receiver. `invokeExact` and `invoke` on `MethodHandle` give the invokers.
    pub fn find_virtual(&self, jvm: &JVMState, refc: CClassName, name: &str, type_: &MethodType) -> InvokeResult<MethodHandle> {
        if refc == CClassName::method_handle() {
            if name == MethodName::method_invokeExact().to_str() {
                return method_handles::exact_invoker(jvm, type_);
            }
            if name == MethodName::method_invoke().to_str() {
                return method_handles::invoker(jvm, type_);
            }
        }
        check_method_name(ReferenceKind::InvokeVirtual, name)?;
        let ref_class = check_loaded_class(jvm, refc)?;
        let ref_kind = if ref_class.view.is_interface() { ReferenceKind::InvokeInterface } else { ReferenceKind::InvokeVirtual };
        let member = MemberName::new_method(refc, MethodName::new(name), type_.clone(), ref_kind)?;
        let resolved = self.resolve_or_fail(jvm, ref_kind, &member)?;
        self.direct_method(jvm, refc, &resolved)
    }

    /// `(special_caller, A...)R` running `refc.name` without dispatch, the way a `super.name(...)` call in
    /// `special_caller` does. Only `special_caller` itself may ask for this.
    pub fn find_special(&self, jvm: &JVMState, refc: CClassName, name: &str, type_: &MethodType, special_caller: CClassName) -> InvokeResult<MethodHandle> {
        check_method_name(ReferenceKind::InvokeSpecial, name)?;
        if let Some(lookup_class) = self.lookup_class.as_ref() {
            if lookup_class.view.name() != special_caller {
                return Err(InvokeError::IllegalAccess(format!("no private access for invokespecial: {}, from {}", special_caller, lookup_class.view.name())));
            }
        }
        let caller_class = check_loaded_class(jvm, special_caller)?;
        if !caller_class.implements(refc) {
            return Err(InvokeError::IllegalAccess(format!("{} is not a subtype of {}", special_caller, refc)));
        }
        let member = MemberName::new_method(refc, MethodName::new(name), type_.clone(), ReferenceKind::InvokeSpecial)?;
        let resolved = self.resolve_or_fail(jvm, ReferenceKind::InvokeSpecial, &member)?;
        self.direct_method(jvm, special_caller, &resolved)
    }

    /// `(A...)refc`, allocating an instance and running the constructor with parameters `type_` on it.
    pub fn find_constructor(&self, jvm: &JVMState, refc: CClassName, type_: &MethodType) -> InvokeResult<MethodHandle> {
        let member = MemberName::new_constructor(refc, type_.clone())?;
        let resolved = self.resolve_or_fail(jvm, ReferenceKind::NewInvokeSpecial, &member)?;
        self.direct_method(jvm, refc, &resolved)
    }

    fn find_field(&self, jvm: &JVMState, ref_kind: ReferenceKind, refc: CClassName, name: &str, field_type: CPDType) -> InvokeResult<MethodHandle> {
        let member = MemberName::new_field(refc, FieldName::new(name), field_type, ref_kind)?;
        let resolved = self.resolve_or_fail(jvm, ref_kind, &member)?;
        if ref_kind.is_setter() {
            self.check_final_setter(&resolved)?;
        }
        trace!("[Lookup {}]", resolved);
        DirectMethodHandle::make(jvm, refc, &resolved)
    }

    /// `(refc)T`
    pub fn find_getter(&self, jvm: &JVMState, refc: CClassName, name: &str, field_type: CPDType) -> InvokeResult<MethodHandle> {
        self.find_field(jvm, ReferenceKind::GetField, refc, name, field_type)
    }

    /// `(refc, T)V`
    pub fn find_setter(&self, jvm: &JVMState, refc: CClassName, name: &str, field_type: CPDType) -> InvokeResult<MethodHandle> {
        self.find_field(jvm, ReferenceKind::PutField, refc, name, field_type)
    }

    /// `()T`
    pub fn find_static_getter(&self, jvm: &JVMState, refc: CClassName, name: &str, field_type: CPDType) -> InvokeResult<MethodHandle> {
        self.find_field(jvm, ReferenceKind::GetStatic, refc, name, field_type)
    }

    /// `(T)V`
    pub fn find_static_setter(&self, jvm: &JVMState, refc: CClassName, name: &str, field_type: CPDType) -> InvokeResult<MethodHandle> {
        self.find_field(jvm, ReferenceKind::PutStatic, refc, name, field_type)
    }

    /// The virtual method `name` of the receiver's class, with the receiver bound.
    pub fn bind(&self, jvm: &JVMState, receiver: &JavaValue, name: &str, type_: &MethodType) -> InvokeResult<MethodHandle> {
        let object = receiver.to_object_nonnull("bind receiver")?;
        let receiver_class = object_runtime_class(jvm, object.as_ref())?;
        let virtual_ = self.find_virtual(jvm, receiver_class.view.name(), name, type_)?;
        let bound = virtual_.as_fixed_arity().bind_to(jvm, receiver.clone())?;
        match virtual_.kind().try_unwrap_varargs_collector() {
            Some(collector) => bound.as_varargs_collector(jvm, &collector.array_type()),
            None => Ok(bound),
        }
    }

    pub fn unreflect(&self, jvm: &JVMState, method: &MethodLocation) -> InvokeResult<MethodHandle> {
        self.unreflect_member(jvm, &ReflectedMember::Method(method.clone()))
    }

    pub fn unreflect_constructor(&self, jvm: &JVMState, constructor: &MethodLocation) -> InvokeResult<MethodHandle> {
        self.unreflect_member(jvm, &ReflectedMember::Constructor(constructor.clone()))
    }

    fn unreflect_member(&self, jvm: &JVMState, reflected: &ReflectedMember) -> InvokeResult<MethodHandle> {
        let member = mhn_init(reflected)?;
        let ref_kind = member.get_reference_kind().ok_or_else(|| InvokeError::IllegalArgument(format!("no reference kind: {}", member)))?;
        let resolved = self.resolve_or_fail(jvm, ref_kind, &member)?;
        self.direct_method(jvm, resolved.get_declaring_class(), &resolved)
    }

    pub fn unreflect_getter(&self, jvm: &JVMState, field: &FieldLocation) -> InvokeResult<MethodHandle> {
        self.unreflect_field(jvm, field, false)
    }

    pub fn unreflect_setter(&self, jvm: &JVMState, field: &FieldLocation) -> InvokeResult<MethodHandle> {
        self.unreflect_field(jvm, field, true)
    }

    fn unreflect_field(&self, jvm: &JVMState, field: &FieldLocation, is_setter: bool) -> InvokeResult<MethodHandle> {
        let member = MemberName::from_field(field, is_setter)?;
        let ref_kind = member.get_reference_kind().ok_or_else(|| InvokeError::IllegalArgument(format!("no reference kind: {}", member)))?;
        let resolved = self.resolve_or_fail(jvm, ref_kind, &member)?;
        if is_setter {
            self.check_final_setter(&resolved)?;
        }
        DirectMethodHandle::make(jvm, resolved.get_declaring_class(), &resolved)
    }

    /// The member behind a direct handle, if this lookup could have created it.
    pub fn reveal_direct(&self, jvm: &JVMState, target: &MethodHandle) -> InvokeResult<MethodHandleInfo> {
        let fixed = target.as_fixed_arity();
        let member = fixed.internal_member_name().ok_or_else(|| InvokeError::IllegalArgument(format!("not a direct method handle: {}", target)))?;
        if let Some(lookup_class) = self.lookup_class.as_ref() {
            let declaring = member.declaring_runtime_class()?;
            let access_control = jvm.access_control();
            if !access_control.is_member_accessible(declaring, declaring, member.get_modifiers(), lookup_class) {
                return Err(InvokeError::IllegalArgument(format!("access violation: {}, from {}", member, lookup_class.view.name())));
            }
        }
        MethodHandleInfo::from_member(member)
    }
}
