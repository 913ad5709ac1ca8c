use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, Weak};

use itertools::Itertools;
use parking_lot::RwLock;

use rust_jvm_common::compressed_classfile::CPDType;

use crate::exceptions::{InvokeError, InvokeResult};
use crate::instance_of_common::{instance_of, is_assignable, object_runtime_class};
use crate::interpreter_util::new_array;
use crate::java_values::{JavaValue, Object};
use crate::jvm_state::JVMState;
use crate::resolvers::methods::select_method;
use crate::stdlib::java::lang::invoke::bound_method_handle::BoundMethodHandle;
use crate::stdlib::java::lang::invoke::direct_method_handle::DirectMethodHandle;
use crate::stdlib::java::lang::invoke::lambda_form::basic_type::BasicType;
use crate::stdlib::java::lang::invoke::lambda_form::LambdaForm;
use crate::stdlib::java::lang::invoke::method_handle_impl::{make_collector, make_pairwise_convert, make_spreader, spread_array_checks};
use crate::stdlib::java::lang::invoke::method_type::MethodType;
use crate::stdlib::java::lang::invoke::varargs_collector::VarargsCollector;
use crate::stdlib::java::lang::member_name::MemberName;

pub enum MethodHandleKind {
    Direct(DirectMethodHandle),
    Bound(BoundMethodHandle),
    /// Everything is in the form: invokers, collectors, identity.
    Simple,
    VarargsCollector(VarargsCollector),
}

impl MethodHandleKind {
    pub fn try_unwrap_direct(&self) -> Option<&DirectMethodHandle> {
        match self {
            MethodHandleKind::Direct(direct) => Some(direct),
            _ => None,
        }
    }

    pub fn try_unwrap_bound(&self) -> Option<&BoundMethodHandle> {
        match self {
            MethodHandleKind::Bound(bound) => Some(bound),
            _ => None,
        }
    }

    pub fn try_unwrap_varargs_collector(&self) -> Option<&VarargsCollector> {
        match self {
            MethodHandleKind::VarargsCollector(collector) => Some(collector),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            MethodHandleKind::Direct(_) => "DirectMethodHandle",
            MethodHandleKind::Bound(_) => "BoundMethodHandle",
            MethodHandleKind::Simple => "SimpleMethodHandle",
            MethodHandleKind::VarargsCollector(_) => "VarargsCollector",
        }
    }
}

pub struct MethodHandleInner {
    type_: MethodType,
    /// Replaced at most once after construction, when a class init barrier is dropped.
    form: RwLock<Arc<LambdaForm>>,
    kind: MethodHandleKind,
    as_type_cache: RwLock<Weak<MethodHandleInner>>,
}

/// A typed, directly invocable reference to some behaviour. Cloning shares the handle.
#[derive(Clone)]
pub struct MethodHandle(Arc<MethodHandleInner>);

impl MethodHandle {
    pub(crate) fn new(type_: MethodType, form: Arc<LambdaForm>, kind: MethodHandleKind) -> InvokeResult<Self> {
        let mut expected = vec![BasicType::L];
        expected.extend(BasicType::from_types(type_.parameter_list()));
        if form.parameter_types() != expected || form.return_type() != BasicType::from_type(&type_.return_type()) {
            return Err(InvokeError::IllegalState(format!("form {} does not fit {}{}", form.debug_name(), kind.name(), type_)));
        }
        Ok(MethodHandle(Arc::new(MethodHandleInner {
            type_,
            form: RwLock::new(form),
            kind,
            as_type_cache: RwLock::new(Weak::new()),
        })))
    }

    pub fn type_(&self) -> &MethodType {
        &self.0.type_
    }

    pub fn form(&self) -> Arc<LambdaForm> {
        self.0.form.read().clone()
    }

    pub fn kind(&self) -> &MethodHandleKind {
        &self.0.kind
    }

    pub fn internal_member_name(&self) -> Option<&MemberName> {
        self.0.kind.try_unwrap_direct().map(|direct| direct.member())
    }

    pub fn ptr_eq(&self, other: &MethodHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> Weak<MethodHandleInner> {
        Arc::downgrade(&self.0)
    }

    pub(crate) fn upgrade(weak: &Weak<MethodHandleInner>) -> Option<Self> {
        weak.upgrade().map(MethodHandle)
    }

    /// Swaps in an equivalent form. Invocations already running keep the form they started with.
    pub(crate) fn update_form(&self, form: Arc<LambdaForm>) -> bool {
        let mut guard = self.0.form.write();
        if Arc::ptr_eq(&guard, &form) {
            return false;
        }
        *guard = form;
        true
    }

    /// Runs the form with this handle prepended, no checks beyond the form's own.
    pub fn invoke_basic(&self, jvm: &JVMState, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
        let mut form_args = Vec::with_capacity(args.len() + 1);
        form_args.push(JavaValue::from(self.clone()));
        form_args.extend(args);
        self.form().invoke(jvm, form_args)
    }

    /// Invokes with arguments that already match `type_()` exactly.
    pub fn invoke_exact(&self, jvm: &JVMState, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
        let ptypes = self.0.type_.parameter_list();
        if args.len() != ptypes.len() {
            return Err(InvokeError::WrongMethodType(format!("{} expects {} arguments but got {}", self.0.type_, ptypes.len(), args.len())));
        }
        if let Some((i, (arg, ptype))) = args.iter().zip(ptypes.iter()).find_position(|(arg, ptype)| arg.basic_type() != BasicType::from_type(ptype)) {
            return Err(InvokeError::WrongMethodType(format!("argument {} of {} is {:?}, not {}", i, self.0.type_, arg, ptype.java_source_representation())));
        }
        self.invoke_basic(jvm, args)
    }

    /// Invokes as a call site of `caller_type` would, adapting with `as_type` when the types differ.
    pub fn invoke(&self, jvm: &JVMState, caller_type: &MethodType, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
        if *caller_type == self.0.type_ {
            return self.invoke_exact(jvm, args);
        }
        self.as_type(jvm, caller_type)?.invoke_exact(jvm, args)
    }

    /// Boxes every argument, then calls through a generic signature of the same arity. Primitive results come back boxed.
    pub fn invoke_with_arguments(&self, jvm: &JVMState, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
        let invocation_type = MethodType::generic_method_type(args.len(), false)?;
        let boxed = args.into_iter().map(|arg| match arg {
            JavaValue::Object(_) => arg,
            primitive => JavaValue::boxed(primitive),
        }).collect_vec();
        let array = new_array(CPDType::object(), boxed);
        let spread_invoker = invocation_type.invokers().spread_invoker(jvm, 0)?;
        let adapted = self.as_type(jvm, &invocation_type)?;
        spread_invoker.invoke_exact(jvm, vec![adapted.into(), array])
    }

    fn cached_as_type(&self, new_type: &MethodType) -> Option<MethodHandle> {
        let cached = MethodHandle(self.0.as_type_cache.read().upgrade()?);
        if cached.type_() == new_type {
            Some(cached)
        } else {
            None
        }
    }

    /// A handle of `new_type` that converts arguments and result pairwise and calls this one.
    pub fn as_type(&self, jvm: &JVMState, new_type: &MethodType) -> InvokeResult<MethodHandle> {
        if *new_type == self.0.type_ {
            return Ok(self.clone());
        }
        if let Some(cached) = self.cached_as_type(new_type) {
            return Ok(cached);
        }
        let res = match &self.0.kind {
            MethodHandleKind::VarargsCollector(collector) => collector.as_type_uncached(jvm, self, new_type)?,
            _ => self.as_type_pairwise(jvm, new_type)?,
        };
        *self.0.as_type_cache.write() = Arc::downgrade(&res.0);
        Ok(res)
    }

    pub(crate) fn as_type_pairwise(&self, jvm: &JVMState, new_type: &MethodType) -> InvokeResult<MethodHandle> {
        if *new_type == self.0.type_ {
            return Ok(self.clone());
        }
        if !self.0.type_.is_convertible_to(new_type) {
            return Err(InvokeError::WrongMethodType(format!("cannot convert {} to {}", self, new_type)));
        }
        make_pairwise_convert(jvm, self, new_type)
    }

    /// This handle as a bound handle, so arguments can be bound onto it. Bound handles are returned as is.
    pub(crate) fn rebind(&self, jvm: &JVMState) -> InvokeResult<MethodHandle> {
        match &self.0.kind {
            MethodHandleKind::Bound(_) => Ok(self.clone()),
            _ => BoundMethodHandle::make_rebound(jvm, self),
        }
    }

    /// Fixes argument `pos` to `value`, which must already have the parameter's representation.
    pub(crate) fn bind_argument(&self, jvm: &JVMState, pos: usize, value: JavaValue) -> InvokeResult<MethodHandle> {
        BoundMethodHandle::bind_argument(jvm, &self.rebind(jvm)?, pos, value)
    }

    /// Fixes the leading reference argument to `value`.
    pub fn bind_to(&self, jvm: &JVMState, value: JavaValue) -> InvokeResult<MethodHandle> {
        let ptype = match self.0.type_.parameter_list().first() {
            Some(ptype) if ptype.is_reference() => *ptype,
            _ => return Err(InvokeError::IllegalArgument(format!("no leading reference parameter: {}", self))),
        };
        let object = value.to_object()?;
        if let Some(object) = object.as_ref() {
            if !instance_of(jvm, object.as_ref(), &ptype) {
                return Err(InvokeError::class_cast(object.runtime_type().java_source_representation(), ptype.java_source_representation()));
            }
            if let Some(pre_dispatched) = self.pre_dispatch(jvm, object)? {
                return Ok(pre_dispatched);
            }
        }
        self.bind_argument(jvm, 0, value)
    }

    /// For a virtual or interface direct handle, the special handle on the method the receiver would select,
    /// with the receiver bound. `None` when that handle cannot stand in for this one.
    fn pre_dispatch(&self, jvm: &JVMState, receiver: &Arc<Object>) -> InvokeResult<Option<MethodHandle>> {
        let direct = match self.0.kind.try_unwrap_direct() {
            Some(direct) => direct,
            None => return Ok(None),
        };
        let member = direct.member();
        if !member.get_reference_kind().map(|ref_kind| ref_kind.does_dispatch()).unwrap_or(false) {
            return Ok(None);
        }
        let receiver_class = object_runtime_class(jvm, receiver.as_ref())?;
        let selected = match select_method(jvm, &receiver_class, member.method_location()?) {
            Ok(selected) => selected,
            Err(_) => return Ok(None),
        };
        let special = MemberName::from_method(&selected)?.as_special()?;
        let special_handle = DirectMethodHandle::make(jvm, receiver_class.view.name(), &special)?;
        let bound = special_handle.bind_argument(jvm, 0, JavaValue::Object(Some(receiver.clone())))?;
        let expected = self.0.type_.drop_parameter_types(0, 1)?;
        if *bound.type_() != expected {
            return Ok(None);
        }
        Ok(Some(bound))
    }

    /// Trailing `array_length` arguments come from one array argument instead.
    pub fn as_spreader(&self, jvm: &JVMState, array_type: &CPDType, array_length: usize) -> InvokeResult<MethodHandle> {
        let component = spread_array_checks(array_type, array_length)?;
        let type_ = &self.0.type_;
        let nargs = type_.parameter_count();
        if nargs < array_length {
            return Err(InvokeError::IllegalArgument("bad spread array length".to_string()));
        }
        let matches = type_.parameter_list()[nargs - array_length..].iter().all(|ptype| *ptype == component);
        let post_spread_type = if matches { type_.clone() } else { type_.as_spreader_type(array_type, array_length)? };
        let after_spread = self.as_type(jvm, &post_spread_type)?;
        make_spreader(jvm, &after_spread, array_type, array_length)
    }

    /// The trailing array parameter is filled from `array_length` separate arguments.
    pub fn as_collector(&self, jvm: &JVMState, array_type: &CPDType, array_length: usize) -> InvokeResult<MethodHandle> {
        self.as_collector_checks(jvm, array_type, array_length)?;
        make_collector(jvm, self, array_type, array_length)
    }

    /// True if the trailing parameter is exactly `array_type`, false if it is a supertype of it.
    pub(crate) fn as_collector_checks(&self, jvm: &JVMState, array_type: &CPDType, array_length: usize) -> InvokeResult<bool> {
        spread_array_checks(array_type, array_length)?;
        if let Some(last) = self.0.type_.last_parameter_type() {
            if last == *array_type {
                return Ok(true);
            }
            if is_assignable(jvm, array_type, &last) {
                return Ok(false);
            }
        }
        Err(InvokeError::IllegalArgument(format!("array type not assignable to trailing argument: {}, {}", self, array_type.java_source_representation())))
    }

    pub fn as_varargs_collector(&self, jvm: &JVMState, array_type: &CPDType) -> InvokeResult<MethodHandle> {
        let last_match = self.as_collector_checks(jvm, array_type, 0)?;
        if let MethodHandleKind::VarargsCollector(collector) = &self.0.kind {
            if last_match && collector.array_type() == *array_type {
                return Ok(self.clone());
            }
        }
        VarargsCollector::make(jvm, self.as_fixed_arity(), *array_type)
    }

    pub fn is_varargs_collector(&self) -> bool {
        matches!(self.0.kind, MethodHandleKind::VarargsCollector(_))
    }

    pub fn as_fixed_arity(&self) -> MethodHandle {
        match &self.0.kind {
            MethodHandleKind::VarargsCollector(collector) => collector.target().clone(),
            _ => self.clone(),
        }
    }
}

impl Display for MethodHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MethodHandle{}", self.0.type_)
    }
}

impl Debug for MethodHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}@{:?}", self.0.kind.name(), self.0.type_, self.form())
    }
}
