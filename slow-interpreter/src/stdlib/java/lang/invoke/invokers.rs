use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;

use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::MAX_MH_INVOKER_ARITY;

use crate::exceptions::{InvokeError, InvokeResult};
use crate::java_values::JavaValue;
use crate::jvm_state::JVMState;
use crate::stdlib::java::lang::invoke::bound_method_handle::BoundMethodHandle;
use crate::stdlib::java::lang::invoke::lambda_form::basic_type::BasicType;
use crate::stdlib::java::lang::invoke::lambda_form::{LambdaForm, LambdaFormBuilder};
use crate::stdlib::java::lang::invoke::lambda_form::named_function::Intrinsic;
use crate::stdlib::java::lang::invoke::method_handle::{MethodHandle, MethodHandleInner};
use crate::stdlib::java::lang::invoke::method_type::MethodType;
use crate::stdlib::java::lang::invoke::method_type_form::LambdaFormKind;
use crate::stdlib::java::lang::invoke::simple_method_handle;

/// Invoker handles built for one signature, each on first request and then shared.
///
/// No handle stored here refers back to the signature that owns the cache, so populating it does not keep
/// the signature alive. Invoker types start with a `MethodHandle` parameter and so differ from the target type.
pub struct InvokerCache {
    exact_invoker: OnceLock<MethodHandle>,
    generic_invoker: OnceLock<MethodHandle>,
    basic_invoker: OnceLock<MethodHandle>,
    varargs_invoker: OnceLock<MethodHandle>,
    //typed by the signature itself, so only held while someone else holds it
    uninitialized_call_site: RwLock<Weak<MethodHandleInner>>,
    //indexed by leading argument count
    spread_invokers: Box<[OnceLock<MethodHandle>]>,
}

impl InvokerCache {
    pub(crate) fn new(parameter_count: usize) -> Self {
        Self {
            exact_invoker: OnceLock::new(),
            generic_invoker: OnceLock::new(),
            basic_invoker: OnceLock::new(),
            varargs_invoker: OnceLock::new(),
            uninitialized_call_site: RwLock::new(Weak::new()),
            spread_invokers: (0..=parameter_count).map(|_| OnceLock::new()).collect(),
        }
    }
}

/// The invokers of one signature: the signature paired with its cache.
pub struct Invokers<'l> {
    target_type: &'l MethodType,
    cache: &'l InvokerCache,
}

/// Concurrent first callers may each build a value; the first one published is returned to all of them.
fn cached(cell: &OnceLock<MethodHandle>, make: impl FnOnce() -> InvokeResult<MethodHandle>) -> InvokeResult<MethodHandle> {
    if let Some(cached) = cell.get() {
        return Ok(cached.clone());
    }
    let made = make()?;
    Ok(cell.get_or_init(|| made).clone())
}

impl<'l> Invokers<'l> {
    pub(crate) fn new(target_type: &'l MethodType, cache: &'l InvokerCache) -> Self {
        Self { target_type, cache }
    }

    pub fn target_type(&self) -> &MethodType {
        self.target_type
    }

    /// `(MethodHandle, A...)R`: calls the handle if its type is exactly the target type, else `WrongMethodType`.
    pub fn exact_invoker(&self, jvm: &JVMState) -> InvokeResult<MethodHandle> {
        cached(&self.cache.exact_invoker, || self.make_checking_invoker(jvm, LambdaFormKind::ExactInvoker))
    }

    /// `(MethodHandle, A...)R`: calls the handle after adapting it to the target type with `as_type`.
    pub fn generic_invoker(&self, jvm: &JVMState) -> InvokeResult<MethodHandle> {
        cached(&self.cache.generic_invoker, || self.make_checking_invoker(jvm, LambdaFormKind::GenericInvoker))
    }

    //binds the invoker type rather than the target type, which the check recovers by dropping the leading parameter
    fn make_checking_invoker(&self, jvm: &JVMState, kind: LambdaFormKind) -> InvokeResult<MethodHandle> {
        let invoker_type = self.target_type.invoker_type()?;
        let form = invoker_form(jvm, &invoker_type, kind)?;
        BoundMethodHandle::make(invoker_type.clone(), form, vec![invoker_type.into()])
    }

    /// `invoke_basic` as a handle, shared by all signatures with the same basic type.
    pub fn basic_invoker(&self, jvm: &JVMState) -> InvokeResult<MethodHandle> {
        let basic_type = self.target_type.basic_type();
        if basic_type != *self.target_type {
            return basic_type.invokers().basic_invoker(jvm);
        }
        cached(&self.cache.basic_invoker, || {
            let invoker_type = self.target_type.invoker_type()?;
            let form = invoker_form(jvm, &invoker_type, LambdaFormKind::BasicInvoker)?;
            simple_method_handle::make(invoker_type, form)
        })
    }

    /// `(MethodHandle, A[0..leading], T[])R`: a generic invoker taking the arguments after `leading` from an array.
    ///
    /// A target type using every argument slot has no generic invoker, since the invoker's own handle
    /// parameter would not fit. Its spread invoker instead spreads the target itself on each call.
    pub fn spread_invoker(&self, jvm: &JVMState, leading: usize) -> InvokeResult<MethodHandle> {
        let count = self.target_type.parameter_count();
        let cell = self.cache.spread_invokers.get(leading).ok_or(InvokeError::IndexOutOfRange { index: leading, len: count + 1 })?;
        cached(cell, || {
            let array_type = implied_restarg_type(self.target_type, leading)?;
            let spread_count = count - leading;
            if self.target_type.parameter_slot_count() <= MAX_MH_INVOKER_ARITY {
                return self.generic_invoker(jvm)?.as_spreader(jvm, &array_type, spread_count);
            }
            let pre_spread_type = self.target_type.replace_parameter_types(leading, count, &[array_type])?;
            let invoker_type = pre_spread_type.invoker_type()?;
            let form = invoker_form(jvm, &invoker_type, LambdaFormKind::SpreadInvoker)?;
            BoundMethodHandle::make(invoker_type, form, vec![pre_spread_type.into(), JavaValue::Int(spread_count as i32)])
        })
    }

    /// `(MethodHandle, Object[])Object`: every argument from one array.
    pub fn varargs_invoker(&self, jvm: &JVMState) -> InvokeResult<MethodHandle> {
        cached(&self.cache.varargs_invoker, || {
            let varargs_type = MethodType::generic_method_type(0, true)?.invoker_type()?;
            let spread_type = self.target_type.as_spreader_type(&CPDType::object_array(), self.target_type.parameter_count())?;
            spread_type.invokers().spread_invoker(jvm, 0)?.as_type(jvm, &varargs_type)
        })
    }

    /// The initial target of an unlinked call site of the target type. Always fails with `IllegalState`.
    pub fn uninitialized_call_site(&self, jvm: &JVMState) -> InvokeResult<MethodHandle> {
        if let Some(cached) = MethodHandle::upgrade(&self.cache.uninitialized_call_site.read()) {
            return Ok(cached);
        }
        let mut params = vec![BasicType::L];
        params.extend(BasicType::from_types(self.target_type.parameter_list()));
        let mut builder = LambdaFormBuilder::new("Invokers.uninitializedCallSite", &params);
        builder.add(BasicType::from_type(&self.target_type.return_type()), Intrinsic::ThrowUninitializedCallSite, vec![]);
        let form = Arc::new(builder.build_returning_last(jvm)?);
        let made = simple_method_handle::make(self.target_type.clone(), form)?;
        let mut guard = self.cache.uninitialized_call_site.write();
        if let Some(cached) = MethodHandle::upgrade(&guard) {
            return Ok(cached);
        }
        *guard = made.downgrade();
        Ok(made)
    }

    /// `(A..., CallSite)R`: reads the call site's current target and invokes it.
    pub fn link_to_call_site_form(&self, jvm: &JVMState) -> InvokeResult<Arc<LambdaForm>> {
        self.trailing_linker_form(jvm, LambdaFormKind::LinkToCallSite)
    }

    /// `(A..., MethodHandle)R`: invokes the trailing handle without checks.
    pub fn link_to_target_method_form(&self, jvm: &JVMState) -> InvokeResult<Arc<LambdaForm>> {
        self.trailing_linker_form(jvm, LambdaFormKind::LinkToTargetMethod)
    }

    fn trailing_linker_form(&self, jvm: &JVMState, kind: LambdaFormKind) -> InvokeResult<Arc<LambdaForm>> {
        let basic_type = self.target_type.basic_type();
        let type_form = basic_type.form();
        if let Some(cached) = type_form.cached_lambda_form(kind) {
            return Ok(cached);
        }
        let mut params = BasicType::from_types(basic_type.parameter_list());
        let arity = params.len();
        params.push(BasicType::L);
        let mut builder = LambdaFormBuilder::new(format!("Invokers.{}", kind.name()), &params);
        let target = match kind {
            LambdaFormKind::LinkToCallSite => builder.add(BasicType::L, Intrinsic::GetCallSiteTarget, vec![builder.param(arity)]),
            _ => builder.param(arity),
        };
        let mut args = vec![target];
        args.extend(builder.params(0..arity));
        builder.add(BasicType::from_type(&basic_type.return_type()), Intrinsic::InvokeBasic, args);
        let form = Arc::new(builder.build_returning_last(jvm)?);
        Ok(type_form.set_cached_lambda_form(kind, form))
    }
}

/// The invoker forms over an invoker type `(MethodHandle, A...)R`. Parameter 0 is the invoker itself.
fn invoker_form(jvm: &JVMState, invoker_type: &MethodType, kind: LambdaFormKind) -> InvokeResult<Arc<LambdaForm>> {
    let basic_type = invoker_type.basic_type();
    let type_form = basic_type.form();
    if let Some(cached) = type_form.cached_lambda_form(kind) {
        return Ok(cached);
    }
    let mut params = vec![BasicType::L];
    params.extend(BasicType::from_types(basic_type.parameter_list()));
    let arity = params.len();
    let rtype = BasicType::from_type(&basic_type.return_type());
    let mut builder = LambdaFormBuilder::new(format!("Invokers.{}", kind.name()), &params);
    let target = match kind {
        LambdaFormKind::ExactInvoker | LambdaFormKind::GenericInvoker => {
            let check = if kind == LambdaFormKind::ExactInvoker { Intrinsic::CheckExactType } else { Intrinsic::CheckGenericType };
            let invoker_type = builder.add(BasicType::L, Intrinsic::BoundArgument(0), vec![builder.param(0)]);
            builder.add(BasicType::L, check, vec![builder.param(1), invoker_type])
        }
        LambdaFormKind::SpreadInvoker => {
            let pre_spread_type = builder.add(BasicType::L, Intrinsic::BoundArgument(0), vec![builder.param(0)]);
            let spread_count = builder.add(BasicType::I, Intrinsic::BoundArgument(1), vec![builder.param(0)]);
            builder.add(BasicType::L, Intrinsic::SpreadTarget, vec![builder.param(1), pre_spread_type, spread_count])
        }
        LambdaFormKind::BasicInvoker => builder.param(1),
        other => return Err(InvokeError::IllegalArgument(format!("{} is not an invoker kind", other.name()))),
    };
    let mut args = vec![target];
    args.extend(builder.params(2..arity));
    builder.add(rtype, Intrinsic::InvokeBasic, args);
    let form = Arc::new(builder.build_returning_last(jvm)?);
    Ok(type_form.set_cached_lambda_form(kind, form))
}

/// The array type a spread invoker collects the arguments after `from_pos` into. They must all have the same type.
pub fn implied_restarg_type(restarg_type: &MethodType, from_pos: usize) -> InvokeResult<CPDType> {
    if restarg_type.is_generic() {
        return Ok(CPDType::object_array());
    }
    let ptypes = restarg_type.parameter_list();
    let arg_type = match ptypes.get(from_pos) {
        None => return Ok(CPDType::object_array()),
        Some(arg_type) => *arg_type,
    };
    if ptypes[from_pos + 1..].iter().any(|ptype| *ptype != arg_type) {
        return Err(InvokeError::IllegalArgument(format!("need homogeneous rest arguments: {}", restarg_type)));
    }
    if arg_type.is_object() {
        return Ok(CPDType::object_array());
    }
    Ok(CPDType::array(arg_type))
}
