use std::sync::Arc;

use itertools::Itertools;

use crate::exceptions::{InvokeError, InvokeResult};
use crate::java_values::JavaValue;
use crate::jvm_state::JVMState;
use crate::stdlib::java::lang::invoke::lambda_form::basic_type::BasicType;
use crate::stdlib::java::lang::invoke::lambda_form::LambdaForm;
use crate::stdlib::java::lang::invoke::lambda_form::LambdaFormBuilder;
use crate::stdlib::java::lang::invoke::lambda_form::named_function::Intrinsic;
use crate::stdlib::java::lang::invoke::method_handle::{MethodHandle, MethodHandleKind};
use crate::stdlib::java::lang::invoke::method_type::MethodType;
use crate::stdlib::java::lang::invoke::method_type_form::LambdaFormKind;

/// A handle carrying fixed values, read by its form through `BoundArgument(i)`.
pub struct BoundMethodHandle {
    values: Box<[JavaValue]>,
}

impl BoundMethodHandle {
    pub fn arg(&self, i: usize) -> InvokeResult<JavaValue> {
        self.values.get(i).cloned().ok_or(InvokeError::IndexOutOfRange { index: i, len: self.values.len() })
    }

    pub fn values(&self) -> &[JavaValue] {
        &self.values
    }

    pub fn make(type_: MethodType, form: Arc<LambdaForm>, values: Vec<JavaValue>) -> InvokeResult<MethodHandle> {
        MethodHandle::new(type_, form, MethodHandleKind::Bound(BoundMethodHandle { values: values.into_boxed_slice() }))
    }

    /// Same bound values, new type and form.
    pub fn copy_with(handle: &MethodHandle, type_: MethodType, form: Arc<LambdaForm>) -> InvokeResult<MethodHandle> {
        let bound = Self::unwrap_bound(handle)?;
        Self::make(type_, form, bound.values.to_vec())
    }

    pub fn copy_with_extra_argument(handle: &MethodHandle, type_: MethodType, form: Arc<LambdaForm>, value: JavaValue) -> InvokeResult<MethodHandle> {
        let bound = Self::unwrap_bound(handle)?;
        let values = bound.values.iter().cloned().chain(std::iter::once(value)).collect_vec();
        Self::make(type_, form, values)
    }

    fn unwrap_bound(handle: &MethodHandle) -> InvokeResult<&BoundMethodHandle> {
        handle.kind().try_unwrap_bound().ok_or_else(|| InvokeError::IllegalState(format!("{} is not a bound handle", handle)))
    }

    /// Wraps `target` so the wrapper can carry bound values: `t = bound(0); t.invokeBasic(args...)`.
    pub(crate) fn make_rebound(jvm: &JVMState, target: &MethodHandle) -> InvokeResult<MethodHandle> {
        let form = rebind_form(jvm, target.type_())?;
        Self::make(target.type_().clone(), form, vec![target.clone().into()])
    }

    /// Drops parameter `pos` from `bound`'s type, supplying `value` for it from a new bound slot.
    pub(crate) fn bind_argument(jvm: &JVMState, bound: &MethodHandle, pos: usize, value: JavaValue) -> InvokeResult<MethodHandle> {
        let this = Self::unwrap_bound(bound)?;
        let ptype = bound.type_().parameter_type(pos)?;
        if value.basic_type() != BasicType::from_type(&ptype) {
            return Err(InvokeError::IllegalArgument(format!("cannot bind {:?} as {}", value, ptype.java_source_representation())));
        }
        let new_type = bound.type_().drop_parameter_types(pos, pos + 1)?;
        let new_form = bound.form().bind(jvm, pos + 1, this.values.len())?;
        Self::copy_with_extra_argument(bound, new_type, new_form, value)
    }
}

fn rebind_form(jvm: &JVMState, type_: &MethodType) -> InvokeResult<Arc<LambdaForm>> {
    let basic_type = type_.basic_type();
    let type_form = basic_type.form();
    if let Some(cached) = type_form.cached_lambda_form(LambdaFormKind::Rebind) {
        return Ok(cached);
    }
    let ptypes = BasicType::from_types(basic_type.parameter_list());
    let arity = ptypes.len() + 1;
    let mut params = vec![BasicType::L];
    params.extend(ptypes);
    let mut builder = LambdaFormBuilder::new("BMH.reinvoke", &params);
    let target = builder.add(BasicType::L, Intrinsic::BoundArgument(0), vec![builder.param(0)]);
    let mut args = vec![target];
    args.extend(builder.params(1..arity));
    builder.add(BasicType::from_type(&basic_type.return_type()), Intrinsic::InvokeBasic, args);
    let form = Arc::new(builder.build_returning_last(jvm)?);
    Ok(type_form.set_cached_lambda_form(LambdaFormKind::Rebind, form))
}
