use std::sync::Arc;

use parking_lot::RwLock;

use rust_jvm_common::compressed_classfile::CPDType;

use crate::exceptions::{InvokeError, InvokeResult};
use crate::instance_of_common::is_assignable;
use crate::jvm_state::JVMState;
use crate::stdlib::java::lang::invoke::lambda_form::basic_type::BasicType;
use crate::stdlib::java::lang::invoke::lambda_form::{LambdaForm, LambdaFormBuilder};
use crate::stdlib::java::lang::invoke::lambda_form::named_function::Intrinsic;
use crate::stdlib::java::lang::invoke::method_handle::{MethodHandle, MethodHandleKind};
use crate::stdlib::java::lang::invoke::method_type::MethodType;
use crate::stdlib::java::lang::invoke::method_type_form::LambdaFormKind;

/// A fixed-arity handle that `as_type` adapts to any arity by collecting trailing arguments into `array_type`.
pub struct VarargsCollector {
    target: MethodHandle,
    array_type: CPDType,
    as_collector_cache: RwLock<Option<MethodHandle>>,
}

impl VarargsCollector {
    pub fn target(&self) -> &MethodHandle {
        &self.target
    }

    pub fn array_type(&self) -> CPDType {
        self.array_type
    }

    pub(crate) fn make(jvm: &JVMState, target: MethodHandle, array_type: CPDType) -> InvokeResult<MethodHandle> {
        let type_ = target.type_().clone();
        let form = delegate_form(jvm, &type_)?;
        MethodHandle::new(type_, form, MethodHandleKind::VarargsCollector(VarargsCollector {
            target,
            array_type,
            as_collector_cache: RwLock::new(None),
        }))
    }

    pub(crate) fn as_type_uncached(&self, jvm: &JVMState, this: &MethodHandle, new_type: &MethodType) -> InvokeResult<MethodHandle> {
        let type_ = this.type_();
        let collect_arg = type_.parameter_count() - 1;
        let new_arity = new_type.parameter_count();
        if new_arity == collect_arg + 1 {
            let trailing = type_.parameter_type(collect_arg)?;
            let new_trailing = new_type.parameter_type(collect_arg)?;
            if is_assignable(jvm, &new_trailing, &trailing) {
                return self.target.as_type(jvm, new_type);
            }
        }
        if let Some(collector) = self.as_collector_cache.read().as_ref() {
            if collector.type_().parameter_count() == new_arity {
                return collector.as_type(jvm, new_type);
            }
        }
        if new_arity < collect_arg {
            return Err(InvokeError::WrongMethodType(format!("cannot build collector for {} from {}", new_type, type_)));
        }
        let collector = self.target.as_collector(jvm, &self.array_type, new_arity - collect_arg).map_err(|err| match err {
            InvokeError::IllegalArgument(msg) => InvokeError::WrongMethodType(format!("cannot build collector: {}", msg)),
            other => other,
        })?;
        *self.as_collector_cache.write() = Some(collector.clone());
        collector.as_type(jvm, new_type)
    }
}

/// `t = delegate target; t.invokeBasic(args...)`
fn delegate_form(jvm: &JVMState, type_: &MethodType) -> InvokeResult<Arc<LambdaForm>> {
    let basic_type = type_.basic_type();
    let type_form = basic_type.form();
    if let Some(cached) = type_form.cached_lambda_form(LambdaFormKind::DelegateReinvoke) {
        return Ok(cached);
    }
    let mut params = vec![BasicType::L];
    params.extend(BasicType::from_types(basic_type.parameter_list()));
    let arity = params.len();
    let mut builder = LambdaFormBuilder::new("DMH.delegate", &params);
    let target = builder.add(BasicType::L, Intrinsic::DelegateTarget, vec![builder.param(0)]);
    let mut args = vec![target];
    args.extend(builder.params(1..arity));
    builder.add(BasicType::from_type(&basic_type.return_type()), Intrinsic::InvokeBasic, args);
    let form = Arc::new(builder.build_returning_last(jvm)?);
    Ok(type_form.set_cached_lambda_form(LambdaFormKind::DelegateReinvoke, form))
}
