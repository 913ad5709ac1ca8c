use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::exceptions::{InvokeError, InvokeResult};
use crate::jvm_state::JVMState;
use crate::stdlib::java::lang::invoke::bound_method_handle::BoundMethodHandle;
use crate::stdlib::java::lang::invoke::lambda_form::basic_type::BasicType;
use crate::stdlib::java::lang::invoke::lambda_form::{LambdaForm, LambdaFormBuilder};
use crate::stdlib::java::lang::invoke::lambda_form::named_function::Intrinsic;
use crate::stdlib::java::lang::invoke::method_handle::MethodHandle;
use crate::stdlib::java::lang::invoke::method_type::MethodType;
use crate::stdlib::java::lang::invoke::method_type_form::LambdaFormKind;

struct CallSiteInner {
    type_: MethodType,
    target: RwLock<MethodHandle>,
}

/// A typed holder of a replaceable target handle.
#[derive(Clone)]
pub struct CallSite(Arc<CallSiteInner>);

impl CallSite {
    /// A call site whose target fails until one is set.
    pub fn new(jvm: &JVMState, type_: MethodType) -> InvokeResult<Self> {
        let target = type_.invokers().uninitialized_call_site(jvm)?;
        Ok(Self::with_target_unchecked(type_, target))
    }

    pub fn with_target(target: MethodHandle) -> Self {
        Self::with_target_unchecked(target.type_().clone(), target)
    }

    fn with_target_unchecked(type_: MethodType, target: MethodHandle) -> Self {
        CallSite(Arc::new(CallSiteInner { type_, target: RwLock::new(target) }))
    }

    pub fn type_(&self) -> &MethodType {
        &self.0.type_
    }

    pub fn get_target(&self) -> MethodHandle {
        self.0.target.read().clone()
    }

    pub fn set_target(&self, new_target: MethodHandle) -> InvokeResult<()> {
        if *new_target.type_() != self.0.type_ {
            return Err(InvokeError::WrongMethodType(format!("{} should be of type {} but is of type {}", new_target, self.0.type_, new_target.type_())));
        }
        *self.0.target.write() = new_target;
        Ok(())
    }

    /// A handle of the call site's type that always calls the current target.
    pub fn dynamic_invoker(&self, jvm: &JVMState) -> InvokeResult<MethodHandle> {
        let form = dynamic_invoker_form(jvm, &self.0.type_)?;
        BoundMethodHandle::make(self.0.type_.clone(), form, vec![self.clone().into()])
    }

    pub fn ptr_eq(&self, other: &CallSite) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

fn dynamic_invoker_form(jvm: &JVMState, type_: &MethodType) -> InvokeResult<Arc<LambdaForm>> {
    let basic_type = type_.basic_type();
    let type_form = basic_type.form();
    if let Some(cached) = type_form.cached_lambda_form(LambdaFormKind::DynamicInvoker) {
        return Ok(cached);
    }
    let mut params = vec![BasicType::L];
    params.extend(BasicType::from_types(basic_type.parameter_list()));
    let arity = params.len();
    let mut builder = LambdaFormBuilder::new("CallSite.dynamicInvoker", &params);
    let call_site = builder.add(BasicType::L, Intrinsic::BoundArgument(0), vec![builder.param(0)]);
    let target = builder.add(BasicType::L, Intrinsic::GetCallSiteTarget, vec![call_site]);
    let mut args = vec![target];
    args.extend(builder.params(1..arity));
    builder.add(BasicType::from_type(&basic_type.return_type()), Intrinsic::InvokeBasic, args);
    let form = Arc::new(builder.build_returning_last(jvm)?);
    Ok(type_form.set_cached_lambda_form(LambdaFormKind::DynamicInvoker, form))
}

impl Debug for CallSite {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CallSite{}", self.0.type_)
    }
}

#[cfg(test)]
pub mod test {
    use rust_jvm_common::compressed_classfile::CPDType;

    use crate::exceptions::InvokeError;
    use crate::java_values::JavaValue;
    use crate::jvm_state::JVMState;
    use crate::options::JVMOptions;
    use crate::stdlib::java::lang::invoke::call_site::CallSite;
    use crate::stdlib::java::lang::invoke::method_handles;
    use crate::stdlib::java::lang::invoke::method_type::MethodType;

    #[test]
    pub fn unlinked_call_site_fails_until_set() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        let type_ = MethodType::make(CPDType::IntType, vec![CPDType::IntType]).unwrap();
        let call_site = CallSite::new(&jvm, type_.clone()).unwrap();
        let dynamic_invoker = call_site.dynamic_invoker(&jvm).unwrap();
        assert!(matches!(dynamic_invoker.invoke_exact(&jvm, vec![JavaValue::Int(3)]), Err(InvokeError::IllegalState(_))));
        call_site.set_target(method_handles::identity(&jvm, CPDType::IntType).unwrap()).unwrap();
        assert_eq!(dynamic_invoker.invoke_exact(&jvm, vec![JavaValue::Int(3)]).unwrap(), JavaValue::Int(3));
        let wrong = method_handles::identity(&jvm, CPDType::LongType).unwrap();
        assert!(matches!(call_site.set_target(wrong), Err(InvokeError::WrongMethodType(_))));
    }
}
