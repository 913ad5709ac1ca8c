use itertools::Itertools;

use crate::exceptions::{InvokeError, InvokeResult};
use crate::java_values::JavaValue;
use crate::jvm_state::JVMState;
use crate::stdlib::java::lang::invoke::lambda_form::LambdaForm;
use crate::stdlib::java::lang::invoke::lambda_form::name::NameArg;
use crate::stdlib::java::lang::invoke::lambda_form::named_function::{Intrinsic, IntrinsicImpl, NamedFunction};
use crate::stdlib::java::lang::invoke::method_handle::MethodHandle;

enum CompiledFunction {
    Intrinsic { implementation: IntrinsicImpl, intrinsic: Intrinsic },
    Invoke(MethodHandle),
}

enum CompiledArg {
    Slot(usize),
    Constant(JavaValue),
}

struct CompiledStep {
    function: CompiledFunction,
    args: Box<[CompiledArg]>,
}

/// A lambda form with every primitive pre-resolved to its function pointer. Runs without
/// per-name type verification.
pub struct CompiledLambdaForm {
    arity: usize,
    steps: Box<[CompiledStep]>,
    result: Option<usize>,
}

impl CompiledLambdaForm {
    pub(crate) fn new(form: &LambdaForm) -> Self {
        let steps = form.names()[form.arity()..].iter().map(|name| {
            let function = match name.function.as_ref() {
                Some(NamedFunction::Intrinsic(intrinsic)) => CompiledFunction::Intrinsic { implementation: intrinsic.implementation(), intrinsic: *intrinsic },
                Some(NamedFunction::Invoke(method_handle)) => CompiledFunction::Invoke(method_handle.clone()),
                None => unreachable!("parameter {} after the leading arguments", name.index),
            };
            let args = name.arguments.iter().map(|arg| match arg {
                NameArg::Name(index) => CompiledArg::Slot(*index),
                NameArg::Constant(constant) => CompiledArg::Constant(constant.clone()),
            }).collect();
            CompiledStep { function, args }
        }).collect();
        Self { arity: form.arity(), steps, result: form.result() }
    }

    pub fn invoke(&self, jvm: &JVMState, mut values: Vec<JavaValue>) -> InvokeResult<JavaValue> {
        if values.len() != self.arity {
            return Err(InvokeError::IllegalState(format!("compiled form expects {} arguments but got {}", self.arity, values.len())));
        }
        values.reserve(self.steps.len());
        for step in self.steps.iter() {
            let args = step.args.iter().map(|arg| match arg {
                CompiledArg::Slot(slot) => values[*slot].clone(),
                CompiledArg::Constant(constant) => constant.clone(),
            }).collect_vec();
            let value = match &step.function {
                CompiledFunction::Intrinsic { implementation, intrinsic } => implementation(jvm, *intrinsic, args)?,
                CompiledFunction::Invoke(method_handle) => method_handle.invoke_basic(jvm, args)?,
            };
            values.push(value);
        }
        Ok(match self.result {
            None => JavaValue::Top,
            Some(result) => values.swap_remove(result),
        })
    }
}
