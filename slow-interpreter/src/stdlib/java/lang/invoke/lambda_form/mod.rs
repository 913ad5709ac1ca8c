use std::cell::Cell;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicU32, Ordering};

use itertools::Itertools;
use parking_lot::RwLock;

use crate::exceptions::{InvokeError, InvokeResult};
use crate::java_values::JavaValue;
use crate::jvm_state::JVMState;
use crate::stdlib::java::lang::invoke::lambda_form::basic_type::BasicType;
use crate::stdlib::java::lang::invoke::lambda_form::compiled::CompiledLambdaForm;
use crate::stdlib::java::lang::invoke::lambda_form::name::{Name, NameArg};
use crate::stdlib::java::lang::invoke::lambda_form::named_function::{Intrinsic, NamedFunction};

pub mod basic_type;
pub mod name;
pub mod named_function;
pub mod intrinsics;
pub mod compiled;

/// An execution plan: `arity` parameters followed by calls over earlier names.
///
/// Forms are immutable. `bind`, `add_arguments` and `permute_arguments` build new forms.
pub struct LambdaForm {
    arity: usize,
    names: Vec<Name>,
    result: Option<usize>,
    debug_name: String,
    invocation_counter: AtomicU32,
    compiled: OnceLock<CompiledLambdaForm>,
    bind_cache: RwLock<HashMap<(usize, usize), Arc<LambdaForm>>>,
}

impl LambdaForm {
    fn new(debug_name: String, arity: usize, names: Vec<Name>, result: Option<usize>) -> InvokeResult<Self> {
        if arity > names.len() {
            return Err(InvokeError::IllegalArgument(format!("{}: arity {} exceeds {} names", debug_name, arity, names.len())));
        }
        for (i, name) in names.iter().enumerate() {
            if name.index != i || name.is_param() != (i < arity) {
                return Err(InvokeError::IllegalArgument(format!("{}: misplaced name {:?}", debug_name, name)));
            }
            if let Some(bad_ref) = name.referenced_names().find(|referenced| *referenced >= i) {
                return Err(InvokeError::IllegalArgument(format!("{}: {:?} refers forward to t{}", debug_name, name, bad_ref)));
            }
        }
        if let Some(result) = result {
            if result >= names.len() {
                return Err(InvokeError::IndexOutOfRange { index: result, len: names.len() });
            }
        }
        Ok(Self {
            arity,
            names,
            result,
            debug_name,
            invocation_counter: AtomicU32::new(0),
            compiled: OnceLock::new(),
            bind_cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn names(&self) -> &[Name] {
        &self.names
    }

    pub fn result(&self) -> Option<usize> {
        self.result
    }

    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    pub fn parameter_types(&self) -> Vec<BasicType> {
        self.names[..self.arity].iter().map(|name| name.basic_type).collect()
    }

    pub fn return_type(&self) -> BasicType {
        match self.result {
            None => BasicType::V,
            Some(result) => self.names[result].basic_type,
        }
    }

    pub fn invocation_count(&self) -> u32 {
        self.invocation_counter.load(Ordering::Relaxed)
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    pub fn compile(&self, jvm: &JVMState) -> &CompiledLambdaForm {
        self.compiled.get_or_init(|| {
            jvm.tracing().trace_lambda_form_compiled(&self.debug_name, self.invocation_count());
            CompiledLambdaForm::new(self)
        })
    }

    /// Runs the form: compiled if it has been compiled or has now been invoked often enough, interpreted otherwise.
    pub fn invoke(&self, jvm: &JVMState, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
        if let Some(compiled) = self.compiled.get() {
            return compiled.invoke(jvm, args);
        }
        let invocations = self.invocation_counter.fetch_add(1, Ordering::Relaxed) + 1;
        if invocations >= jvm.options.compile_threshold() {
            return self.compile(jvm).invoke(jvm, args);
        }
        self.interpret(jvm, args)
    }

    pub fn interpret(&self, jvm: &JVMState, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
        if args.len() != self.arity {
            return Err(InvokeError::IllegalState(format!("{} expects {} arguments but got {}", self.debug_name, self.arity, args.len())));
        }
        let verify = jvm.options.verify_lambda_forms();
        let mut values = args;
        values.reserve(self.names.len() - self.arity);
        if verify {
            for (name, value) in self.names.iter().zip(values.iter()) {
                self.verify_value(name, value)?;
            }
        }
        for name in self.names[self.arity..].iter() {
            let arguments = name.arguments.iter().map(|arg| match arg {
                NameArg::Name(index) => values[*index].clone(),
                NameArg::Constant(constant) => constant.clone(),
            }).collect_vec();
            let function = match name.function.as_ref() {
                Some(function) => function,
                None => unreachable!("parameter {} after the leading arguments", name.index),
            };
            let value = function.invoke(jvm, arguments)?;
            if verify {
                self.verify_value(name, &value)?;
            }
            values.push(value);
        }
        Ok(match self.result {
            None => JavaValue::Top,
            Some(result) => values.swap_remove(result),
        })
    }

    fn verify_value(&self, name: &Name, value: &JavaValue) -> InvokeResult<()> {
        if value.basic_type() != name.basic_type {
            return Err(InvokeError::IllegalState(format!("{}: {:?} produced {:?}", self.debug_name, name, value)));
        }
        Ok(())
    }

    fn rebuild(&self, debug_name: String, new_params: &[BasicType], inserted: Vec<(BasicType, NamedFunction, Vec<NameArg>)>, old_param_map: &[NameArg]) -> InvokeResult<LambdaForm> {
        let new_arity = new_params.len();
        let body_start = new_arity + inserted.len();
        let remap = |old: usize| if old < self.arity {
            old_param_map[old].clone()
        } else {
            NameArg::Name(body_start + old - self.arity)
        };
        let mut names = new_params.iter().enumerate().map(|(i, basic_type)| Name::parameter(i, *basic_type)).collect_vec();
        for (basic_type, function, arguments) in inserted {
            names.push(Name { index: names.len(), basic_type, function: Some(function), arguments });
        }
        for old_name in self.names[self.arity..].iter() {
            names.push(Name {
                index: names.len(),
                basic_type: old_name.basic_type,
                function: old_name.function.clone(),
                arguments: old_name.arguments.iter().map(|arg| arg.remap(remap)).collect(),
            });
        }
        let result = match self.result.map(remap) {
            None => None,
            Some(NameArg::Name(index)) => Some(index),
            Some(NameArg::Constant(_)) => return Err(InvokeError::IllegalArgument(format!("{}: result cannot be a constant", debug_name))),
        };
        LambdaForm::new(debug_name, new_arity, names, result)
    }

    /// Removes parameter `pos` and reads it instead from bound value `bound_index` of the handle in parameter 0.
    pub fn bind(&self, jvm: &JVMState, pos: usize, bound_index: usize) -> InvokeResult<Arc<LambdaForm>> {
        if pos == 0 || pos >= self.arity {
            return Err(InvokeError::IndexOutOfRange { index: pos, len: self.arity });
        }
        if let Some(cached) = self.bind_cache.read().get(&(pos, bound_index)) {
            return Ok(cached.clone());
        }
        let params = self.parameter_types();
        let new_params = params.iter().enumerate().filter(|(i, _)| *i != pos).map(|(_, basic_type)| *basic_type).collect_vec();
        let new_arity = new_params.len();
        let old_param_map = (0..self.arity).map(|i| NameArg::Name(match i.cmp(&pos) {
            std::cmp::Ordering::Less => i,
            std::cmp::Ordering::Equal => new_arity,
            std::cmp::Ordering::Greater => i - 1,
        })).collect_vec();
        let inserted = vec![(params[pos], NamedFunction::Intrinsic(Intrinsic::BoundArgument(bound_index)), vec![NameArg::Name(0)])];
        let form = Arc::new(self.rebuild(format!("{}:bind{}", self.debug_name, pos), new_params.as_slice(), inserted, old_param_map.as_slice())?);
        jvm.tracing().trace_lambda_form_created(form.debug_name());
        Ok(self.bind_cache.write().entry((pos, bound_index)).or_insert(form).clone())
    }

    /// Inserts ignored parameters of `types` at `pos`.
    pub fn add_arguments(&self, jvm: &JVMState, pos: usize, types: &[BasicType]) -> InvokeResult<LambdaForm> {
        if pos == 0 || pos > self.arity {
            return Err(InvokeError::IndexOutOfRange { index: pos, len: self.arity });
        }
        let params = self.parameter_types();
        let new_params = params[..pos].iter().chain(types.iter()).chain(params[pos..].iter()).copied().collect_vec();
        let old_param_map = (0..self.arity).map(|i| NameArg::Name(if i < pos { i } else { i + types.len() })).collect_vec();
        let form = self.rebuild(format!("{}:add{}", self.debug_name, pos), new_params.as_slice(), vec![], old_param_map.as_slice())?;
        jvm.tracing().trace_lambda_form_created(form.debug_name());
        Ok(form)
    }

    /// The first `skip` parameters are kept; the rest are replaced by `types`, and old parameter `skip + i`
    /// is read from new parameter `skip + reorder[i]`.
    pub fn permute_arguments(&self, jvm: &JVMState, skip: usize, reorder: &[usize], types: &[BasicType]) -> InvokeResult<LambdaForm> {
        if skip > self.arity || reorder.len() != self.arity - skip {
            return Err(InvokeError::IllegalArgument(format!("bad reorder array: {} entries for {} arguments", reorder.len(), self.arity.saturating_sub(skip))));
        }
        let params = self.parameter_types();
        for (i, new_i) in reorder.iter().enumerate() {
            let new_type = types.get(*new_i).ok_or(InvokeError::IndexOutOfRange { index: *new_i, len: types.len() })?;
            if *new_type != params[skip + i] {
                return Err(InvokeError::IllegalArgument(format!("argument {} of type {:?} cannot take new argument {} of type {:?}", skip + i, params[skip + i], new_i, new_type)));
            }
        }
        let new_params = params[..skip].iter().chain(types.iter()).copied().collect_vec();
        let old_param_map = (0..self.arity).map(|i| NameArg::Name(if i < skip { i } else { skip + reorder[i - skip] })).collect_vec();
        let form = self.rebuild(format!("{}:permute", self.debug_name), new_params.as_slice(), vec![], old_param_map.as_slice())?;
        jvm.tracing().trace_lambda_form_created(form.debug_name());
        Ok(form)
    }
}

impl Debug for LambdaForm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}=Lambda({})=>{{{}}}", self.debug_name, self.names[..self.arity].iter().map(|name| format!("{:?}", name)).join(","), self.names[self.arity..].iter().map(|name| format!("{:?}", name)).join(";"))
    }
}

/// Builds a form name by name. Parameters come first; each added name may refer to anything added before it.
pub struct LambdaFormBuilder {
    debug_name: String,
    arity: usize,
    names: Vec<Name>,
    //first out of range parameter asked for, reported by build
    bad_param: Cell<Option<usize>>,
}

impl LambdaFormBuilder {
    pub fn new(debug_name: impl Into<String>, params: &[BasicType]) -> Self {
        Self {
            debug_name: debug_name.into(),
            arity: params.len(),
            names: params.iter().enumerate().map(|(i, basic_type)| Name::parameter(i, *basic_type)).collect(),
            bad_param: Cell::new(None),
        }
    }

    pub fn param(&self, i: usize) -> NameArg {
        if i >= self.arity && self.bad_param.get().is_none() {
            self.bad_param.set(Some(i));
        }
        NameArg::Name(i)
    }

    pub fn params(&self, range: std::ops::Range<usize>) -> Vec<NameArg> {
        range.map(|i| self.param(i)).collect()
    }

    pub fn add(&mut self, basic_type: BasicType, function: impl Into<NamedFunction>, arguments: Vec<NameArg>) -> NameArg {
        let index = self.names.len();
        self.names.push(Name { index, basic_type, function: Some(function.into()), arguments });
        NameArg::Name(index)
    }

    /// Finishes the form; a `None` result makes it return void.
    pub fn build(self, jvm: &JVMState, result: Option<NameArg>) -> InvokeResult<LambdaForm> {
        if let Some(index) = self.bad_param.get() {
            return Err(InvokeError::IndexOutOfRange { index, len: self.arity });
        }
        let result = match result {
            None => None,
            Some(NameArg::Name(index)) => Some(index),
            Some(NameArg::Constant(_)) => return Err(InvokeError::IllegalArgument(format!("{}: result cannot be a constant", self.debug_name))),
        };
        let signature = BasicType::signature(&self.names[..self.arity].iter().map(|name| name.basic_type).collect_vec(), result.map(|result| self.names[result].basic_type).unwrap_or(BasicType::V));
        let form = LambdaForm::new(format!("{}_{}", self.debug_name, signature), self.arity, self.names, result)?;
        jvm.tracing().trace_lambda_form_created(form.debug_name());
        Ok(form)
    }

    /// Finishes the form, returning the last name added unless it is void.
    pub fn build_returning_last(self, jvm: &JVMState) -> InvokeResult<LambdaForm> {
        let last = self.names.last().filter(|name| !name.is_param() && name.basic_type != BasicType::V).map(|name| NameArg::Name(name.index));
        self.build(jvm, last)
    }
}

#[cfg(test)]
pub mod test {
    use std::sync::Arc;

    use crate::exceptions::InvokeError;
    use crate::java_values::JavaValue;
    use crate::jvm_state::JVMState;
    use crate::options::JVMOptions;
    use crate::stdlib::java::lang::invoke::lambda_form::basic_type::BasicType;
    use crate::stdlib::java::lang::invoke::lambda_form::LambdaFormBuilder;
    use crate::stdlib::java::lang::invoke::lambda_form::name::NameArg;
    use crate::stdlib::java::lang::invoke::lambda_form::named_function::Intrinsic;

    fn jvm(compile_threshold: u32) -> JVMState {
        JVMState::new(JVMOptions::default().with_compile_threshold(compile_threshold)).unwrap()
    }

    #[test]
    pub fn identity_form_interprets_then_compiles() {
        let jvm = jvm(3);
        let mut builder = LambdaFormBuilder::new("test", &[BasicType::L, BasicType::I]);
        let arg = builder.param(1);
        builder.add(BasicType::I, Intrinsic::Identity, vec![arg]);
        let form = builder.build_returning_last(&jvm).unwrap();
        assert_eq!(form.debug_name(), "test_LI_I");
        for i in 0..5 {
            assert_eq!(form.invoke(&jvm, vec![JavaValue::null(), JavaValue::Int(i)]).unwrap(), JavaValue::Int(i));
        }
        assert!(form.is_compiled());
        assert_eq!(form.invocation_count(), 3);
    }

    #[test]
    pub fn verification_catches_basic_type_mismatch() {
        let jvm = jvm(100);
        let mut builder = LambdaFormBuilder::new("bad", &[BasicType::L, BasicType::I]);
        let arg = builder.param(1);
        builder.add(BasicType::J, Intrinsic::Identity, vec![arg]);
        let form = builder.build_returning_last(&jvm).unwrap();
        assert!(form.invoke(&jvm, vec![JavaValue::null(), JavaValue::Int(1)]).is_err());
        assert!(form.interpret(&jvm, vec![JavaValue::null(), JavaValue::Long(1)]).is_err());
    }

    #[test]
    pub fn forward_references_are_rejected() {
        let jvm = jvm(100);
        let mut builder = LambdaFormBuilder::new("forward", &[BasicType::L]);
        builder.add(BasicType::L, Intrinsic::Identity, vec![NameArg::Name(1)]);
        assert!(builder.build_returning_last(&jvm).is_err());
    }

    #[test]
    pub fn missing_parameter_fails_build() {
        let jvm = jvm(100);
        let mut builder = LambdaFormBuilder::new("short", &[BasicType::L, BasicType::I]);
        builder.add(BasicType::I, Intrinsic::Identity, vec![builder.param(1)]);
        builder.add(BasicType::I, Intrinsic::Identity, vec![builder.param(2)]);
        assert!(matches!(builder.build_returning_last(&jvm), Err(InvokeError::IndexOutOfRange { index: 2, len: 2 })));
    }

    #[test]
    pub fn edits_produce_new_forms() {
        let jvm = jvm(100);
        let mut builder = LambdaFormBuilder::new("pick", &[BasicType::L, BasicType::I, BasicType::J]);
        let arg = builder.param(2);
        builder.add(BasicType::J, Intrinsic::Identity, vec![arg]);
        let form = builder.build_returning_last(&jvm).unwrap();

        let added = form.add_arguments(&jvm, 1, &[BasicType::F]).unwrap();
        assert_eq!(added.parameter_types(), vec![BasicType::L, BasicType::F, BasicType::I, BasicType::J]);
        assert_eq!(added.invoke(&jvm, vec![JavaValue::null(), JavaValue::Float(1.0), JavaValue::Int(2), JavaValue::Long(3)]).unwrap(), JavaValue::Long(3));

        let permuted = form.permute_arguments(&jvm, 1, &[1, 0], &[BasicType::J, BasicType::I]).unwrap();
        assert_eq!(permuted.invoke(&jvm, vec![JavaValue::null(), JavaValue::Long(7), JavaValue::Int(2)]).unwrap(), JavaValue::Long(7));
        assert!(form.permute_arguments(&jvm, 1, &[0, 1], &[BasicType::J, BasicType::I]).is_err());

        let bound = form.bind(&jvm, 2, 0).unwrap();
        assert_eq!(bound.parameter_types(), vec![BasicType::L, BasicType::I]);
        assert!(Arc::ptr_eq(&bound, &form.bind(&jvm, 2, 0).unwrap()));
        assert_eq!(form.arity(), 3);
    }
}
