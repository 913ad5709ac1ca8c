use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use strum::EnumCount;
use strum_macros::{EnumCount, EnumIter, IntoStaticStr};

use rust_jvm_common::primitive_wrapper::Wrapper;

use crate::stdlib::java::lang::invoke::lambda_form::basic_type::BasicType;
use crate::stdlib::java::lang::invoke::lambda_form::LambdaForm;
use crate::stdlib::java::lang::invoke::method_type::MethodType;

/// Slots of a [`LambdaFormKind::COUNT`]-sized per-form cache of shared lambda forms.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, EnumIter, EnumCount, IntoStaticStr)]
pub enum LambdaFormKind {
    InvokeVirtual,
    InvokeStatic,
    InvokeStaticInit,
    InvokeSpecial,
    InvokeInterface,
    NewInvokeSpecial,
    Rebind,
    DelegateReinvoke,
    ExactInvoker,
    GenericInvoker,
    BasicInvoker,
    SpreadInvoker,
    DynamicInvoker,
    LinkToCallSite,
    LinkToTargetMethod,
    Identity,
}

impl LambdaFormKind {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Which field access form: getter or setter, static or not, with or without a class-init check,
/// over one erased field kind.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FieldAccessKind {
    pub is_getter: bool,
    pub is_static: bool,
    pub needs_init: bool,
    pub needs_cast: bool,
    pub is_volatile: bool,
    pub field_kind: Wrapper,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ArgCounts {
    pub parameter_count: usize,
    pub parameter_slot_count: usize,
    pub primitive_count: usize,
    pub long_count: usize,
}

/// State shared by every method type with the same erasure. Owned by the erased type.
pub struct MethodTypeForm {
    //none when the erased type is already basic, which would otherwise point back at the owner
    basic_type: Option<MethodType>,
    counts: ArgCounts,
    lambda_forms: [RwLock<Option<Arc<LambdaForm>>>; LambdaFormKind::COUNT],
    field_forms: RwLock<HashMap<FieldAccessKind, Arc<LambdaForm>>>,
}

impl MethodTypeForm {
    pub(crate) fn new(erased_type: &MethodType) -> Self {
        let basic_type = MethodType::make_trusted(BasicType::from_type(&erased_type.return_type()).basic_type_class(), BasicType::from_types(erased_type.parameter_list()).into_iter().map(|basic| basic.basic_type_class()).collect());
        let basic_type = if basic_type == *erased_type { None } else { Some(basic_type) };
        let ptypes = erased_type.parameter_list();
        let counts = ArgCounts {
            parameter_count: ptypes.len(),
            parameter_slot_count: erased_type.parameter_slot_count(),
            primitive_count: ptypes.iter().filter(|ptype| ptype.is_primitive()).count(),
            long_count: ptypes.iter().filter(|ptype| ptype.is_double_or_long()).count(),
        };
        Self {
            basic_type,
            counts,
            lambda_forms: std::array::from_fn(|_| RwLock::new(None)),
            field_forms: RwLock::new(HashMap::new()),
        }
    }

    pub fn basic_type(&self) -> Option<&MethodType> {
        self.basic_type.as_ref()
    }

    pub fn counts(&self) -> ArgCounts {
        self.counts
    }

    pub fn cached_lambda_form(&self, kind: LambdaFormKind) -> Option<Arc<LambdaForm>> {
        self.lambda_forms[kind as usize].read().clone()
    }

    /// Installs `form` unless another thread got there first; either way returns the form now cached.
    pub fn set_cached_lambda_form(&self, kind: LambdaFormKind, form: Arc<LambdaForm>) -> Arc<LambdaForm> {
        let mut guard = self.lambda_forms[kind as usize].write();
        match guard.as_ref() {
            Some(prev) => prev.clone(),
            None => {
                *guard = Some(form.clone());
                form
            }
        }
    }

    pub fn cached_field_form(&self, kind: &FieldAccessKind) -> Option<Arc<LambdaForm>> {
        self.field_forms.read().get(kind).cloned()
    }

    pub fn set_cached_field_form(&self, kind: FieldAccessKind, form: Arc<LambdaForm>) -> Arc<LambdaForm> {
        self.field_forms.write().entry(kind).or_insert(form).clone()
    }
}
