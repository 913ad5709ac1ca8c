use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::thread;

use itertools::Itertools;

use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::compressed_classfile::names::{CClassName, MethodName};
use rust_jvm_common::compressed_classfile::CMethodDescriptor;
use rust_jvm_common::loading::LoaderName;
use rust_jvm_common::method_shape::MethodShape;

use crate::exceptions::{InvokeError, InvokeResult};
use crate::jvm_state::JVMState;
use crate::runtime_class::{ClassStatus, RuntimeClass};
use crate::view::{ClassView, HasAccessFlags};

/// Links `view` against the already defined classes and registers it. Superclass and interfaces must be defined first.
pub fn define_class(jvm: &JVMState, view: ClassView, loader: LoaderName) -> InvokeResult<Arc<RuntimeClass>> {
    let parent = match view.super_name() {
        None => {
            if view.name() != CClassName::object() {
                return Err(InvokeError::Linkage(format!("ClassFormatError: {} has no superclass", view.name())));
            }
            None
        }
        Some(super_name) => {
            let parent = check_loaded_class(jvm, super_name)?;
            if parent.view.is_interface() {
                return Err(InvokeError::Linkage(format!("IncompatibleClassChangeError: class {} has interface {} as super class", view.name(), super_name)));
            }
            if parent.view.is_final() {
                return Err(InvokeError::Linkage(format!("VerifyError: cannot inherit from final class {}", super_name)));
            }
            Some(parent)
        }
    };
    let interfaces = view.interfaces().iter().map(|interface| {
        let interface_class = check_loaded_class(jvm, *interface)?;
        if !interface_class.view.is_interface() {
            return Err(InvokeError::Linkage(format!("IncompatibleClassChangeError: class {} can not implement {}, because it is not an interface", view.name(), interface)));
        }
        Ok(interface_class)
    }).collect::<InvokeResult<Vec<_>>>()?;
    let name = view.name();
    let runtime_class = Arc::new(RuntimeClass::new(Arc::new(view), loader, parent, interfaces));
    match jvm.classes.write().entry(name) {
        Entry::Occupied(_) => {
            return Err(InvokeError::Linkage(format!("LinkageError: duplicate class definition for {}", name)));
        }
        Entry::Vacant(vacant) => {
            vacant.insert(runtime_class.clone());
        }
    }
    Ok(runtime_class)
}

pub fn check_loaded_class(jvm: &JVMState, name: CClassName) -> InvokeResult<Arc<RuntimeClass>> {
    jvm.lookup_class(name).ok_or_else(|| InvokeError::Linkage(format!("NoClassDefFoundError: {}", name)))
}

/// Runtime class of the innermost element type, for arrays. `None` for primitive types.
pub fn check_loaded_type(jvm: &JVMState, cpdtype: &CPDType) -> InvokeResult<Option<Arc<RuntimeClass>>> {
    match cpdtype {
        CPDType::Class(class_name) => Ok(Some(check_loaded_class(jvm, *class_name)?)),
        CPDType::Array { base_type, .. } => check_loaded_type(jvm, &base_type.to_cpdtype()),
        _ => Ok(None),
    }
}

pub fn check_initing_or_inited_class(jvm: &JVMState, name: CClassName) -> InvokeResult<Arc<RuntimeClass>> {
    let class = check_loaded_class(jvm, name)?;
    initialize_class(jvm, &class)?;
    Ok(class)
}

/// True unless `class` has completed initialization. A class being initialized by the current thread still counts.
pub fn should_be_initialized(class: &RuntimeClass) -> bool {
    class.status() != ClassStatus::INITIALIZED
}

/// Initializes `class` if needed. Blocks while another thread is initializing it; the initializing thread itself passes through.
pub fn initialize_class(jvm: &JVMState, class: &Arc<RuntimeClass>) -> InvokeResult<()> {
    let current_thread = thread::current().id();
    let name = class.view.name();
    {
        let mut init_state = class.init_state.lock();
        loop {
            match init_state.status {
                ClassStatus::INITIALIZED => return Ok(()),
                ClassStatus::ERRONEOUS => {
                    return Err(InvokeError::Linkage(format!("NoClassDefFoundError: Could not initialize class {}", name)));
                }
                ClassStatus::INITIALIZING => {
                    if init_state.initializing_thread == Some(current_thread) {
                        return Ok(());
                    }
                    class.init_cond.wait(&mut init_state);
                }
                ClassStatus::PREPARED => {
                    init_state.status = ClassStatus::INITIALIZING;
                    init_state.initializing_thread = Some(current_thread);
                    break;
                }
            }
        }
    }
    jvm.tracing().trace_class_init_start(&name);
    let res = run_initializers(jvm, class);
    {
        let mut init_state = class.init_state.lock();
        init_state.initializing_thread = None;
        init_state.status = if res.is_ok() { ClassStatus::INITIALIZED } else { ClassStatus::ERRONEOUS };
        class.init_cond.notify_all();
    }
    match &res {
        Ok(()) => jvm.tracing().trace_class_init_end(&name),
        Err(err) => jvm.tracing().trace_class_init_failed(&name, err),
    }
    res
}

fn run_initializers(jvm: &JVMState, class: &Arc<RuntimeClass>) -> InvokeResult<()> {
    if let Some(parent) = class.parent.as_ref() {
        initialize_class(jvm, parent)?;
    }
    let clinit = MethodShape::new(MethodName::constructor_clinit(), CMethodDescriptor::void_return(vec![]));
    if let Some(clinit_i) = class.view.lookup_method(&clinit) {
        if let Some(body) = class.view.method_view_i(clinit_i).body.as_ref() {
            body(jvm, vec![])?;
        }
    }
    Ok(())
}

/// Names of every class and interface `class` is assignable to, itself included.
pub fn all_supertypes(class: &Arc<RuntimeClass>) -> Vec<CClassName> {
    let mut res = vec![];
    let mut to_visit = vec![class.clone()];
    while let Some(current) = to_visit.pop() {
        res.push(current.view.name());
        to_visit.extend(current.parent.iter().cloned());
        to_visit.extend(current.interfaces.iter().cloned());
    }
    res.into_iter().unique().collect()
}
