use std::sync::Arc;

use rust_jvm_common::compressed_classfile::names::CClassName;
use rust_jvm_common::method_shape::MethodShape;

use crate::class_loading::check_loaded_class;
use crate::jvm_state::JVMState;
use crate::resolvers::ResolutionFailure;
use crate::runtime_class::RuntimeClass;
use crate::view::{HasAccessFlags, MethodView};

#[derive(Clone, Debug)]
pub struct MethodLocation {
    pub class: Arc<RuntimeClass>,
    pub method_i: usize,
}

impl MethodLocation {
    pub fn view(&self) -> &MethodView {
        self.class.view.method_view_i(self.method_i)
    }
}

fn declared_method(class: &Arc<RuntimeClass>, shape: &MethodShape) -> Option<MethodLocation> {
    class.view.lookup_method(shape).map(|method_i| MethodLocation { class: class.clone(), method_i })
}

pub fn lookup_method_in_class_hierarchy(class: &Arc<RuntimeClass>, shape: &MethodShape) -> Option<MethodLocation> {
    class.class_hierarchy().find_map(|current| declared_method(&current, shape))
}

fn all_superinterfaces(class: &Arc<RuntimeClass>) -> Vec<Arc<RuntimeClass>> {
    let mut res: Vec<Arc<RuntimeClass>> = vec![];
    let mut to_visit = class.class_hierarchy().flat_map(|current| current.interfaces.clone()).collect::<Vec<_>>();
    while let Some(interface) = to_visit.pop() {
        if res.iter().any(|existing| Arc::ptr_eq(existing, &interface)) {
            continue;
        }
        to_visit.extend(interface.interfaces.iter().cloned());
        res.push(interface);
    }
    res
}

/// The maximally-specific superinterface method for `shape`, preferring a single non-abstract candidate.
pub fn lookup_method_in_superinterfaces(class: &Arc<RuntimeClass>, shape: &MethodShape) -> Option<MethodLocation> {
    let candidates = all_superinterfaces(class).iter()
        .filter_map(|interface| declared_method(interface, shape))
        .filter(|location| !location.view().is_private() && !location.view().is_static())
        .collect::<Vec<_>>();
    let maximally_specific = candidates.iter()
        .filter(|candidate| !candidates.iter().any(|other| !Arc::ptr_eq(&other.class, &candidate.class) && other.class.implements(candidate.class.view.name())))
        .cloned()
        .collect::<Vec<_>>();
    let non_abstract = maximally_specific.iter().filter(|location| !location.view().is_abstract()).collect::<Vec<_>>();
    if non_abstract.len() == 1 {
        return non_abstract.first().map(|location| (*location).clone());
    }
    maximally_specific.into_iter().next()
}

fn describe(class: &Arc<RuntimeClass>, shape: &MethodShape) -> String {
    format!("{}.{}{}", class.view.name(), shape.name, shape.desc)
}

/// Method resolution against a class.
pub fn resolve_method(class: &Arc<RuntimeClass>, shape: &MethodShape) -> Result<MethodLocation, ResolutionFailure> {
    //If C is an interface, method resolution throws an IncompatibleClassChangeError.
    if class.view.is_interface() {
        return Err(ResolutionFailure::Linkage(format!("IncompatibleClassChangeError: Found interface {}, but class was expected", class.view.name())));
    }
    //Otherwise, method resolution attempts to locate the referenced method in C and its superclasses
    if let Some(res) = lookup_method_in_class_hierarchy(class, shape) {
        return Ok(res);
    }
    //Otherwise, method resolution attempts to locate the referenced method in the superinterfaces
    // of the specified class C
    lookup_method_in_superinterfaces(class, shape).ok_or_else(|| ResolutionFailure::NoSuchMethod(describe(class, shape)))
}

/// Interface method resolution.
pub fn resolve_interface_method(jvm: &JVMState, class: &Arc<RuntimeClass>, shape: &MethodShape) -> Result<MethodLocation, ResolutionFailure> {
    //If C is not an interface, interface method resolution throws an IncompatibleClassChangeError.
    if !class.view.is_interface() {
        return Err(ResolutionFailure::Linkage(format!("IncompatibleClassChangeError: Found class {}, but interface was expected", class.view.name())));
    }
    //Otherwise, if C declares a method with the name and descriptor specified by the interface
    // method reference, method lookup succeeds.
    if let Some(res) = declared_method(class, shape) {
        return Ok(res);
    }
    //Otherwise, if the class Object declares a method with the name and descriptor specified by
    // the interface method reference, which has its ACC_PUBLIC flag set and does not have its
    // ACC_STATIC flag set, method lookup succeeds.
    let object = check_loaded_class(jvm, CClassName::object()).map_err(|err| ResolutionFailure::Linkage(err.to_string()))?;
    if let Some(res) = declared_method(&object, shape) {
        if res.view().is_public() && !res.view().is_static() {
            return Ok(res);
        }
    }
    lookup_method_in_superinterfaces(class, shape).ok_or_else(|| ResolutionFailure::NoSuchMethod(describe(class, shape)))
}

/// Selects the method a virtual or interface call on a receiver of `receiver_class` runs.
pub fn select_method(jvm: &JVMState, receiver_class: &Arc<RuntimeClass>, resolved: &MethodLocation) -> Result<MethodLocation, ResolutionFailure> {
    let resolved_view = resolved.view();
    if resolved_view.is_private() {
        return Ok(resolved.clone());
    }
    let shape = resolved_view.shape();
    if let Some(cached) = receiver_class.cached_dispatch(&shape) {
        return cached.map(|(class, method_i)| MethodLocation { class, method_i })
            .ok_or_else(|| ResolutionFailure::Linkage(format!("AbstractMethodError: {}", describe(receiver_class, &shape))));
    }
    let selected = receiver_class.class_hierarchy()
        .filter_map(|current| declared_method(&current, &shape))
        .find(|location| !location.view().is_static() && !location.view().is_private())
        .or_else(|| lookup_method_in_superinterfaces(receiver_class, &shape))
        .filter(|location| !location.view().is_abstract());
    receiver_class.cache_dispatch(shape.clone(), selected.as_ref().map(|location| (&location.class, location.method_i)));
    match selected {
        None => Err(ResolutionFailure::Linkage(format!("AbstractMethodError: {}", describe(receiver_class, &shape)))),
        Some(selected) => {
            jvm.tracing().trace_virtual_dispatch(&receiver_class.view.name(), &selected.class.view.name(), shape.name.to_str());
            Ok(selected)
        }
    }
}
