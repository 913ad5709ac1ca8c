use std::sync::Arc;

use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::compressed_classfile::names::FieldName;

use crate::resolvers::ResolutionFailure;
use crate::runtime_class::RuntimeClass;
use crate::view::FieldView;

#[derive(Clone, Debug)]
pub struct FieldLocation {
    pub class: Arc<RuntimeClass>,
    pub field_i: usize,
}

impl FieldLocation {
    pub fn view(&self) -> &FieldView {
        self.class.view.field_view_i(self.field_i)
    }
}

fn lookup_field(class: &Arc<RuntimeClass>, name: FieldName, field_type: &CPDType) -> Option<FieldLocation> {
    //If C declares a field with the name and descriptor specified by the field reference,
    // field lookup succeeds.
    if let Some(field_i) = class.view.lookup_field(name, field_type) {
        return Some(FieldLocation { class: class.clone(), field_i });
    }
    //Otherwise, field lookup is applied recursively to the direct superinterfaces of the
    // specified class or interface C.
    for interface in class.interfaces.iter() {
        if let Some(res) = lookup_field(interface, name, field_type) {
            return Some(res);
        }
    }
    //Otherwise, if C has a superclass S, field lookup is applied recursively to S.
    lookup_field(class.parent.as_ref()?, name, field_type)
}

pub fn resolve_field(class: &Arc<RuntimeClass>, name: FieldName, field_type: &CPDType) -> Result<FieldLocation, ResolutionFailure> {
    lookup_field(class, name, field_type)
        .ok_or_else(|| ResolutionFailure::NoSuchField(format!("{}.{}/{}", class.view.name(), name, field_type.java_source_representation())))
}
