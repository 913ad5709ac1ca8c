use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use rust_jvm_common::classfile::{ACC_ABSTRACT, ACC_FINAL, ACC_INTERFACE, ACC_NATIVE, ACC_PRIVATE, ACC_PROTECTED, ACC_PUBLIC, ACC_STATIC, ACC_SYNTHETIC, ACC_VARARGS, ACC_VOLATILE};
use rust_jvm_common::compressed_classfile::{CMethodDescriptor, CPDType};
use rust_jvm_common::compressed_classfile::names::{CClassName, FieldName, MethodName};
use rust_jvm_common::descriptor_parser::{parse_field_descriptor, parse_method_descriptor};
use rust_jvm_common::method_shape::MethodShape;

use crate::exceptions::{InvokeError, InvokeResult};
use crate::java_values::JavaValue;
use crate::jvm_state::JVMState;

/// Native body of a method. Instance methods receive the receiver as the first argument.
pub type MethodBody = Arc<dyn Fn(&JVMState, Vec<JavaValue>) -> InvokeResult<JavaValue> + Send + Sync>;

pub trait HasAccessFlags {
    fn access_flags(&self) -> u16;
    fn is_static(&self) -> bool {
        self.access_flags() & ACC_STATIC > 0
    }
    fn is_final(&self) -> bool {
        self.access_flags() & ACC_FINAL > 0
    }
    fn is_native(&self) -> bool {
        self.access_flags() & ACC_NATIVE > 0
    }
    fn is_varargs(&self) -> bool {
        self.access_flags() & ACC_VARARGS > 0
    }
    fn is_public(&self) -> bool {
        self.access_flags() & ACC_PUBLIC > 0
    }
    fn is_private(&self) -> bool {
        self.access_flags() & ACC_PRIVATE > 0
    }
    fn is_protected(&self) -> bool {
        self.access_flags() & ACC_PROTECTED > 0
    }
    fn is_abstract(&self) -> bool {
        self.access_flags() & ACC_ABSTRACT > 0
    }
    fn is_interface(&self) -> bool {
        self.access_flags() & ACC_INTERFACE > 0
    }
    fn is_synthetic(&self) -> bool {
        self.access_flags() & ACC_SYNTHETIC > 0
    }
}

pub struct ClassView {
    name: CClassName,
    super_name: Option<CClassName>,
    interfaces: Vec<CClassName>,
    access_flags: u16,
    methods: Vec<MethodView>,
    fields: Vec<FieldView>,
    method_index: HashMap<MethodShape, usize>,
}

impl ClassView {
    pub fn builder(name: CClassName) -> ClassViewBuilder {
        ClassViewBuilder {
            name,
            super_name: Some(CClassName::object()),
            interfaces: vec![],
            access_flags: ACC_PUBLIC,
            methods: vec![],
            fields: vec![],
        }
    }

    pub fn name(&self) -> CClassName {
        self.name
    }

    pub fn type_(&self) -> CPDType {
        CPDType::Class(self.name)
    }

    pub fn super_name(&self) -> Option<CClassName> {
        self.super_name
    }

    pub fn interfaces(&self) -> &[CClassName] {
        &self.interfaces
    }

    pub fn methods(&self) -> impl Iterator<Item=(usize, &MethodView)> {
        self.methods.iter().enumerate()
    }

    pub fn method_view_i(&self, method_i: usize) -> &MethodView {
        &self.methods[method_i]
    }

    pub fn num_methods(&self) -> usize {
        self.methods.len()
    }

    pub fn lookup_method(&self, shape: &MethodShape) -> Option<usize> {
        self.method_index.get(shape).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item=(usize, &FieldView)> {
        self.fields.iter().enumerate()
    }

    pub fn field_view_i(&self, field_i: usize) -> &FieldView {
        &self.fields[field_i]
    }

    pub fn lookup_field(&self, name: FieldName, field_type: &CPDType) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name && &field.field_type == field_type)
    }
}

impl HasAccessFlags for ClassView {
    fn access_flags(&self) -> u16 {
        self.access_flags
    }
}

impl Debug for ClassView {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ClassView({})", self.name)
    }
}

pub struct MethodView {
    pub name: MethodName,
    pub desc: CMethodDescriptor,
    pub access_flags: u16,
    pub body: Option<MethodBody>,
}

impl MethodView {
    pub fn shape(&self) -> MethodShape {
        MethodShape::new(self.name, self.desc.clone())
    }

    pub fn is_constructor(&self) -> bool {
        self.name.is_constructor()
    }

    pub fn is_clinit(&self) -> bool {
        self.name == MethodName::constructor_clinit()
    }
}

impl HasAccessFlags for MethodView {
    fn access_flags(&self) -> u16 {
        self.access_flags
    }
}

pub struct FieldView {
    pub name: FieldName,
    pub field_type: CPDType,
    pub access_flags: u16,
}

impl FieldView {
    pub fn is_volatile(&self) -> bool {
        self.access_flags & ACC_VOLATILE > 0
    }
}

impl HasAccessFlags for FieldView {
    fn access_flags(&self) -> u16 {
        self.access_flags
    }
}

struct PendingMethod {
    name: MethodName,
    desc: String,
    access_flags: u16,
    body: Option<MethodBody>,
}

struct PendingField {
    name: FieldName,
    desc: String,
    access_flags: u16,
}

/// Assembles a [`ClassView`] from descriptor strings. Descriptors are checked in [`ClassViewBuilder::build`].
pub struct ClassViewBuilder {
    name: CClassName,
    super_name: Option<CClassName>,
    interfaces: Vec<CClassName>,
    access_flags: u16,
    methods: Vec<PendingMethod>,
    fields: Vec<PendingField>,
}

impl ClassViewBuilder {
    pub fn super_class(mut self, super_name: Option<CClassName>) -> Self {
        self.super_name = super_name;
        self
    }

    pub fn interface(mut self, interface: CClassName) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn access_flags(mut self, access_flags: u16) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn abstract_method(mut self, name: &str, desc: &str, access_flags: u16) -> Self {
        self.methods.push(PendingMethod { name: MethodName::new(name), desc: desc.to_string(), access_flags: access_flags | ACC_ABSTRACT, body: None });
        self
    }

    pub fn method(mut self, name: &str, desc: &str, access_flags: u16, body: impl Fn(&JVMState, Vec<JavaValue>) -> InvokeResult<JavaValue> + Send + Sync + 'static) -> Self {
        self.methods.push(PendingMethod { name: MethodName::new(name), desc: desc.to_string(), access_flags, body: Some(Arc::new(body)) });
        self
    }

    pub fn field(mut self, name: &str, desc: &str, access_flags: u16) -> Self {
        self.fields.push(PendingField { name: FieldName::new(name), desc: desc.to_string(), access_flags });
        self
    }

    pub fn build(self) -> InvokeResult<ClassView> {
        let ClassViewBuilder { name, super_name, interfaces, access_flags, methods, fields } = self;
        let methods = methods.into_iter().map(|PendingMethod { name, desc, access_flags, body }| {
            let desc = parse_method_descriptor(desc.as_str()).ok_or_else(|| InvokeError::InvalidSignature(desc.clone()))?;
            Ok(MethodView { name, desc, access_flags, body })
        }).collect::<InvokeResult<Vec<_>>>()?;
        let fields = fields.into_iter().map(|PendingField { name, desc, access_flags }| {
            let field_type = parse_field_descriptor(desc.as_str()).ok_or_else(|| InvokeError::InvalidSignature(desc.clone()))?.0;
            Ok(FieldView { name, field_type, access_flags })
        }).collect::<InvokeResult<Vec<_>>>()?;
        let mut method_index = HashMap::new();
        for (i, method) in methods.iter().enumerate() {
            if method_index.insert(method.shape(), i).is_some() {
                return Err(InvokeError::Linkage(format!("ClassFormatError: duplicate method {}.{}{}", name, method.name, method.desc)));
            }
        }
        Ok(ClassView { name, super_name, interfaces, access_flags, methods, fields, method_index })
    }
}
