use std::fmt::{Display, Formatter};

use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::compressed_classfile::names::CClassName;
use rust_jvm_common::mhn_consts::ReferenceKind;
use slow_interpreter::exceptions::{InvokeError, InvokeResult};
use slow_interpreter::stdlib::java::lang::invoke::method_type::MethodType;
use slow_interpreter::stdlib::java::lang::member_name::{MemberName, MemberType};
use slow_interpreter::view::HasAccessFlags;

/// The symbolic parts of a direct method handle.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MethodHandleInfo {
    reference_kind: ReferenceKind,
    declaring_class: CClassName,
    name: &'static str,
    method_type: MethodType,
    modifiers: u16,
}

impl MethodHandleInfo {
    pub(crate) fn from_member(member: &MemberName) -> InvokeResult<Self> {
        let mut reference_kind = member.get_reference_kind().ok_or_else(|| InvokeError::IllegalArgument(format!("no reference kind: {}", member)))?;
        let declaring = member.declaring_runtime_class()?;
        if reference_kind == ReferenceKind::InvokeVirtual && declaring.view.is_interface() {
            reference_kind = ReferenceKind::InvokeInterface;
        }
        //field accessors are described without their receiver
        let method_type = match member.member_type() {
            MemberType::Method(method_type) => method_type.clone(),
            MemberType::Field(field_type) if reference_kind.is_getter() => MethodType::make(*field_type, vec![])?,
            MemberType::Field(field_type) => MethodType::make(CPDType::VoidType, vec![*field_type])?,
        };
        Ok(Self {
            reference_kind,
            declaring_class: member.get_declaring_class(),
            name: member.name_str(),
            method_type,
            modifiers: member.get_modifiers(),
        })
    }

    pub fn reference_kind(&self) -> ReferenceKind {
        self.reference_kind
    }

    pub fn declaring_class(&self) -> CClassName {
        self.declaring_class
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn method_type(&self) -> &MethodType {
        &self.method_type
    }

    pub fn modifiers(&self) -> u16 {
        self.modifiers
    }
}

impl Display for MethodHandleInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}.{}:{}", self.reference_kind.name(), CPDType::Class(self.declaring_class).java_source_representation(), self.name, self.method_type)
    }
}
