use slow_interpreter::exceptions::{InvokeError, InvokeResult};
use slow_interpreter::resolvers::fields::FieldLocation;
use slow_interpreter::resolvers::methods::MethodLocation;
use slow_interpreter::stdlib::java::lang::member_name::MemberName;

/// A member as handed out by reflection: already located in a loaded class.
#[derive(Clone, Debug)]
pub enum ReflectedMember {
    Method(MethodLocation),
    Constructor(MethodLocation),
    Field(FieldLocation),
}

impl ReflectedMember {
    /// Classifies a method slot as a method or a constructor by its name.
    pub fn from_method(location: MethodLocation) -> Self {
        if location.view().is_constructor() {
            ReflectedMember::Constructor(location)
        } else {
            ReflectedMember::Method(location)
        }
    }
}

/// A resolved member name for a reflected member. Name, type and flags are captured eagerly.
pub fn mhn_init(reflected: &ReflectedMember) -> InvokeResult<MemberName> {
    match reflected {
        ReflectedMember::Method(location) => {
            let view = location.view();
            if view.is_constructor() || view.is_clinit() {
                return Err(InvokeError::IllegalArgument(format!("{}.{} is not a method", location.class.view.name(), view.shape())));
            }
            MemberName::from_method(location)
        }
        ReflectedMember::Constructor(location) => {
            if !location.view().is_constructor() {
                return Err(InvokeError::IllegalArgument(format!("{}.{} is not a constructor", location.class.view.name(), location.view().shape())));
            }
            MemberName::from_method(location)
        }
        ReflectedMember::Field(location) => MemberName::from_field(location, false),
    }
}

#[cfg(test)]
pub mod test {
    use rust_jvm_common::compressed_classfile::names::{CClassName, FieldName, MethodName};
    use rust_jvm_common::mhn_consts::ReferenceKind;
    use slow_interpreter::jvm_state::JVMState;
    use slow_interpreter::options::JVMOptions;
    use slow_interpreter::resolvers::fields::FieldLocation;
    use slow_interpreter::resolvers::methods::MethodLocation;

    use crate::init::{mhn_init, ReflectedMember};
    use crate::lookup::test::{define_point, point};

    #[test]
    pub fn init_captures_kind_and_flags() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        let point_class = define_point(&jvm);
        let (sum_i, sum) = point_class.view.methods().find(|(_, method)| method.name == MethodName::new("sum")).unwrap();
        let sum = mhn_init(&ReflectedMember::from_method(MethodLocation { class: point_class.clone(), method_i: sum_i })).unwrap();
        assert!(sum.is_resolved());
        assert!(sum.is_static());
        assert_eq!(sum.get_reference_kind(), Some(ReferenceKind::InvokeStatic));
        assert_eq!(sum.get_declaring_class(), point());

        let (init_i, _) = point_class.view.methods().find(|(_, method)| method.is_constructor()).unwrap();
        let constructor = ReflectedMember::from_method(MethodLocation { class: point_class.clone(), method_i: init_i });
        assert!(matches!(constructor, ReflectedMember::Constructor(_)));
        assert_eq!(mhn_init(&constructor).unwrap().get_reference_kind(), Some(ReferenceKind::NewInvokeSpecial));
        assert!(mhn_init(&ReflectedMember::Method(MethodLocation { class: point_class.clone(), method_i: init_i })).is_err());

        let field_i = point_class.view.fields().position(|(_, field)| field.name == FieldName::new("x")).unwrap();
        let x = mhn_init(&ReflectedMember::Field(FieldLocation { class: point_class.clone(), field_i })).unwrap();
        assert_eq!(x.get_reference_kind(), Some(ReferenceKind::GetField));
        assert!(x.is_field());
        assert_ne!(x.get_declaring_class(), CClassName::object());
    }
}
