use std::sync::Arc;

use slow_interpreter::exceptions::{InvokeError, InvokeResult};
use slow_interpreter::java_values::Object;
use slow_interpreter::stdlib::java::lang::member_name::{FieldBinding, MemberName};

fn field_binding(member: &MemberName, expect_static: bool) -> InvokeResult<&FieldBinding> {
    if !member.is_field() {
        return Err(InvokeError::IllegalArgument(format!("not a field: {}", member)));
    }
    let binding = member.field_binding()?;
    if binding.is_static != expect_static {
        return Err(InvokeError::IllegalArgument(format!("{} field expected: {}", if expect_static { "static" } else { "instance" }, member)));
    }
    Ok(binding)
}

/// Index of a resolved instance field within the instance field array of its declaring class's instances.
pub fn mhn_object_field_offset(member: &MemberName) -> InvokeResult<usize> {
    Ok(field_binding(member, false)?.offset)
}

pub fn mhn_static_field_offset(member: &MemberName) -> InvokeResult<usize> {
    Ok(field_binding(member, true)?.offset)
}

/// The object static field offsets are relative to: the declaring class's mirror.
pub fn mhn_static_field_base(member: &MemberName) -> InvokeResult<Arc<Object>> {
    Ok(field_binding(member, true)?.location.class.mirror())
}

#[cfg(test)]
pub mod test {
    use rust_jvm_common::compressed_classfile::CPDType;
    use rust_jvm_common::compressed_classfile::names::FieldName;
    use rust_jvm_common::mhn_consts::ReferenceKind;
    use slow_interpreter::exceptions::InvokeError;
    use slow_interpreter::java_values::Object;
    use slow_interpreter::jvm_state::JVMState;
    use slow_interpreter::options::JVMOptions;
    use slow_interpreter::stdlib::java::lang::member_name::{MemberName, MemberNameFactory};

    use crate::lookup::test::{define_point, define_point3, point, point3};
    use crate::offsets::{mhn_object_field_offset, mhn_static_field_base, mhn_static_field_offset};

    #[test]
    pub fn offsets_follow_field_layout() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        let point_class = define_point(&jvm);
        define_point3(&jvm);
        let resolve = |class, name: &str, type_, ref_kind| {
            let member = MemberName::new_field(class, FieldName::new(name), type_, ref_kind).unwrap();
            MemberNameFactory::resolve_or_fail(&jvm, ref_kind, &member, None).unwrap()
        };
        let x = resolve(point(), "x", CPDType::IntType, ReferenceKind::GetField);
        let y = resolve(point(), "y", CPDType::IntType, ReferenceKind::GetField);
        let z = resolve(point3(), "z", CPDType::IntType, ReferenceKind::GetField);
        let x_offset = mhn_object_field_offset(&x).unwrap();
        let y_offset = mhn_object_field_offset(&y).unwrap();
        assert_ne!(x_offset, y_offset);
        //subclass fields come after the inherited ones
        assert!(mhn_object_field_offset(&z).unwrap() > x_offset.max(y_offset));
        assert!(matches!(mhn_static_field_offset(&x), Err(InvokeError::IllegalArgument(_))));

        let count = resolve(point(), "count", CPDType::IntType, ReferenceKind::GetStatic);
        assert_eq!(mhn_static_field_offset(&count).unwrap(), point_class.lookup_static_field(FieldName::new("count")).unwrap().number);
        assert!(matches!(mhn_static_field_base(&count).unwrap().as_ref(), Object::Class(mirror) if mirror.cpdtype == CPDType::Class(point())));
        assert!(mhn_object_field_offset(&count).is_err());
    }
}
