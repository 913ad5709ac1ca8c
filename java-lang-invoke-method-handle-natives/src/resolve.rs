use std::sync::Arc;

use slow_interpreter::exceptions::{InvokeError, InvokeResult};
use slow_interpreter::jvm_state::JVMState;
use slow_interpreter::runtime_class::RuntimeClass;
use slow_interpreter::stdlib::java::lang::member_name::{MemberName, MemberNameFactory};

/// Links `member` using its own reference kind, checking access from `caller` if there is one.
///
/// A speculative resolution reports failure as `None` instead of an error.
pub fn mhn_resolve(jvm: &JVMState, member: &MemberName, caller: Option<&Arc<RuntimeClass>>, speculative_resolve: bool) -> InvokeResult<Option<MemberName>> {
    if member.is_resolved() {
        return Ok(Some(member.clone()));
    }
    let ref_kind = member.get_reference_kind().ok_or_else(|| InvokeError::IllegalArgument(format!("no reference kind: {}", member)))?;
    if speculative_resolve {
        return Ok(MemberNameFactory::resolve_or_null(jvm, ref_kind, member, caller));
    }
    MemberNameFactory::resolve_or_fail(jvm, ref_kind, member, caller).map(Some)
}

#[cfg(test)]
pub mod test {
    use rust_jvm_common::compressed_classfile::CPDType;
    use rust_jvm_common::compressed_classfile::names::{CClassName, MethodName};
    use rust_jvm_common::mhn_consts::ReferenceKind;
    use slow_interpreter::exceptions::InvokeError;
    use slow_interpreter::jvm_state::JVMState;
    use slow_interpreter::options::JVMOptions;
    use slow_interpreter::stdlib::java::lang::invoke::method_type::MethodType;
    use slow_interpreter::stdlib::java::lang::member_name::MemberName;

    use crate::lookup::test::{define_point, point};
    use crate::resolve::mhn_resolve;

    #[test]
    pub fn speculative_resolution_returns_none() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        define_point(&jvm);
        let int_int = MethodType::make(CPDType::IntType, vec![CPDType::IntType, CPDType::IntType]).unwrap();
        let sum = MemberName::new_method(point(), MethodName::new("sum"), int_int.clone(), ReferenceKind::InvokeStatic).unwrap();
        let resolved = mhn_resolve(&jvm, &sum, None, false).unwrap().unwrap();
        assert!(resolved.is_resolved());
        assert!(mhn_resolve(&jvm, &resolved, None, false).unwrap().unwrap().is_resolved());

        let missing = MemberName::new_method(point(), MethodName::new("product"), int_int, ReferenceKind::InvokeStatic).unwrap();
        assert!(mhn_resolve(&jvm, &missing, None, true).unwrap().is_none());
        assert!(matches!(mhn_resolve(&jvm, &missing, None, false), Err(InvokeError::NoSuchMember(_))));

        let not_loaded = MemberName::new_method(CClassName::new("test/Nowhere"), MethodName::new("sum"), MethodType::make(CPDType::VoidType, vec![]).unwrap(), ReferenceKind::InvokeStatic).unwrap();
        assert!(matches!(mhn_resolve(&jvm, &not_loaded, None, false), Err(InvokeError::Linkage(_))));
    }
}
