use std::sync::Arc;

use itertools::{Either, Itertools};
use log::trace;

use rust_jvm_common::compressed_classfile::{CMethodDescriptor, CPDType};
use rust_jvm_common::descriptor_parser::{parse_field_descriptor, parse_method_descriptor};
use rust_jvm_common::mhn_consts::{IS_CONSTRUCTOR, IS_FIELD, IS_METHOD, SEARCH_INTERFACES, SEARCH_SUPERCLASSES};
use slow_interpreter::exceptions::{InvokeError, InvokeResult};
use slow_interpreter::jvm_state::JVMState;
use slow_interpreter::resolvers::fields::FieldLocation;
use slow_interpreter::resolvers::methods::MethodLocation;
use slow_interpreter::runtime_class::RuntimeClass;
use slow_interpreter::stdlib::java::lang::member_name::MemberName;

enum MatchSignature {
    Method(CMethodDescriptor),
    Field(CPDType),
}

fn parse_match_sig(match_sig: &str) -> InvokeResult<MatchSignature> {
    let parsed = if match_sig.starts_with('(') {
        parse_method_descriptor(match_sig).map(MatchSignature::Method)
    } else {
        parse_field_descriptor(match_sig).map(|field_descriptor| MatchSignature::Field(field_descriptor.0))
    };
    parsed.ok_or_else(|| InvokeError::IllegalArgument(format!("bad member signature: {}", match_sig)))
}

/// `defc`, then its superclasses and superinterfaces as requested, each listed once.
fn searched_classes(defc: &Arc<RuntimeClass>, search_super: bool, search_interfaces: bool) -> Vec<Arc<RuntimeClass>> {
    let mut res = vec![defc.clone()];
    if search_super {
        res.extend(defc.class_hierarchy().skip(1));
    }
    if search_interfaces {
        let mut i = 0;
        let mut interfaces: Vec<Arc<RuntimeClass>> = res.iter().flat_map(|class| class.interfaces.iter().cloned()).collect();
        while let Some(interface) = interfaces.get(i).cloned() {
            i += 1;
            if res.iter().any(|seen| Arc::ptr_eq(seen, &interface)) {
                continue;
            }
            interfaces.extend(interface.interfaces.iter().cloned());
            res.push(interface);
        }
    }
    res
}

fn matching_methods(defc: &Arc<RuntimeClass>, classes: &[Arc<RuntimeClass>], match_name: Option<&str>, desc: Option<&CMethodDescriptor>, is_method: bool, is_constructor: bool) -> InvokeResult<Vec<MemberName>> {
    let mut res = vec![];
    for class in classes {
        for (method_i, method) in class.view.methods() {
            if method.is_clinit() {
                continue;
            }
            let wanted = if method.is_constructor() { is_constructor && Arc::ptr_eq(class, defc) } else { is_method };
            let name_matches = match_name.map(|name| method.name.to_str() == name).unwrap_or(true);
            let desc_matches = desc.map(|desc| desc == &method.desc).unwrap_or(true);
            if wanted && name_matches && desc_matches {
                res.push(MemberName::from_method(&MethodLocation { class: class.clone(), method_i })?);
            }
        }
    }
    Ok(res)
}

fn matching_fields(classes: &[Arc<RuntimeClass>], match_name: Option<&str>, field_type: Option<&CPDType>) -> InvokeResult<Vec<MemberName>> {
    let mut res = vec![];
    for class in classes {
        for (field_i, field) in class.view.fields() {
            let name_matches = match_name.map(|name| field.name.to_str() == name).unwrap_or(true);
            let type_matches = field_type.map(|field_type| field_type == &field.field_type).unwrap_or(true);
            if name_matches && type_matches {
                res.push(MemberName::from_field(&FieldLocation { class: class.clone(), field_i }, false)?);
            }
        }
    }
    Ok(res)
}

/// Every member of `defc` selected by `match_flags`, a combination of `IS_METHOD`, `IS_CONSTRUCTOR`,
/// `IS_FIELD`, `SEARCH_SUPERCLASSES` and `SEARCH_INTERFACES`, optionally narrowed by name and descriptor.
/// With a `caller`, members it cannot access are left out.
pub fn get_members(jvm: &JVMState, defc: &Arc<RuntimeClass>, match_name: Option<&str>, match_sig: Option<&str>, match_flags: u32, caller: Option<&Arc<RuntimeClass>>) -> InvokeResult<Vec<MemberName>> {
    let search_super = match_flags & SEARCH_SUPERCLASSES != 0;
    let search_interfaces = match_flags & SEARCH_INTERFACES != 0;
    let is_method = match_flags & IS_METHOD != 0;
    let is_constructor = match_flags & IS_CONSTRUCTOR != 0;
    let is_field = match_flags & IS_FIELD != 0;
    let match_sig = match_sig.map(parse_match_sig).transpose()?;
    let (method_desc, field_type) = match &match_sig {
        None => (None, None),
        Some(MatchSignature::Method(desc)) => {
            if !is_method && !is_constructor {
                return Err(InvokeError::IllegalArgument(format!("method signature {} for a field search", desc)));
            }
            (Some(desc), None)
        }
        Some(MatchSignature::Field(field_type)) => {
            if !is_field {
                return Err(InvokeError::IllegalArgument(format!("field signature {} for a method search", field_type.jvm_representation())));
            }
            (None, Some(field_type))
        }
    };
    let classes = searched_classes(defc, search_super, search_interfaces);
    let methods = if (is_method || is_constructor) && field_type.is_none() {
        Either::Left(matching_methods(defc, &classes, match_name, method_desc, is_method, is_constructor)?.into_iter())
    } else {
        Either::Right(std::iter::empty())
    };
    let fields = if is_field && method_desc.is_none() {
        Either::Left(matching_fields(&classes, match_name, field_type)?.into_iter())
    } else {
        Either::Right(std::iter::empty())
    };
    let mut res = vec![];
    for member in methods.chain(fields) {
        if let Some(caller) = caller {
            let declaring = member.declaring_runtime_class()?;
            if !jvm.access_control().is_member_accessible(defc, declaring, member.get_modifiers(), caller) {
                continue;
            }
        }
        res.push(member);
    }
    trace!("[getMembers {} matched {}]", defc.view.name(), res.iter().map(|member| member.to_string()).join(", "));
    Ok(res)
}

/// Fills `results` with the matches after the first `skip`. Returns how many matches there were after
/// `skip`, which exceeds `results.len()` when the buffer was too small.
pub fn mhn_get_members(jvm: &JVMState, defc: &Arc<RuntimeClass>, match_name: Option<&str>, match_sig: Option<&str>, match_flags: u32, caller: Option<&Arc<RuntimeClass>>, skip: usize, results: &mut [Option<MemberName>]) -> InvokeResult<usize> {
    let matches = get_members(jvm, defc, match_name, match_sig, match_flags, caller)?;
    let found = matches.len().saturating_sub(skip);
    for (slot, member) in results.iter_mut().zip(matches.into_iter().skip(skip)) {
        *slot = Some(member);
    }
    Ok(found)
}

#[cfg(test)]
pub mod test {
    use rust_jvm_common::compressed_classfile::names::CClassName;
    use rust_jvm_common::mhn_consts::{IS_CONSTRUCTOR, IS_FIELD, IS_METHOD, SEARCH_INTERFACES, SEARCH_SUPERCLASSES};
    use slow_interpreter::exceptions::InvokeError;
    use slow_interpreter::jvm_state::JVMState;
    use slow_interpreter::options::JVMOptions;
    use slow_interpreter::stdlib::java::lang::member_name::MemberName;

    use crate::get_members::{get_members, mhn_get_members};
    use crate::lookup::test::{define_outsider, define_point, define_point3, shape};

    fn names(members: &[MemberName]) -> Vec<&'static str> {
        members.iter().map(|member| member.name_str()).collect()
    }

    #[test]
    pub fn match_flags_select_member_kinds() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        let point_class = define_point(&jvm);
        let constructors = get_members(&jvm, &point_class, None, None, IS_CONSTRUCTOR, None).unwrap();
        assert_eq!(names(&constructors), vec!["<init>"]);
        assert!(constructors[0].is_constructor());
        let fields = get_members(&jvm, &point_class, None, None, IS_FIELD, None).unwrap();
        assert_eq!(names(&fields), vec!["x", "y", "label", "count", "NAME"]);
        let sums = get_members(&jvm, &point_class, Some("sum"), Some("(II)I"), IS_METHOD, None).unwrap();
        assert_eq!(names(&sums), vec!["sum"]);
        assert!(get_members(&jvm, &point_class, Some("sum"), Some("(J)I"), IS_METHOD, None).unwrap().is_empty());
        assert!(get_members(&jvm, &point_class, Some("x"), Some("I"), IS_FIELD, None).unwrap()[0].is_field());
        assert!(matches!(get_members(&jvm, &point_class, None, Some("(II"), IS_METHOD, None), Err(InvokeError::IllegalArgument(_))));
        assert!(matches!(get_members(&jvm, &point_class, None, Some("I"), IS_METHOD, None), Err(InvokeError::IllegalArgument(_))));
    }

    #[test]
    pub fn searches_supertypes_on_request() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        define_point(&jvm);
        let point3_class = define_point3(&jvm);
        let declared = get_members(&jvm, &point3_class, Some("getX"), None, IS_METHOD, None).unwrap();
        assert!(declared.is_empty());
        let inherited = get_members(&jvm, &point3_class, Some("getX"), None, IS_METHOD | SEARCH_SUPERCLASSES, None).unwrap();
        assert_eq!(inherited.len(), 1);
        assert_eq!(inherited[0].get_declaring_class(), CClassName::new("test/Point"));
        let describes = get_members(&jvm, &point3_class, Some("describe"), None, IS_METHOD | SEARCH_SUPERCLASSES, None).unwrap();
        assert_eq!(describes.len(), 2);
        let area = get_members(&jvm, &point3_class, Some("area"), None, IS_METHOD | SEARCH_SUPERCLASSES, None).unwrap();
        assert_eq!(area.len(), 1);
        let with_interfaces = get_members(&jvm, &point3_class, Some("area"), None, IS_METHOD | SEARCH_SUPERCLASSES | SEARCH_INTERFACES, None).unwrap();
        assert_eq!(with_interfaces.len(), 2);
        assert!(with_interfaces[1].is_abstract());
        //constructors are never inherited
        assert_eq!(get_members(&jvm, &point3_class, None, None, IS_CONSTRUCTOR | SEARCH_SUPERCLASSES, None).unwrap().len(), 1);
    }

    #[test]
    pub fn caller_access_filters_and_skip_pages() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        let point_class = define_point(&jvm);
        let outsider = define_outsider(&jvm);
        let all = get_members(&jvm, &point_class, None, None, IS_METHOD, None).unwrap();
        assert!(names(&all).contains(&"secret"));
        let visible = get_members(&jvm, &point_class, None, None, IS_METHOD, Some(&outsider)).unwrap();
        assert!(!names(&visible).contains(&"secret"));
        assert_eq!(visible.len() + 1, all.len());

        let mut results = vec![None, None];
        let found = mhn_get_members(&jvm, &point_class, None, None, IS_METHOD, None, 1, &mut results).unwrap();
        assert_eq!(found, all.len() - 1);
        assert_eq!(results[0].as_ref(), Some(&all[1]));
        assert_eq!(results[1].as_ref(), Some(&all[2]));
        assert!(point_class.view.lookup_method(&shape("getX", "()I")).is_some());
    }
}
