use crate::compressed_classfile::{CFieldDescriptor, CMethodDescriptor, CompressedFieldDescriptor, CPDType};
use crate::compressed_classfile::names::CClassName;

pub fn eat_one(str_: &str) -> &str {
    &str_[1..]
}

pub fn parse_base_type(str_: &str) -> Option<(&str, CPDType)> {
    let base_type = match str_.chars().next()? {
        'B' => CPDType::ByteType,
        'C' => CPDType::CharType,
        'D' => CPDType::DoubleType,
        'F' => CPDType::FloatType,
        'I' => CPDType::IntType,
        'J' => CPDType::LongType,
        'S' => CPDType::ShortType,
        'Z' => CPDType::BooleanType,
        _ => return None,
    };
    Some((eat_one(str_), base_type))
}

pub fn parse_object_type(str_: &str) -> Option<(&str, CPDType)> {
    match str_.chars().next()? {
        'L' => {
            let str_without_l = eat_one(str_);
            let end_index = str_without_l.find(';')?;
            let class_name = &str_without_l[0..end_index];
            if class_name.is_empty() || class_name.contains('[') || class_name.contains('.') {
                return None;
            }
            let remaining_to_parse = &str_without_l[(end_index + 1)..];
            Some((remaining_to_parse, CPDType::Class(CClassName::new(class_name))))
        }
        _ => None,
    }
}

pub fn parse_array_type(str_: &str) -> Option<(&str, CPDType)> {
    match str_.chars().next()? {
        '[' => {
            let (remaining_to_parse, sub_type) = parse_component_type(eat_one(str_))?;
            if let CPDType::Array { num_nested_arrs, .. } = sub_type {
                if num_nested_arrs.get() == u8::MAX {
                    return None;
                }
            }
            Some((remaining_to_parse, CPDType::array(sub_type)))
        }
        _ => None,
    }
}

pub fn parse_field_type(str_: &str) -> Option<(&str, CPDType)> {
    parse_array_type(str_).or_else(|| parse_base_type(str_)).or_else(|| parse_object_type(str_))
}

pub fn parse_component_type(str_: &str) -> Option<(&str, CPDType)> {
    parse_field_type(str_)
}

fn parse_return_descriptor(str_: &str) -> Option<(&str, CPDType)> {
    if str_.starts_with('V') {
        return Some((eat_one(str_), CPDType::VoidType));
    }
    parse_field_type(str_)
}

pub fn parse_method_descriptor(str_: &str) -> Option<CMethodDescriptor> {
    if !str_.starts_with('(') {
        return None;
    }
    let mut remaining_to_parse = eat_one(str_);
    let mut arg_types = vec![];
    while !remaining_to_parse.starts_with(')') {
        let (rest, arg_type) = parse_field_type(remaining_to_parse)?;
        arg_types.push(arg_type);
        remaining_to_parse = rest;
    }
    let (rest, return_type) = parse_return_descriptor(eat_one(remaining_to_parse))?;
    if !rest.is_empty() {
        return None;
    }
    Some(CMethodDescriptor { arg_types, return_type })
}

pub fn parse_field_descriptor(str_: &str) -> Option<CFieldDescriptor> {
    let (rest, field_type) = parse_field_type(str_)?;
    if !rest.is_empty() {
        return None;
    }
    Some(CompressedFieldDescriptor(field_type))
}

#[cfg(test)]
pub mod test {
    use crate::compressed_classfile::CPDType;
    use crate::compressed_classfile::names::CClassName;
    use crate::descriptor_parser::{parse_field_descriptor, parse_method_descriptor};

    #[test]
    pub fn parse_simple_method() {
        let desc = parse_method_descriptor("(ILjava/lang/Object;[J)V").unwrap();
        assert_eq!(desc.arg_types, vec![CPDType::IntType, CPDType::object(), CPDType::array(CPDType::LongType)]);
        assert_eq!(desc.return_type, CPDType::VoidType);
        assert_eq!(desc.parameter_slot_count(), 3);
        assert_eq!(desc.jvm_representation(), "(ILjava/lang/Object;[J)V");
    }

    #[test]
    pub fn parse_nested_arrays() {
        let field = parse_field_descriptor("[[Ljava/lang/String;").unwrap();
        let expected = CPDType::array(CPDType::array(CPDType::string()));
        assert_eq!(field.0, expected);
        assert_eq!(field.0.unwrap_array_type(), CPDType::array(CPDType::string()));
        assert_eq!(field.0.short_representation(), "String[][]");
    }

    #[test]
    pub fn builtin_names_are_shared() {
        assert_eq!(CClassName::new("java/lang/Integer"), CClassName::int());
        assert_eq!(CClassName::object().to_str(), "java/lang/Object");
        assert_eq!(CClassName::new("foo/bar/Baz").package(), "foo/bar");
    }

    #[test]
    pub fn reject_malformed() {
        assert!(parse_method_descriptor("(V)V").is_none());
        assert!(parse_method_descriptor("(I").is_none());
        assert!(parse_method_descriptor("(I)VV").is_none());
        assert!(parse_field_descriptor("Ljava/lang/Object").is_none());
        assert!(parse_field_descriptor("V").is_none());
    }
}
