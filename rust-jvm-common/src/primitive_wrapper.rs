use strum_macros::EnumIter;

use crate::compressed_classfile::CPDType;
use crate::compressed_classfile::names::CClassName;

/// Type-level facts about the primitive types, their box classes, and `Object`.
///
/// Variants are declared in widening order: a wrapper can only convert from wrappers declared before it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord, EnumIter)]
pub enum Wrapper {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Object,
    Void,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum WrapperKind {
    Signed,
    Unsigned,
    Floating,
    Other,
}

impl Wrapper {
    fn kind(self) -> WrapperKind {
        match self {
            Wrapper::Byte | Wrapper::Short | Wrapper::Int | Wrapper::Long => WrapperKind::Signed,
            Wrapper::Boolean | Wrapper::Char => WrapperKind::Unsigned,
            Wrapper::Float | Wrapper::Double => WrapperKind::Floating,
            Wrapper::Object | Wrapper::Void => WrapperKind::Other,
        }
    }

    pub fn for_primitive_type(cpdtype: &CPDType) -> Option<Wrapper> {
        Some(match cpdtype {
            CPDType::BooleanType => Wrapper::Boolean,
            CPDType::ByteType => Wrapper::Byte,
            CPDType::ShortType => Wrapper::Short,
            CPDType::CharType => Wrapper::Char,
            CPDType::IntType => Wrapper::Int,
            CPDType::LongType => Wrapper::Long,
            CPDType::FloatType => Wrapper::Float,
            CPDType::DoubleType => Wrapper::Double,
            CPDType::VoidType => Wrapper::Void,
            CPDType::Class(_) | CPDType::Array { .. } => return None,
        })
    }

    /// The wrapper whose box class is exactly `cpdtype`. `Object` maps to [`Wrapper::Object`].
    pub fn for_wrapper_type(cpdtype: &CPDType) -> Option<Wrapper> {
        let class_name = cpdtype.try_unwrap_class_type()?;
        Self::for_wrapper_class(class_name)
    }

    pub fn for_wrapper_class(class_name: CClassName) -> Option<Wrapper> {
        Some(if class_name == CClassName::boolean() {
            Wrapper::Boolean
        } else if class_name == CClassName::byte() {
            Wrapper::Byte
        } else if class_name == CClassName::short() {
            Wrapper::Short
        } else if class_name == CClassName::character() {
            Wrapper::Char
        } else if class_name == CClassName::int() {
            Wrapper::Int
        } else if class_name == CClassName::long() {
            Wrapper::Long
        } else if class_name == CClassName::float() {
            Wrapper::Float
        } else if class_name == CClassName::double() {
            Wrapper::Double
        } else if class_name == CClassName::void() {
            Wrapper::Void
        } else if class_name == CClassName::object() {
            Wrapper::Object
        } else {
            return None;
        })
    }

    /// Wrapper for any type: primitives map to themselves, every reference type to [`Wrapper::Object`].
    pub fn for_basic_type(cpdtype: &CPDType) -> Wrapper {
        Self::for_primitive_type(cpdtype).unwrap_or(Wrapper::Object)
    }

    pub fn primitive_type(self) -> CPDType {
        match self {
            Wrapper::Boolean => CPDType::BooleanType,
            Wrapper::Byte => CPDType::ByteType,
            Wrapper::Short => CPDType::ShortType,
            Wrapper::Char => CPDType::CharType,
            Wrapper::Int => CPDType::IntType,
            Wrapper::Long => CPDType::LongType,
            Wrapper::Float => CPDType::FloatType,
            Wrapper::Double => CPDType::DoubleType,
            Wrapper::Void => CPDType::VoidType,
            Wrapper::Object => CPDType::object(),
        }
    }

    pub fn wrapper_class(self) -> CClassName {
        match self {
            Wrapper::Boolean => CClassName::boolean(),
            Wrapper::Byte => CClassName::byte(),
            Wrapper::Short => CClassName::short(),
            Wrapper::Char => CClassName::character(),
            Wrapper::Int => CClassName::int(),
            Wrapper::Long => CClassName::long(),
            Wrapper::Float => CClassName::float(),
            Wrapper::Double => CClassName::double(),
            Wrapper::Void => CClassName::void(),
            Wrapper::Object => CClassName::object(),
        }
    }

    pub fn wrapper_type(self) -> CPDType {
        CPDType::Class(self.wrapper_class())
    }

    pub fn is_subword_type(self) -> bool {
        matches!(self, Wrapper::Boolean | Wrapper::Byte | Wrapper::Short | Wrapper::Char)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self.kind(), WrapperKind::Signed | WrapperKind::Floating) || self == Wrapper::Char
    }

    pub fn is_floating(self) -> bool {
        self.kind() == WrapperKind::Floating
    }

    pub fn is_other(self) -> bool {
        self.kind() == WrapperKind::Other
    }

    pub fn is_double_word(self) -> bool {
        matches!(self, Wrapper::Long | Wrapper::Double)
    }

    /// True if a value of `source` converts to `self` by identity or a primitive widening conversion.
    /// `char` widens to `int` and beyond but nothing narrower; `boolean` widens to nothing;
    /// anything converts to `Object` or `void`.
    pub fn is_convertible_from(self, source: Wrapper) -> bool {
        if self == source {
            return true;
        }
        if self < source {
            return false;
        }
        let signed_or_floating = |wrapper: Wrapper| matches!(wrapper.kind(), WrapperKind::Signed | WrapperKind::Floating);
        if !(signed_or_floating(self) && signed_or_floating(source)) {
            if self.is_other() {
                return true;
            }
            return source == Wrapper::Char;
        }
        true
    }
}

#[cfg(test)]
pub mod test {
    use strum::IntoEnumIterator;

    use crate::compressed_classfile::CPDType;
    use crate::primitive_wrapper::Wrapper;

    #[test]
    pub fn widening_table() {
        assert!(Wrapper::Int.is_convertible_from(Wrapper::Char));
        assert!(Wrapper::Long.is_convertible_from(Wrapper::Int));
        assert!(Wrapper::Float.is_convertible_from(Wrapper::Long));
        assert!(Wrapper::Double.is_convertible_from(Wrapper::Byte));
        assert!(!Wrapper::Char.is_convertible_from(Wrapper::Byte));
        assert!(!Wrapper::Short.is_convertible_from(Wrapper::Char));
        assert!(!Wrapper::Int.is_convertible_from(Wrapper::Boolean));
        assert!(!Wrapper::Int.is_convertible_from(Wrapper::Long));
        for wrapper in Wrapper::iter() {
            assert!(Wrapper::Void.is_convertible_from(wrapper));
            assert!(Wrapper::Object.is_convertible_from(wrapper) || wrapper == Wrapper::Void);
        }
    }

    #[test]
    pub fn box_classes_round_trip() {
        for wrapper in Wrapper::iter() {
            assert_eq!(Wrapper::for_wrapper_type(&wrapper.wrapper_type()), Some(wrapper));
        }
        assert_eq!(Wrapper::for_primitive_type(&CPDType::object()), None);
        assert_eq!(Wrapper::for_basic_type(&CPDType::string()), Wrapper::Object);
    }
}
