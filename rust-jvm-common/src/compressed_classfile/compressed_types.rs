use std::iter;
use std::num::NonZeroU8;

use itertools::Itertools;

use crate::compressed_classfile::class_names::{CClassName, CompressedClassName};

pub type CPDType = CompressedParsedDescriptorType;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u8)]
pub enum CompressedParsedDescriptorType {
    BooleanType = 0,
    ByteType = 1,
    ShortType = 2,
    CharType = 3,
    IntType = 4,
    LongType = 5,
    FloatType = 6,
    DoubleType = 7,
    VoidType = 8,
    Class(CompressedClassName) = 9,
    Array {
        base_type: NonArrayCompressedParsedDescriptorType,
        num_nested_arrs: NonZeroU8,
    } = 10,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u8)]
pub enum NonArrayCompressedParsedDescriptorType {
    BooleanType = 0,
    ByteType = 1,
    ShortType = 2,
    CharType = 3,
    IntType = 4,
    LongType = 5,
    FloatType = 6,
    DoubleType = 7,
    Class(CClassName) = 9,
}

impl NonArrayCompressedParsedDescriptorType {
    pub fn to_cpdtype(&self) -> CPDType {
        match self {
            NonArrayCompressedParsedDescriptorType::BooleanType => CPDType::BooleanType,
            NonArrayCompressedParsedDescriptorType::ByteType => CPDType::ByteType,
            NonArrayCompressedParsedDescriptorType::ShortType => CPDType::ShortType,
            NonArrayCompressedParsedDescriptorType::CharType => CPDType::CharType,
            NonArrayCompressedParsedDescriptorType::IntType => CPDType::IntType,
            NonArrayCompressedParsedDescriptorType::LongType => CPDType::LongType,
            NonArrayCompressedParsedDescriptorType::FloatType => CPDType::FloatType,
            NonArrayCompressedParsedDescriptorType::DoubleType => CPDType::DoubleType,
            NonArrayCompressedParsedDescriptorType::Class(ccn) => CPDType::Class(*ccn),
        }
    }
}

impl CompressedParsedDescriptorType {
    pub fn new_array_or_normal(inner: NonArrayCompressedParsedDescriptorType, nested: u8) -> CPDType {
        match NonZeroU8::new(nested) {
            None => inner.to_cpdtype(),
            Some(nested) => CPDType::Array { base_type: inner, num_nested_arrs: nested },
        }
    }

    /// Array of `sub_type`. Panics on `void` or past 255 dimensions, neither of which a descriptor can express.
    pub fn array(sub_type: Self) -> Self {
        let base_type = match sub_type {
            CPDType::BooleanType => NonArrayCompressedParsedDescriptorType::BooleanType,
            CPDType::ByteType => NonArrayCompressedParsedDescriptorType::ByteType,
            CPDType::ShortType => NonArrayCompressedParsedDescriptorType::ShortType,
            CPDType::CharType => NonArrayCompressedParsedDescriptorType::CharType,
            CPDType::IntType => NonArrayCompressedParsedDescriptorType::IntType,
            CPDType::LongType => NonArrayCompressedParsedDescriptorType::LongType,
            CPDType::FloatType => NonArrayCompressedParsedDescriptorType::FloatType,
            CPDType::DoubleType => NonArrayCompressedParsedDescriptorType::DoubleType,
            CPDType::VoidType => panic!("array of void"),
            CPDType::Class(class_name) => NonArrayCompressedParsedDescriptorType::Class(class_name),
            CPDType::Array { base_type, num_nested_arrs } => {
                let num_nested_arrs = num_nested_arrs.checked_add(1).expect("too many array dimensions");
                return CPDType::Array { base_type, num_nested_arrs };
            }
        };
        CPDType::Array { base_type, num_nested_arrs: NonZeroU8::MIN }
    }

    pub fn object() -> Self {
        Self::Class(CompressedClassName::object())
    }

    pub fn class() -> Self {
        Self::Class(CompressedClassName::class())
    }

    pub fn string() -> Self {
        Self::Class(CompressedClassName::string())
    }

    pub fn method_handle() -> Self {
        Self::Class(CompressedClassName::method_handle())
    }

    pub fn method_type() -> Self {
        Self::Class(CompressedClassName::method_type())
    }

    pub fn object_array() -> Self {
        Self::array(Self::object())
    }

    pub fn is_primitive(&self) -> bool {
        !self.is_reference()
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, CPDType::Class(_) | CPDType::Array { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, CPDType::Array { .. })
    }

    pub fn is_void(&self) -> bool {
        matches!(self, CPDType::VoidType)
    }

    pub fn is_double_or_long(&self) -> bool {
        matches!(self, CPDType::DoubleType | CPDType::LongType)
    }

    pub fn is_object(&self) -> bool {
        *self == Self::object()
    }

    /// Number of JVM argument slots a value of this type occupies.
    pub fn slot_size(&self) -> usize {
        match self {
            CPDType::VoidType => 0,
            CPDType::LongType | CPDType::DoubleType => 2,
            _ => 1,
        }
    }

    pub fn try_unwrap_class_type(&self) -> Option<CClassName> {
        match self {
            CPDType::Class(ccn) => Some(*ccn),
            _ => None,
        }
    }

    pub fn unwrap_class_type(&self) -> CClassName {
        self.try_unwrap_class_type().unwrap()
    }

    /// Component type of an array type.
    pub fn try_unwrap_array_type(&self) -> Option<CPDType> {
        match self {
            CPDType::Array { base_type, num_nested_arrs } => Some(CPDType::new_array_or_normal(*base_type, num_nested_arrs.get() - 1)),
            _ => None,
        }
    }

    pub fn unwrap_array_type(&self) -> CPDType {
        self.try_unwrap_array_type().unwrap()
    }

    pub fn jvm_representation(&self) -> String {
        match self {
            Self::ByteType => "B".to_string(),
            Self::CharType => "C".to_string(),
            Self::DoubleType => "D".to_string(),
            Self::FloatType => "F".to_string(),
            Self::IntType => "I".to_string(),
            Self::LongType => "J".to_string(),
            Self::ShortType => "S".to_string(),
            Self::BooleanType => "Z".to_string(),
            Self::VoidType => "V".to_string(),
            Self::Class(ccn) => format!("L{};", ccn.to_str()),
            Self::Array { base_type, num_nested_arrs } => {
                format!("{}{}", iter::repeat("[").take(num_nested_arrs.get() as usize).join(""), base_type.to_cpdtype().jvm_representation())
            }
        }
    }

    pub fn java_source_representation(&self) -> String {
        match self {
            Self::ByteType => "byte".to_string(),
            Self::CharType => "char".to_string(),
            Self::DoubleType => "double".to_string(),
            Self::FloatType => "float".to_string(),
            Self::IntType => "int".to_string(),
            Self::LongType => "long".to_string(),
            Self::ShortType => "short".to_string(),
            Self::BooleanType => "boolean".to_string(),
            Self::VoidType => "void".to_string(),
            Self::Class(ccn) => ccn.to_str().replace('/', "."),
            Self::Array { base_type, num_nested_arrs } => {
                format!("{}{}", base_type.to_cpdtype().java_source_representation(), iter::repeat("[]").take(num_nested_arrs.get() as usize).join(""))
            }
        }
    }

    /// Unqualified name, as used when printing method types.
    pub fn short_representation(&self) -> String {
        match self {
            Self::Class(ccn) => ccn.simple_name().to_string(),
            Self::Array { base_type, num_nested_arrs } => {
                format!("{}{}", base_type.to_cpdtype().short_representation(), iter::repeat("[]").take(num_nested_arrs.get() as usize).join(""))
            }
            primitive => primitive.java_source_representation(),
        }
    }
}

impl From<CompressedClassName> for CompressedParsedDescriptorType {
    fn from(ccn: CompressedClassName) -> Self {
        CPDType::Class(ccn)
    }
}
