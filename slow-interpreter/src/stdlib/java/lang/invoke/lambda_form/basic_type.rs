use itertools::Itertools;
use strum_macros::{EnumCount, EnumIter, IntoStaticStr};

use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::primitive_wrapper::Wrapper;

/// The erased kinds of value a lambda form manipulates. Subword primitives travel as `I`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, EnumIter, EnumCount, IntoStaticStr)]
pub enum BasicType {
    L,
    I,
    J,
    F,
    D,
    V,
}

impl BasicType {
    pub fn from_type(cpdtype: &CPDType) -> Self {
        match cpdtype {
            CPDType::BooleanType | CPDType::ByteType | CPDType::ShortType | CPDType::CharType | CPDType::IntType => BasicType::I,
            CPDType::LongType => BasicType::J,
            CPDType::FloatType => BasicType::F,
            CPDType::DoubleType => BasicType::D,
            CPDType::VoidType => BasicType::V,
            CPDType::Class(_) | CPDType::Array { .. } => BasicType::L,
        }
    }

    pub fn from_types(cpdtypes: &[CPDType]) -> Vec<BasicType> {
        cpdtypes.iter().map(BasicType::from_type).collect()
    }

    pub fn basic_type_char(self) -> char {
        match self {
            BasicType::L => 'L',
            BasicType::I => 'I',
            BasicType::J => 'J',
            BasicType::F => 'F',
            BasicType::D => 'D',
            BasicType::V => 'V',
        }
    }

    /// The representative type: `Object` for references, the widest subword-free primitive otherwise.
    pub fn basic_type_class(self) -> CPDType {
        match self {
            BasicType::L => CPDType::object(),
            BasicType::I => CPDType::IntType,
            BasicType::J => CPDType::LongType,
            BasicType::F => CPDType::FloatType,
            BasicType::D => CPDType::DoubleType,
            BasicType::V => CPDType::VoidType,
        }
    }

    pub fn basic_type_wrapper(self) -> Wrapper {
        Wrapper::for_basic_type(&self.basic_type_class())
    }

    pub fn is_arg_basic_type(self) -> bool {
        self != BasicType::V
    }

    /// Compact signature such as `LIJ_L`, used in lambda form debug names.
    pub fn signature(ptypes: &[BasicType], rtype: BasicType) -> String {
        format!("{}_{}", ptypes.iter().map(|ptype| ptype.basic_type_char()).join(""), rtype.basic_type_char())
    }
}

#[cfg(test)]
pub mod test {
    use rust_jvm_common::compressed_classfile::CPDType;

    use crate::stdlib::java::lang::invoke::lambda_form::basic_type::BasicType;

    #[test]
    pub fn subwords_erase_to_int() {
        assert_eq!(BasicType::from_type(&CPDType::BooleanType), BasicType::I);
        assert_eq!(BasicType::from_type(&CPDType::CharType), BasicType::I);
        assert_eq!(BasicType::from_type(&CPDType::string()), BasicType::L);
        assert_eq!(BasicType::from_type(&CPDType::array(CPDType::IntType)), BasicType::L);
        assert_eq!(BasicType::signature(&[BasicType::L, BasicType::I], BasicType::V), "LI_V");
    }
}
