use std::fmt::{Debug, Display, Formatter};

use crate::compressed_classfile::{CompressedClassfileString, CompressedClassfileStringPool};
use crate::compressed_classfile::class_names::NUM_BUILTIN_CLASS_NAMES;

pub use crate::compressed_classfile::class_names::{CClassName, CompressedClassName};

#[derive(Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct MethodName(pub CompressedClassfileString);

#[allow(non_snake_case)]
impl MethodName {
    const fn from_raw_id(raw_id: u32) -> Self {
        Self(CompressedClassfileString { id: raw_id })
    }

    pub fn new(name: impl AsRef<str>) -> Self {
        Self(CompressedClassfileString::new(name))
    }

    pub fn to_str(&self) -> &'static str {
        self.0.to_str()
    }

    pub const fn constructor_init() -> Self {
        Self::from_raw_id(METHOD_INIT)
    }

    pub const fn constructor_clinit() -> Self {
        Self::from_raw_id(METHOD_CLINIT)
    }

    pub const fn method_invokeExact() -> Self {
        Self::from_raw_id(METHOD_INVOKE_EXACT)
    }

    pub const fn method_invoke() -> Self {
        Self::from_raw_id(METHOD_INVOKE)
    }

    pub const fn method_invokeBasic() -> Self {
        Self::from_raw_id(METHOD_INVOKE_BASIC)
    }

    pub const fn method_hashCode() -> Self {
        Self::from_raw_id(METHOD_HASH_CODE)
    }

    pub const fn method_equals() -> Self {
        Self::from_raw_id(METHOD_EQUALS)
    }

    pub const fn method_toString() -> Self {
        Self::from_raw_id(METHOD_TO_STRING)
    }

    pub const fn method_valueOf() -> Self {
        Self::from_raw_id(METHOD_VALUE_OF)
    }

    pub fn is_constructor(&self) -> bool {
        *self == Self::constructor_init()
    }

    pub fn is_signature_polymorphic(&self) -> bool {
        *self == Self::method_invoke() || *self == Self::method_invokeExact() || *self == Self::method_invokeBasic()
    }
}

impl Debug for MethodName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MethodName({})", self.to_str())
    }
}

impl Display for MethodName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FieldName(pub CompressedClassfileString);

impl FieldName {
    const fn from_raw_id(raw_id: u32) -> Self {
        Self(CompressedClassfileString { id: raw_id })
    }

    pub fn new(name: impl AsRef<str>) -> Self {
        Self(CompressedClassfileString::new(name))
    }

    pub fn to_str(&self) -> &'static str {
        self.0.to_str()
    }

    pub const fn field_value() -> Self {
        Self::from_raw_id(FIELD_VALUE)
    }
}

impl Debug for FieldName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "FieldName({})", self.to_str())
    }
}

impl Display for FieldName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

pub const METHOD_INIT: u32 = NUM_BUILTIN_CLASS_NAMES;
pub const METHOD_CLINIT: u32 = NUM_BUILTIN_CLASS_NAMES + 1;
pub const METHOD_INVOKE_EXACT: u32 = NUM_BUILTIN_CLASS_NAMES + 2;
pub const METHOD_INVOKE: u32 = NUM_BUILTIN_CLASS_NAMES + 3;
pub const METHOD_INVOKE_BASIC: u32 = NUM_BUILTIN_CLASS_NAMES + 4;
pub const METHOD_HASH_CODE: u32 = NUM_BUILTIN_CLASS_NAMES + 5;
pub const METHOD_EQUALS: u32 = NUM_BUILTIN_CLASS_NAMES + 6;
pub const METHOD_TO_STRING: u32 = NUM_BUILTIN_CLASS_NAMES + 7;
pub const METHOD_VALUE_OF: u32 = NUM_BUILTIN_CLASS_NAMES + 8;
pub const FIELD_VALUE: u32 = NUM_BUILTIN_CLASS_NAMES + 9;

fn add_builtin_name(pool: &CompressedClassfileStringPool, name: &str, id: u32) {
    let res = pool.add_name(name);
    assert_eq!(res.id, id);
}

pub(crate) fn add_all_names(pool: &CompressedClassfileStringPool) {
    add_builtin_name(pool, "<init>", METHOD_INIT);
    add_builtin_name(pool, "<clinit>", METHOD_CLINIT);
    add_builtin_name(pool, "invokeExact", METHOD_INVOKE_EXACT);
    add_builtin_name(pool, "invoke", METHOD_INVOKE);
    add_builtin_name(pool, "invokeBasic", METHOD_INVOKE_BASIC);
    add_builtin_name(pool, "hashCode", METHOD_HASH_CODE);
    add_builtin_name(pool, "equals", METHOD_EQUALS);
    add_builtin_name(pool, "toString", METHOD_TO_STRING);
    add_builtin_name(pool, "valueOf", METHOD_VALUE_OF);
    add_builtin_name(pool, "value", FIELD_VALUE);
}
