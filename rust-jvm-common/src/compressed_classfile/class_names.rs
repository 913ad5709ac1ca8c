use std::fmt::{Debug, Display, Formatter};

use crate::compressed_classfile::{CompressedClassfileString, CompressedClassfileStringPool};

#[derive(Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CompressedClassName(pub CompressedClassfileString);

pub type CClassName = CompressedClassName;

impl CompressedClassName {
    const fn from_raw_id(raw_id: u32) -> Self {
        Self(CompressedClassfileString { id: raw_id })
    }

    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        assert!(!name.starts_with('['), "array types are not class names: {}", name);
        Self(CompressedClassfileString::new(name))
    }

    pub fn to_str(&self) -> &'static str {
        self.0.to_str()
    }

    pub fn simple_name(&self) -> &'static str {
        let full = self.to_str();
        full.rsplit('/').next().unwrap_or(full)
    }

    pub fn package(&self) -> &'static str {
        let full = self.to_str();
        match full.rfind('/') {
            None => "",
            Some(idx) => &full[..idx],
        }
    }

    pub fn is_same_package(&self, other: CClassName) -> bool {
        self.package() == other.package()
    }

    pub const fn object() -> Self {
        Self::from_raw_id(JAVA_LANG_OBJECT)
    }

    pub const fn class() -> Self {
        Self::from_raw_id(JAVA_LANG_CLASS)
    }

    pub const fn string() -> Self {
        Self::from_raw_id(JAVA_LANG_STRING)
    }

    pub const fn throwable() -> Self {
        Self::from_raw_id(JAVA_LANG_THROWABLE)
    }

    pub const fn float() -> Self {
        Self::from_raw_id(JAVA_LANG_FLOAT)
    }

    pub const fn double() -> Self {
        Self::from_raw_id(JAVA_LANG_DOUBLE)
    }

    pub const fn int() -> Self {
        Self::from_raw_id(JAVA_LANG_INTEGER)
    }

    pub const fn long() -> Self {
        Self::from_raw_id(JAVA_LANG_LONG)
    }

    pub const fn character() -> Self {
        Self::from_raw_id(JAVA_LANG_CHARACTER)
    }

    pub const fn boolean() -> Self {
        Self::from_raw_id(JAVA_LANG_BOOLEAN)
    }

    pub const fn byte() -> Self {
        Self::from_raw_id(JAVA_LANG_BYTE)
    }

    pub const fn short() -> Self {
        Self::from_raw_id(JAVA_LANG_SHORT)
    }

    pub const fn void() -> Self {
        Self::from_raw_id(JAVA_LANG_VOID)
    }

    pub const fn number() -> Self {
        Self::from_raw_id(JAVA_LANG_NUMBER)
    }

    pub const fn comparable() -> Self {
        Self::from_raw_id(JAVA_LANG_COMPARABLE)
    }

    pub const fn serializable() -> Self {
        Self::from_raw_id(JAVA_IO_SERIALIZABLE)
    }

    pub const fn cloneable() -> Self {
        Self::from_raw_id(JAVA_LANG_CLONEABLE)
    }

    pub const fn char_sequence() -> Self {
        Self::from_raw_id(JAVA_LANG_CHAR_SEQUENCE)
    }

    pub const fn method_type() -> Self {
        Self::from_raw_id(JAVA_LANG_INVOKE_METHODTYPE)
    }

    pub const fn method_handle() -> Self {
        Self::from_raw_id(JAVA_LANG_INVOKE_METHODHANDLE)
    }

    pub const fn member_name() -> Self {
        Self::from_raw_id(JAVA_LANG_INVOKE_MEMBERNAME)
    }

    pub const fn call_site() -> Self {
        Self::from_raw_id(JAVA_LANG_INVOKE_CALL_SITE)
    }

    pub const fn lambda_form() -> Self {
        Self::from_raw_id(JAVA_LANG_INVOKE_LAMBDA_FORM)
    }

    pub const fn runtime_exception() -> Self {
        Self::from_raw_id(JAVA_LANG_RUNTIME_EXCEPTION)
    }

    pub const fn exception() -> Self {
        Self::from_raw_id(JAVA_LANG_EXCEPTION)
    }
}

impl Debug for CompressedClassName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CClassName({})", self.to_str())
    }
}

impl Display for CompressedClassName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

pub const JAVA_LANG_OBJECT: u32 = 0;
pub const JAVA_LANG_CLASS: u32 = 1;
pub const JAVA_LANG_STRING: u32 = 2;
pub const JAVA_LANG_THROWABLE: u32 = 3;
pub const JAVA_LANG_FLOAT: u32 = 4;
pub const JAVA_LANG_DOUBLE: u32 = 5;
pub const JAVA_LANG_INTEGER: u32 = 6;
pub const JAVA_LANG_LONG: u32 = 7;
pub const JAVA_LANG_CHARACTER: u32 = 8;
pub const JAVA_LANG_BOOLEAN: u32 = 9;
pub const JAVA_LANG_BYTE: u32 = 10;
pub const JAVA_LANG_SHORT: u32 = 11;
pub const JAVA_LANG_VOID: u32 = 12;
pub const JAVA_LANG_NUMBER: u32 = 13;
pub const JAVA_LANG_COMPARABLE: u32 = 14;
pub const JAVA_IO_SERIALIZABLE: u32 = 15;
pub const JAVA_LANG_CLONEABLE: u32 = 16;
pub const JAVA_LANG_CHAR_SEQUENCE: u32 = 17;
pub const JAVA_LANG_INVOKE_METHODTYPE: u32 = 18;
pub const JAVA_LANG_INVOKE_METHODHANDLE: u32 = 19;
pub const JAVA_LANG_INVOKE_MEMBERNAME: u32 = 20;
pub const JAVA_LANG_INVOKE_CALL_SITE: u32 = 21;
pub const JAVA_LANG_INVOKE_LAMBDA_FORM: u32 = 22;
pub const JAVA_LANG_RUNTIME_EXCEPTION: u32 = 23;
pub const JAVA_LANG_EXCEPTION: u32 = 24;

pub const NUM_BUILTIN_CLASS_NAMES: u32 = 25;

fn add_builtin_name(pool: &CompressedClassfileStringPool, name: &str, id: u32) {
    let res = pool.add_name(name);
    assert_eq!(res.id, id);
}

pub(crate) fn add_all_names(pool: &CompressedClassfileStringPool) {
    add_builtin_name(pool, "java/lang/Object", JAVA_LANG_OBJECT);
    add_builtin_name(pool, "java/lang/Class", JAVA_LANG_CLASS);
    add_builtin_name(pool, "java/lang/String", JAVA_LANG_STRING);
    add_builtin_name(pool, "java/lang/Throwable", JAVA_LANG_THROWABLE);
    add_builtin_name(pool, "java/lang/Float", JAVA_LANG_FLOAT);
    add_builtin_name(pool, "java/lang/Double", JAVA_LANG_DOUBLE);
    add_builtin_name(pool, "java/lang/Integer", JAVA_LANG_INTEGER);
    add_builtin_name(pool, "java/lang/Long", JAVA_LANG_LONG);
    add_builtin_name(pool, "java/lang/Character", JAVA_LANG_CHARACTER);
    add_builtin_name(pool, "java/lang/Boolean", JAVA_LANG_BOOLEAN);
    add_builtin_name(pool, "java/lang/Byte", JAVA_LANG_BYTE);
    add_builtin_name(pool, "java/lang/Short", JAVA_LANG_SHORT);
    add_builtin_name(pool, "java/lang/Void", JAVA_LANG_VOID);
    add_builtin_name(pool, "java/lang/Number", JAVA_LANG_NUMBER);
    add_builtin_name(pool, "java/lang/Comparable", JAVA_LANG_COMPARABLE);
    add_builtin_name(pool, "java/io/Serializable", JAVA_IO_SERIALIZABLE);
    add_builtin_name(pool, "java/lang/Cloneable", JAVA_LANG_CLONEABLE);
    add_builtin_name(pool, "java/lang/CharSequence", JAVA_LANG_CHAR_SEQUENCE);
    add_builtin_name(pool, "java/lang/invoke/MethodType", JAVA_LANG_INVOKE_METHODTYPE);
    add_builtin_name(pool, "java/lang/invoke/MethodHandle", JAVA_LANG_INVOKE_METHODHANDLE);
    add_builtin_name(pool, "java/lang/invoke/MemberName", JAVA_LANG_INVOKE_MEMBERNAME);
    add_builtin_name(pool, "java/lang/invoke/CallSite", JAVA_LANG_INVOKE_CALL_SITE);
    add_builtin_name(pool, "java/lang/invoke/LambdaForm", JAVA_LANG_INVOKE_LAMBDA_FORM);
    add_builtin_name(pool, "java/lang/RuntimeException", JAVA_LANG_RUNTIME_EXCEPTION);
    add_builtin_name(pool, "java/lang/Exception", JAVA_LANG_EXCEPTION);
}
