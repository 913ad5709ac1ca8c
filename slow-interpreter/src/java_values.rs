use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use parking_lot::RwLock;

use rust_jvm_common::{jboolean, jbyte, jchar, jdouble, jfloat, jint, jlong, jshort};
use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::compressed_classfile::names::{CClassName, FieldName};
use rust_jvm_common::primitive_wrapper::Wrapper;

use crate::exceptions::{InvokeError, InvokeResult};
use crate::runtime_class::RuntimeClass;
use crate::stdlib::java::lang::invoke::lambda_form::basic_type::BasicType;
use crate::stdlib::java::lang::invoke::call_site::CallSite;
use crate::stdlib::java::lang::invoke::method_handle::MethodHandle;
use crate::stdlib::java::lang::invoke::method_type::MethodType;
use crate::stdlib::java::lang::member_name::MemberName;

#[derive(Clone)]
pub enum JavaValue {
    Long(jlong),
    Int(jint),
    Short(jshort),
    Byte(jbyte),
    Boolean(jboolean),
    Char(jchar),
    Float(jfloat),
    Double(jdouble),
    Object(Option<Arc<Object>>),
    Top,
}

enum Numeric {
    Integral(i64),
    Floating(f64),
}

impl JavaValue {
    pub fn null() -> Self {
        JavaValue::Object(None)
    }

    pub fn new_object(object: Object) -> Self {
        JavaValue::Object(Some(Arc::new(object)))
    }

    pub fn new_string(string: impl Into<String>) -> Self {
        Self::new_object(Object::String(string.into()))
    }

    pub fn boxed(value: JavaValue) -> Self {
        Self::new_object(Object::Boxed(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JavaValue::Object(None))
    }

    pub fn basic_type(&self) -> BasicType {
        match self {
            JavaValue::Long(_) => BasicType::J,
            JavaValue::Int(_) | JavaValue::Short(_) | JavaValue::Byte(_) | JavaValue::Boolean(_) | JavaValue::Char(_) => BasicType::I,
            JavaValue::Float(_) => BasicType::F,
            JavaValue::Double(_) => BasicType::D,
            JavaValue::Object(_) => BasicType::L,
            JavaValue::Top => BasicType::V,
        }
    }

    pub fn primitive_wrapper(&self) -> Option<Wrapper> {
        Some(match self {
            JavaValue::Long(_) => Wrapper::Long,
            JavaValue::Int(_) => Wrapper::Int,
            JavaValue::Short(_) => Wrapper::Short,
            JavaValue::Byte(_) => Wrapper::Byte,
            JavaValue::Boolean(_) => Wrapper::Boolean,
            JavaValue::Char(_) => Wrapper::Char,
            JavaValue::Float(_) => Wrapper::Float,
            JavaValue::Double(_) => Wrapper::Double,
            JavaValue::Object(_) | JavaValue::Top => return None,
        })
    }

    fn numeric(&self) -> Option<Numeric> {
        Some(match self {
            JavaValue::Long(long) => Numeric::Integral(*long),
            JavaValue::Int(int) => Numeric::Integral(*int as i64),
            JavaValue::Short(short) => Numeric::Integral(*short as i64),
            JavaValue::Byte(byte) => Numeric::Integral(*byte as i64),
            JavaValue::Boolean(boolean) => Numeric::Integral(*boolean as i64),
            JavaValue::Char(char) => Numeric::Integral(*char as i64),
            JavaValue::Float(float) => Numeric::Floating(*float as f64),
            JavaValue::Double(double) => Numeric::Floating(*double),
            JavaValue::Object(_) | JavaValue::Top => return None,
        })
    }

    /// Java primitive conversion of this value to `to`, with the usual casting semantics for narrowing.
    /// `None` for references, `Top`, and for `to` of `Object`/`Void`.
    pub fn convert_primitive(&self, to: Wrapper) -> Option<JavaValue> {
        let numeric = self.numeric()?;
        let as_int = |numeric: &Numeric| match numeric {
            Numeric::Integral(integral) => *integral as i32,
            Numeric::Floating(floating) => *floating as i32,
        };
        Some(match to {
            Wrapper::Boolean => JavaValue::Boolean((as_int(&numeric) & 1) as jboolean),
            Wrapper::Byte => JavaValue::Byte(as_int(&numeric) as jbyte),
            Wrapper::Short => JavaValue::Short(as_int(&numeric) as jshort),
            Wrapper::Char => JavaValue::Char(as_int(&numeric) as jchar),
            Wrapper::Int => JavaValue::Int(as_int(&numeric)),
            Wrapper::Long => JavaValue::Long(match numeric {
                Numeric::Integral(integral) => integral,
                Numeric::Floating(floating) => floating as i64,
            }),
            Wrapper::Float => JavaValue::Float(match numeric {
                Numeric::Integral(integral) => integral as f32,
                Numeric::Floating(floating) => floating as f32,
            }),
            Wrapper::Double => JavaValue::Double(match numeric {
                Numeric::Integral(integral) => integral as f64,
                Numeric::Floating(floating) => floating,
            }),
            Wrapper::Object | Wrapper::Void => return None,
        })
    }

    pub fn try_unwrap_int(&self) -> Option<jint> {
        match self {
            JavaValue::Int(int) => Some(*int),
            JavaValue::Short(short) => Some(*short as jint),
            JavaValue::Byte(byte) => Some(*byte as jint),
            JavaValue::Boolean(boolean) => Some(*boolean as jint),
            JavaValue::Char(char) => Some(*char as jint),
            _ => None,
        }
    }

    pub fn unwrap_int(&self) -> jint {
        self.try_unwrap_int().unwrap_or_else(|| panic!("expected int, found {:?}", self))
    }

    pub fn try_unwrap_long(&self) -> Option<jlong> {
        match self {
            JavaValue::Long(long) => Some(*long),
            _ => None,
        }
    }

    pub fn unwrap_long(&self) -> jlong {
        self.try_unwrap_long().unwrap_or_else(|| panic!("expected long, found {:?}", self))
    }

    pub fn unwrap_float(&self) -> jfloat {
        match self {
            JavaValue::Float(float) => *float,
            _ => panic!("expected float, found {:?}", self),
        }
    }

    pub fn unwrap_double(&self) -> jdouble {
        match self {
            JavaValue::Double(double) => *double,
            _ => panic!("expected double, found {:?}", self),
        }
    }

    pub fn unwrap_boolean(&self) -> bool {
        match self {
            JavaValue::Boolean(boolean) => *boolean != 0,
            _ => panic!("expected boolean, found {:?}", self),
        }
    }

    pub fn unwrap_object(&self) -> Option<Arc<Object>> {
        match self {
            JavaValue::Object(object) => object.clone(),
            _ => panic!("expected object, found {:?}", self),
        }
    }

    pub fn unwrap_object_nonnull(&self) -> Arc<Object> {
        self.unwrap_object().expect("unexpected null")
    }

    pub fn to_object(&self) -> InvokeResult<Option<Arc<Object>>> {
        match self {
            JavaValue::Object(object) => Ok(object.clone()),
            other => Err(InvokeError::IllegalState(format!("expected a reference, found {:?}", other))),
        }
    }

    pub fn to_object_nonnull(&self, context: &str) -> InvokeResult<Arc<Object>> {
        self.to_object()?.ok_or_else(|| InvokeError::NullPointer(context.to_string()))
    }

    pub fn to_method_handle(&self) -> InvokeResult<MethodHandle> {
        match self.to_object_nonnull("method handle")?.as_ref() {
            Object::MethodHandle(method_handle) => Ok(method_handle.clone()),
            other => Err(InvokeError::class_cast(other.runtime_type().java_source_representation(), "java.lang.invoke.MethodHandle")),
        }
    }

    pub fn to_method_type(&self) -> InvokeResult<MethodType> {
        match self.to_object_nonnull("method type")?.as_ref() {
            Object::MethodType(method_type) => Ok(method_type.clone()),
            other => Err(InvokeError::class_cast(other.runtime_type().java_source_representation(), "java.lang.invoke.MethodType")),
        }
    }

    pub fn to_member_name(&self) -> InvokeResult<MemberName> {
        match self.to_object_nonnull("member name")?.as_ref() {
            Object::MemberName(member_name) => Ok(member_name.clone()),
            other => Err(InvokeError::class_cast(other.runtime_type().java_source_representation(), "java.lang.invoke.MemberName")),
        }
    }

    pub fn to_call_site(&self) -> InvokeResult<CallSite> {
        match self.to_object_nonnull("call site")?.as_ref() {
            Object::CallSite(call_site) => Ok(call_site.clone()),
            other => Err(InvokeError::class_cast(other.runtime_type().java_source_representation(), "java.lang.invoke.CallSite")),
        }
    }

    /// Contents of a `java/lang/String`, or `None` for anything else.
    pub fn try_unwrap_string(&self) -> Option<String> {
        match self {
            JavaValue::Object(Some(object)) => match object.as_ref() {
                Object::String(string) => Some(string.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    /// The primitive inside a box, or `None` for anything else.
    pub fn try_unbox(&self) -> Option<JavaValue> {
        match self {
            JavaValue::Object(Some(object)) => match object.as_ref() {
                Object::Boxed(value) => Some(value.clone()),
                _ => None,
            },
            _ => None,
        }
    }
}

impl PartialEq for JavaValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JavaValue::Long(a), JavaValue::Long(b)) => a == b,
            (JavaValue::Int(a), JavaValue::Int(b)) => a == b,
            (JavaValue::Short(a), JavaValue::Short(b)) => a == b,
            (JavaValue::Byte(a), JavaValue::Byte(b)) => a == b,
            (JavaValue::Boolean(a), JavaValue::Boolean(b)) => a == b,
            (JavaValue::Char(a), JavaValue::Char(b)) => a == b,
            (JavaValue::Float(a), JavaValue::Float(b)) => a.to_bits() == b.to_bits(),
            (JavaValue::Double(a), JavaValue::Double(b)) => a.to_bits() == b.to_bits(),
            (JavaValue::Object(None), JavaValue::Object(None)) => true,
            (JavaValue::Object(Some(a)), JavaValue::Object(Some(b))) => Arc::ptr_eq(a, b),
            (JavaValue::Top, JavaValue::Top) => true,
            _ => false,
        }
    }
}

impl Debug for JavaValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            JavaValue::Long(long) => write!(f, "Long({})", long),
            JavaValue::Int(int) => write!(f, "Int({})", int),
            JavaValue::Short(short) => write!(f, "Short({})", short),
            JavaValue::Byte(byte) => write!(f, "Byte({})", byte),
            JavaValue::Boolean(boolean) => write!(f, "Boolean({})", boolean),
            JavaValue::Char(char) => write!(f, "Char({})", char),
            JavaValue::Float(float) => write!(f, "Float({})", float),
            JavaValue::Double(double) => write!(f, "Double({})", double),
            JavaValue::Object(None) => write!(f, "null"),
            JavaValue::Object(Some(object)) => write!(f, "{:?}", object),
            JavaValue::Top => write!(f, "Top"),
        }
    }
}

impl From<MethodHandle> for JavaValue {
    fn from(method_handle: MethodHandle) -> Self {
        JavaValue::new_object(Object::MethodHandle(method_handle))
    }
}

impl From<MethodType> for JavaValue {
    fn from(method_type: MethodType) -> Self {
        JavaValue::new_object(Object::MethodType(method_type))
    }
}

impl From<MemberName> for JavaValue {
    fn from(member_name: MemberName) -> Self {
        JavaValue::new_object(Object::MemberName(member_name))
    }
}

impl From<CallSite> for JavaValue {
    fn from(call_site: CallSite) -> Self {
        JavaValue::new_object(Object::CallSite(call_site))
    }
}

pub fn default_value(type_: &CPDType) -> JavaValue {
    match type_ {
        CPDType::ByteType => JavaValue::Byte(0),
        CPDType::CharType => JavaValue::Char(0),
        CPDType::DoubleType => JavaValue::Double(0.0),
        CPDType::FloatType => JavaValue::Float(0.0),
        CPDType::IntType => JavaValue::Int(0),
        CPDType::LongType => JavaValue::Long(0),
        CPDType::ShortType => JavaValue::Short(0),
        CPDType::BooleanType => JavaValue::Boolean(0),
        CPDType::VoidType => JavaValue::Top,
        CPDType::Class(_) | CPDType::Array { .. } => JavaValue::null(),
    }
}

pub enum Object {
    Normal(NormalObject),
    Array(ArrayObject),
    Boxed(JavaValue),
    String(String),
    Class(ClassMirror),
    MethodHandle(MethodHandle),
    MethodType(MethodType),
    MemberName(MemberName),
    CallSite(CallSite),
}

pub struct NormalObject {
    pub class: Arc<RuntimeClass>,
    pub fields: RwLock<Vec<JavaValue>>,
}

pub struct ArrayObject {
    pub elem_type: CPDType,
    pub elems: RwLock<Vec<JavaValue>>,
}

impl ArrayObject {
    pub fn len(&self) -> usize {
        self.elems.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_i(&self, i: usize) -> InvokeResult<JavaValue> {
        let elems = self.elems.read();
        elems.get(i).cloned().ok_or(InvokeError::IndexOutOfRange { index: i, len: elems.len() })
    }
}

#[derive(Clone, Debug)]
pub struct ClassMirror {
    pub cpdtype: CPDType,
}

impl Object {
    pub fn runtime_type(&self) -> CPDType {
        match self {
            Object::Normal(normal) => CPDType::Class(normal.class.view.name()),
            Object::Array(array) => CPDType::array(array.elem_type),
            Object::Boxed(value) => value.primitive_wrapper().map(|wrapper| wrapper.wrapper_type()).unwrap_or_else(CPDType::object),
            Object::String(_) => CPDType::string(),
            Object::Class(_) => CPDType::class(),
            Object::MethodHandle(_) => CPDType::method_handle(),
            Object::MethodType(_) => CPDType::method_type(),
            Object::MemberName(_) => CPDType::Class(CClassName::member_name()),
            Object::CallSite(_) => CPDType::Class(CClassName::call_site()),
        }
    }

    pub fn unwrap_normal_object(&self) -> &NormalObject {
        match self {
            Object::Normal(normal) => normal,
            _ => panic!("expected normal object"),
        }
    }

    pub fn unwrap_array(&self) -> &ArrayObject {
        match self {
            Object::Array(array) => array,
            _ => panic!("expected array"),
        }
    }

    /// Reads an instance field declared by `declaring_class`.
    pub fn get_field(&self, declaring_class: CClassName, name: FieldName) -> Option<JavaValue> {
        match self {
            Object::Normal(normal) => {
                let field_number = normal.class.lookup_instance_field(declaring_class, name)?;
                normal.fields.read().get(field_number.number).cloned()
            }
            _ => None,
        }
    }

    pub fn detail_message(&self) -> Option<String> {
        self.get_field(CClassName::throwable(), FieldName::new("detailMessage"))?.try_unwrap_string()
    }
}

impl Debug for Object {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Object::Normal(normal) => write!(f, "{}@{:p}", normal.class.view.name(), self),
            Object::Array(array) => write!(f, "{}[{}]", array.elem_type.java_source_representation(), array.len()),
            Object::Boxed(value) => write!(f, "Boxed({:?})", value),
            Object::String(string) => write!(f, "{:?}", string),
            Object::Class(mirror) => write!(f, "class {}", mirror.cpdtype.java_source_representation()),
            Object::MethodHandle(method_handle) => write!(f, "MethodHandle{}", method_handle.type_()),
            Object::MethodType(method_type) => write!(f, "{}", method_type),
            Object::MemberName(member_name) => write!(f, "{}", member_name),
            Object::CallSite(call_site) => write!(f, "CallSite{}", call_site.type_()),
        }
    }
}
