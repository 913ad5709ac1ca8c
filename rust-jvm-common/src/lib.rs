#![allow(non_camel_case_types)]

pub mod classfile;
pub mod compressed_classfile;
pub mod descriptor_parser;
pub mod loading;
pub mod method_shape;
pub mod mhn_consts;
pub mod primitive_wrapper;

pub type jboolean = u8;
pub type jbyte = i8;
pub type jchar = u16;
pub type jshort = i16;
pub type jint = i32;
pub type jlong = i64;
pub type jfloat = f32;
pub type jdouble = f64;

/// Largest number of argument slots a method handle may take, not counting the handle itself.
pub const MAX_MH_ARITY: usize = 254;
/// Largest number of argument slots a JVM method may take.
pub const MAX_JVM_ARITY: usize = 255;
/// Largest number of argument slots for an invoker, which takes the target handle as well.
pub const MAX_MH_INVOKER_ARITY: usize = MAX_MH_ARITY - 1;
