//! Access and property flags of classes and members, as they appear in member names.
//!
//! Field and method flags overlap: `ACC_VOLATILE` is the method bridge bit and `ACC_VARARGS`
//! the field transient bit, so a flag is only meaningful together with the member kind.

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_VOLATILE: u16 = 0x0040;
pub const ACC_VARARGS: u16 = 0x0080;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_SYNTHETIC: u16 = 0x1000;

pub const ALL_ACCESS_MODES: u16 = ACC_PUBLIC | ACC_PRIVATE | ACC_PROTECTED;

