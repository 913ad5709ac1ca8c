use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use strum_macros::{EnumIter, IntoStaticStr};

pub const IS_METHOD: u32 = 0x00010000;
pub const IS_CONSTRUCTOR: u32 = 0x00020000;
pub const IS_FIELD: u32 = 0x00040000;
pub const IS_TYPE: u32 = 0x00080000;
pub const CALLER_SENSITIVE: u32 = 0x00100000;
pub const ALL_KINDS: u32 = IS_METHOD | IS_CONSTRUCTOR | IS_FIELD | IS_TYPE;

pub const REFERENCE_KIND_SHIFT: u32 = 24;
pub const REFERENCE_KIND_MASK: u32 = 0x0F;

pub const SEARCH_SUPERCLASSES: u32 = 0x00100000;
pub const SEARCH_INTERFACES: u32 = 0x00200000;

pub const ALL_ACCESS: u32 = 0x0001 | 0x0002 | 0x0004;
pub const RECOGNIZED_MODIFIERS: u32 = 0xFFFF;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, FromPrimitive, ToPrimitive, IntoStaticStr, EnumIter)]
#[repr(u8)]
pub enum ReferenceKind {
    #[strum(serialize = "getField")]
    GetField = 1,
    #[strum(serialize = "getStatic")]
    GetStatic = 2,
    #[strum(serialize = "putField")]
    PutField = 3,
    #[strum(serialize = "putStatic")]
    PutStatic = 4,
    #[strum(serialize = "invokeVirtual")]
    InvokeVirtual = 5,
    #[strum(serialize = "invokeStatic")]
    InvokeStatic = 6,
    #[strum(serialize = "invokeSpecial")]
    InvokeSpecial = 7,
    #[strum(serialize = "newInvokeSpecial")]
    NewInvokeSpecial = 8,
    #[strum(serialize = "invokeInterface")]
    InvokeInterface = 9,
}

impl ReferenceKind {
    pub fn from_flags(flags: u32) -> Option<Self> {
        Self::from_u32((flags >> REFERENCE_KIND_SHIFT) & REFERENCE_KIND_MASK)
    }

    pub fn to_flags(self) -> u32 {
        (self as u32) << REFERENCE_KIND_SHIFT
    }

    pub fn is_field(self) -> bool {
        matches!(self, ReferenceKind::GetField | ReferenceKind::GetStatic | ReferenceKind::PutField | ReferenceKind::PutStatic)
    }

    pub fn is_getter(self) -> bool {
        matches!(self, ReferenceKind::GetField | ReferenceKind::GetStatic)
    }

    pub fn is_setter(self) -> bool {
        matches!(self, ReferenceKind::PutField | ReferenceKind::PutStatic)
    }

    pub fn is_method(self) -> bool {
        !self.is_field() && self != ReferenceKind::NewInvokeSpecial
    }

    pub fn is_constructor(self) -> bool {
        self == ReferenceKind::NewInvokeSpecial
    }

    pub fn has_receiver(self) -> bool {
        !self.is_static() && self != ReferenceKind::NewInvokeSpecial
    }

    pub fn is_static(self) -> bool {
        matches!(self, ReferenceKind::GetStatic | ReferenceKind::PutStatic | ReferenceKind::InvokeStatic)
    }

    pub fn does_dispatch(self) -> bool {
        matches!(self, ReferenceKind::InvokeVirtual | ReferenceKind::InvokeInterface)
    }

    /// The setter counterpart of a getter kind.
    pub fn as_setter(self) -> Option<Self> {
        match self {
            ReferenceKind::GetField => Some(ReferenceKind::PutField),
            ReferenceKind::GetStatic => Some(ReferenceKind::PutStatic),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
pub mod test {
    use strum::IntoEnumIterator;

    use crate::mhn_consts::{IS_METHOD, ReferenceKind};

    #[test]
    pub fn reference_kinds_round_trip_through_flags() {
        for kind in ReferenceKind::iter() {
            assert_eq!(ReferenceKind::from_flags(kind.to_flags() | IS_METHOD), Some(kind));
        }
        assert_eq!(ReferenceKind::from_flags(IS_METHOD), None);
        assert_eq!(ReferenceKind::InvokeStatic.name(), "invokeStatic");
    }

    #[test]
    pub fn kind_classification() {
        assert!(ReferenceKind::GetStatic.is_static());
        assert!(ReferenceKind::GetStatic.is_getter());
        assert_eq!(ReferenceKind::GetStatic.as_setter(), Some(ReferenceKind::PutStatic));
        assert!(!ReferenceKind::NewInvokeSpecial.is_method());
        assert!(ReferenceKind::InvokeInterface.does_dispatch());
        assert!(!ReferenceKind::InvokeSpecial.does_dispatch());
    }
}
