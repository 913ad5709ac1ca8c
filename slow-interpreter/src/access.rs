use std::sync::Arc;

use rust_jvm_common::classfile::{ACC_PRIVATE, ACC_PROTECTED, ACC_PUBLIC, ACC_STATIC, ALL_ACCESS_MODES};

use crate::runtime_class::RuntimeClass;
use crate::view::HasAccessFlags;

/// Decides whether a lookup class may use a class or one of its members.
pub trait AccessControl: Send + Sync {
    fn is_class_accessible(&self, target: &Arc<RuntimeClass>, lookup_class: &Arc<RuntimeClass>) -> bool;

    /// `ref_class` is the class named in the lookup, `declaring_class` the one the member was found in.
    fn is_member_accessible(&self, ref_class: &Arc<RuntimeClass>, declaring_class: &Arc<RuntimeClass>, member_flags: u16, lookup_class: &Arc<RuntimeClass>) -> bool;
}

/// The platform rules for public, protected, package-private and private access.
pub struct VerifyAccess;

/// Accepts every access. Used for trusted lookups.
pub struct FullTrust;

pub fn is_same_package(a: &RuntimeClass, b: &RuntimeClass) -> bool {
    a.loader == b.loader && a.view.name().is_same_package(b.view.name())
}

fn is_related_class(a: &Arc<RuntimeClass>, b: &Arc<RuntimeClass>) -> bool {
    Arc::ptr_eq(a, b) || a.is_subclass_of(b.view.name()) || b.is_subclass_of(a.view.name())
}

impl AccessControl for VerifyAccess {
    fn is_class_accessible(&self, target: &Arc<RuntimeClass>, lookup_class: &Arc<RuntimeClass>) -> bool {
        target.view.is_public() || is_same_package(target, lookup_class)
    }

    fn is_member_accessible(&self, ref_class: &Arc<RuntimeClass>, declaring_class: &Arc<RuntimeClass>, member_flags: u16, lookup_class: &Arc<RuntimeClass>) -> bool {
        if !self.is_class_accessible(ref_class, lookup_class) {
            return false;
        }
        if Arc::ptr_eq(declaring_class, lookup_class) {
            return true;
        }
        match member_flags & ALL_ACCESS_MODES {
            ACC_PUBLIC => true,
            ACC_PROTECTED => {
                if is_same_package(declaring_class, lookup_class) {
                    return true;
                }
                if member_flags & ACC_STATIC != 0 && !is_related_class(ref_class, lookup_class) {
                    return false;
                }
                lookup_class.is_subclass_of(declaring_class.view.name())
            }
            ACC_PRIVATE => false,
            _ => is_same_package(declaring_class, lookup_class),
        }
    }
}

impl AccessControl for FullTrust {
    fn is_class_accessible(&self, _target: &Arc<RuntimeClass>, _lookup_class: &Arc<RuntimeClass>) -> bool {
        true
    }

    fn is_member_accessible(&self, _ref_class: &Arc<RuntimeClass>, _declaring_class: &Arc<RuntimeClass>, _member_flags: u16, _lookup_class: &Arc<RuntimeClass>) -> bool {
        true
    }
}
