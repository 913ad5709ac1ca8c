use std::collections::HashMap;

use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::compressed_classfile::{class_names, names};

struct StringPoolInner {
    strings: Vec<&'static str>,
    ids: HashMap<&'static str, u32>,
}

/// Add-only pool of the names that appear in descriptors. Equal strings always get the same id, so
/// names compare and hash as integers.
pub struct CompressedClassfileStringPool {
    inner: RwLock<StringPoolInner>,
}

lazy_static! {
    static ref STRING_POOL: CompressedClassfileStringPool = CompressedClassfileStringPool::new();
}

impl CompressedClassfileStringPool {
    fn new() -> Self {
        let pool = Self {
            inner: RwLock::new(StringPoolInner { strings: vec![], ids: HashMap::new() })
        };
        class_names::add_all_names(&pool);
        names::add_all_names(&pool);
        pool
    }

    pub fn global() -> &'static Self {
        &STRING_POOL
    }

    pub fn add_name(&self, str: impl AsRef<str>) -> CompressedClassfileString {
        let str = str.as_ref();
        if let Some(id) = self.inner.read().ids.get(str) {
            return CompressedClassfileString { id: *id };
        }
        let mut guard = self.inner.write();
        if let Some(id) = guard.ids.get(str) {
            return CompressedClassfileString { id: *id };
        }
        let leaked: &'static str = Box::leak(str.to_string().into_boxed_str());
        let id = guard.strings.len() as u32;
        guard.strings.push(leaked);
        guard.ids.insert(leaked, id);
        CompressedClassfileString { id }
    }

    pub fn lookup(&self, id: CompressedClassfileString) -> &'static str {
        self.inner.read().strings[id.id as usize]
    }

    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }
}

pub type CCString = CompressedClassfileString;

#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct CompressedClassfileString {
    pub id: u32,
}

impl CompressedClassfileString {
    pub fn new(str: impl AsRef<str>) -> Self {
        CompressedClassfileStringPool::global().add_name(str)
    }

    pub fn to_str(&self) -> &'static str {
        CompressedClassfileStringPool::global().lookup(*self)
    }
}
