use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use by_address::ByAddress;
use parking_lot::Mutex;

use crate::class_loading::{initialize_class, should_be_initialized};
use crate::exceptions::InvokeResult;
use crate::jvm_state::JVMState;
use crate::runtime_class::RuntimeClass;

/// Classes whose initialization was started through a handle barrier and not yet seen complete,
/// with the thread running their initializer.
pub struct EnsureInitialized {
    table: Mutex<HashMap<ByAddress<Arc<RuntimeClass>>, ThreadId>>,
}

impl EnsureInitialized {
    pub fn new() -> Self {
        Self { table: Mutex::new(HashMap::new()) }
    }

    /// Initializes `class` if needed and reports whether its barrier can now be dropped.
    ///
    /// The thread running the class initializer gets `false` and proceeds. Any other thread blocks
    /// until initialization finishes.
    pub fn check_initialized(&self, jvm: &JVMState, class: &Arc<RuntimeClass>) -> InvokeResult<bool> {
        let key = ByAddress(class.clone());
        let current = thread::current().id();
        let owner = self.table.lock().get(&key).copied();
        match owner {
            None => {
                initialize_class(jvm, class)?;
                if should_be_initialized(class) {
                    self.table.lock().insert(key, current);
                    return Ok(false);
                }
            }
            Some(owner) if owner == current => {
                if should_be_initialized(class) {
                    return Ok(false);
                }
            }
            Some(_) => initialize_class(jvm, class)?,
        }
        self.table.lock().remove(&key);
        Ok(true)
    }

    pub fn num_pending(&self) -> usize {
        self.table.lock().len()
    }
}

impl Default for EnsureInitialized {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub mod test {
    use std::sync::Arc;

    use ntest::timeout;
    use parking_lot::Mutex;

    use rust_jvm_common::classfile::ACC_STATIC;
    use rust_jvm_common::compressed_classfile::names::CClassName;

    use crate::class_loading::define_class;
    use crate::exceptions::InvokeError;
    use crate::java_values::JavaValue;
    use crate::jvm_state::JVMState;
    use crate::options::JVMOptions;
    use crate::view::ClassView;

    #[test]
    #[timeout(5000)]
    pub fn initializing_thread_passes_through() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        let lazy = CClassName::new("test/Lazy");
        let seen = Arc::new(Mutex::new(vec![]));
        let seen_in_init = seen.clone();
        let class = define_class(&jvm, ClassView::builder(lazy)
            .method("<clinit>", "()V", ACC_STATIC, move |jvm, _| {
                let class = jvm.lookup_class(lazy).ok_or_else(|| InvokeError::IllegalState("test/Lazy is not defined".to_string()))?;
                let can_drop = jvm.ensure_initialized.check_initialized(jvm, &class)?;
                seen_in_init.lock().push((can_drop, jvm.ensure_initialized.num_pending()));
                Ok(JavaValue::Top)
            })
            .build().unwrap(), jvm.new_loader()).unwrap();
        assert!(!class.is_initialized());
        assert!(jvm.ensure_initialized.check_initialized(&jvm, &class).unwrap());
        assert_eq!(*seen.lock(), vec![(false, 1)]);
        assert_eq!(jvm.ensure_initialized.num_pending(), 0);
        assert!(class.is_initialized());
        assert!(jvm.ensure_initialized.check_initialized(&jvm, &class).unwrap());
    }
}
