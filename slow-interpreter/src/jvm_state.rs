use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use rust_jvm_common::compressed_classfile::names::CClassName;
use rust_jvm_common::loading::{LoaderIndex, LoaderName};

use crate::access::AccessControl;
use crate::bootstrap_classes::define_bootstrap_classes;
use crate::exceptions::InvokeResult;
use crate::options::JVMOptions;
use crate::runtime_class::RuntimeClass;
use crate::stdlib::java::lang::invoke::ensure_initialized::EnsureInitialized;
use crate::tracing::TracingSettings;

pub struct JVMState {
    pub options: JVMOptions,
    pub(crate) classes: RwLock<HashMap<CClassName, Arc<RuntimeClass>>>,
    next_loader_index: AtomicUsize,
    pub(crate) ensure_initialized: EnsureInitialized,
}

impl JVMState {
    pub fn new(options: JVMOptions) -> InvokeResult<Self> {
        let jvm = Self {
            options,
            classes: RwLock::new(HashMap::new()),
            next_loader_index: AtomicUsize::new(0),
            ensure_initialized: EnsureInitialized::new(),
        };
        define_bootstrap_classes(&jvm)?;
        Ok(jvm)
    }

    pub fn tracing(&self) -> &TracingSettings {
        &self.options.tracing
    }

    pub fn access_control(&self) -> &dyn AccessControl {
        self.options.access_control.as_ref()
    }

    pub fn new_loader(&self) -> LoaderName {
        LoaderName::UserDefinedLoader(LoaderIndex(self.next_loader_index.fetch_add(1, Ordering::SeqCst)))
    }

    pub fn lookup_class(&self, name: CClassName) -> Option<Arc<RuntimeClass>> {
        self.classes.read().get(&name).cloned()
    }

    pub fn num_loaded_classes(&self) -> usize {
        self.classes.read().len()
    }
}
