use log::{debug, trace, warn};

use rust_jvm_common::compressed_classfile::names::CClassName;

use crate::exceptions::InvokeError;

pub struct TracingSettings {
    trace_member_resolution: bool,
    trace_virtual_dispatch: bool,
    trace_lambda_forms: bool,
    trace_class_init: bool,
    trace_init_barrier: bool,
}

impl TracingSettings {
    pub fn new() -> Self {
        TracingSettings {
            trace_member_resolution: true,
            trace_virtual_dispatch: false,
            trace_lambda_forms: true,
            trace_class_init: true,
            trace_init_barrier: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            trace_member_resolution: false,
            trace_virtual_dispatch: false,
            trace_lambda_forms: false,
            trace_class_init: false,
            trace_init_barrier: false,
        }
    }

    pub fn trace_member_resolution(&self, member: &dyn std::fmt::Display, outcome: Result<(), &dyn std::fmt::Display>) {
        if self.trace_member_resolution {
            match outcome {
                Ok(()) => trace!("[Resolved {}]", member),
                Err(failure) => trace!("[Failed to resolve {}: {}]", member, failure),
            }
        }
    }

    pub fn trace_virtual_dispatch(&self, receiver: &CClassName, selected: &CClassName, name: &str) {
        if self.trace_virtual_dispatch {
            trace!("[Dispatch {} on {} to {}]", name, receiver, selected);
        }
    }

    pub fn trace_lambda_form_created(&self, debug_name: &str) {
        if self.trace_lambda_forms {
            debug!("[Created lambda form {}]", debug_name);
        }
    }

    pub fn trace_lambda_form_compiled(&self, debug_name: &str, invocations: u32) {
        if self.trace_lambda_forms {
            debug!("[Compiled lambda form {} after {} invocations]", debug_name, invocations);
        }
    }

    pub fn trace_class_init_start(&self, class: &CClassName) {
        if self.trace_class_init {
            debug!("[Initializing {}]", class);
        }
    }

    pub fn trace_class_init_end(&self, class: &CClassName) {
        if self.trace_class_init {
            debug!("[Initialized {}]", class);
        }
    }

    pub fn trace_class_init_failed(&self, class: &CClassName, error: &InvokeError) {
        warn!("[Initializer of {} failed: {}]", class, error);
    }

    pub fn trace_barrier_removed(&self, class: &CClassName) {
        if self.trace_init_barrier {
            debug!("[Removed init barrier for {}]", class);
        }
    }
}

impl Default for TracingSettings {
    fn default() -> Self {
        Self::new()
    }
}
