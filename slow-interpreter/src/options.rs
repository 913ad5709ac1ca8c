use std::sync::Arc;

use crate::access::{AccessControl, VerifyAccess};
use crate::tracing::TracingSettings;

pub const DEFAULT_COMPILE_THRESHOLD: u32 = 30;

pub struct JVMOptions {
    pub(crate) compile_threshold: u32,
    //forms this wide are interpreted until they warm up, even for direct handles
    pub(crate) eager_compile_max_arity: usize,
    pub(crate) verify_lambda_forms: bool,
    pub(crate) tracing: TracingSettings,
    pub(crate) access_control: Arc<dyn AccessControl>,
}

impl JVMOptions {
    pub fn new(compile_threshold: u32,
               eager_compile_max_arity: usize,
               verify_lambda_forms: bool,
               tracing: TracingSettings,
               access_control: Arc<dyn AccessControl>,
    ) -> Self {
        Self {
            compile_threshold,
            eager_compile_max_arity,
            verify_lambda_forms,
            tracing,
            access_control,
        }
    }

    pub fn with_compile_threshold(mut self, compile_threshold: u32) -> Self {
        self.compile_threshold = compile_threshold;
        self
    }

    pub fn with_eager_compile_max_arity(mut self, eager_compile_max_arity: usize) -> Self {
        self.eager_compile_max_arity = eager_compile_max_arity;
        self
    }

    pub fn with_verify_lambda_forms(mut self, verify_lambda_forms: bool) -> Self {
        self.verify_lambda_forms = verify_lambda_forms;
        self
    }

    pub fn with_tracing(mut self, tracing: TracingSettings) -> Self {
        self.tracing = tracing;
        self
    }

    pub fn with_access_control(mut self, access_control: Arc<dyn AccessControl>) -> Self {
        self.access_control = access_control;
        self
    }

    pub fn compile_threshold(&self) -> u32 {
        self.compile_threshold
    }

    pub fn eager_compile_max_arity(&self) -> usize {
        self.eager_compile_max_arity
    }

    pub fn verify_lambda_forms(&self) -> bool {
        self.verify_lambda_forms
    }
}

impl Default for JVMOptions {
    fn default() -> Self {
        Self::new(DEFAULT_COMPILE_THRESHOLD, 64, true, TracingSettings::new(), Arc::new(VerifyAccess))
    }
}
