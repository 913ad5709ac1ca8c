pub mod bound_method_handle;
pub mod call_site;
pub mod direct_method_handle;
pub mod ensure_initialized;
pub mod invokers;
pub mod lambda_form;
pub mod method_handle;
pub mod method_handle_impl;
pub mod method_handles;
pub mod method_type;
pub mod method_type_form;
pub mod simple_method_handle;
pub mod value_conversions;
pub mod varargs_collector;
